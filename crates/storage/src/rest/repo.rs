use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_core::model::{
    Activity, ActivityId, AgeGroup, ChildId, ChildProfile, FamilyId, FamilyResolution, Lesson,
    LessonId, LevelId, ProfileId, SkillId, SkillMastery, ValidatedChildProfile,
};
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RestClient;
use crate::repository::{
    ActivityRepository, ChildRepository, CompletionRecord, CompletionRepository, FamilyRepository,
    LessonRepository, MasteryRepository, StorageError,
};

/// Repository traits over the hosted tables and procedures.
#[derive(Debug, Clone)]
pub struct RestRepository {
    client: RestClient,
}

impl RestRepository {
    #[must_use]
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[derive(Serialize)]
struct NewChildRow<'a> {
    family_id: &'a FamilyId,
    name: &'a str,
    age_group: AgeGroup,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<&'a str>,
}

#[derive(Serialize)]
struct CompletionRow<'a> {
    child_id: &'a ChildId,
    lesson_id: &'a LessonId,
    completed_at: DateTime<Utc>,
    score: u32,
    xp_earned: u32,
}

#[derive(Deserialize)]
struct StoredCompletion {
    child_id: ChildId,
    lesson_id: LessonId,
    completed_at: DateTime<Utc>,
    score: u32,
    xp_earned: u32,
}

impl From<StoredCompletion> for CompletionRecord {
    fn from(row: StoredCompletion) -> Self {
        Self {
            child_id: row.child_id,
            lesson_id: row.lesson_id,
            completed_at: row.completed_at,
            score: row.score,
            xp_earned: row.xp_earned,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct LessonSkillRow {
    lesson_id: LessonId,
    skill_id: SkillId,
}

/// PostgREST `in.(...)` filter with each value double-quoted.
fn in_list<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = values
        .into_iter()
        .map(|value| format!("\"{}\"", value.replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[derive(Deserialize)]
struct SkillName {
    name: String,
}

#[derive(Deserialize)]
struct MasteryRow {
    child_id: ChildId,
    skill_id: SkillId,
    mastery_level: f64,
    #[serde(default)]
    last_practiced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    skills: Option<SkillName>,
}

impl From<MasteryRow> for SkillMastery {
    fn from(row: MasteryRow) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mastery_level = row.mastery_level.round().clamp(0.0, 100.0) as u8;
        Self {
            child_id: row.child_id,
            skill_id: row.skill_id,
            skill_name: row.skills.map(|s| s.name).unwrap_or_default(),
            mastery_level,
            last_practiced_at: row.last_practiced_at,
        }
    }
}

#[derive(Serialize)]
struct GrantXpArgs<'a> {
    p_child_id: &'a ChildId,
    p_xp_amount: u32,
}

#[derive(Serialize)]
struct ResolveFamilyArgs<'a> {
    p_user_id: &'a ProfileId,
    p_email: Option<&'a str>,
    p_default_name: &'a str,
}

#[async_trait]
impl ActivityRepository for RestRepository {
    async fn list_activities(&self, lesson_id: &LessonId) -> Result<Vec<Activity>, StorageError> {
        self.client
            .select(
                "activities",
                &[
                    ("lesson_id", eq(lesson_id.as_str())),
                    ("order", "order_index.asc".to_string()),
                ],
            )
            .await
    }

    async fn upsert_activity(&self, activity: &Activity) -> Result<(), StorageError> {
        if activity.lesson_id.is_none() {
            return Err(StorageError::Serialization("activity has no lesson_id".into()));
        }
        let _: Vec<Value> = self.client.upsert("activities", activity, Some("id")).await?;
        Ok(())
    }

    async fn delete_activity(&self, id: &ActivityId) -> Result<(), StorageError> {
        let removed = self
            .client
            .delete("activities", &[("id", eq(id.as_str()))])
            .await?;
        if removed == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for RestRepository {
    async fn list_lessons(&self, level_id: Option<&LevelId>) -> Result<Vec<Lesson>, StorageError> {
        let mut query = vec![("order", "order_index.asc".to_string())];
        if let Some(level_id) = level_id {
            query.push(("level_id", eq(level_id.as_str())));
        }
        self.client.select("lessons", &query).await
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Option<Lesson>, StorageError> {
        let rows: Vec<Lesson> = self
            .client
            .select("lessons", &[("id", eq(id.as_str())), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let _: Vec<Value> = self.client.upsert("lessons", lesson, Some("id")).await?;
        Ok(())
    }

    async fn link_skill(&self, lesson_id: &LessonId, skill_id: &SkillId) -> Result<(), StorageError> {
        let row = LessonSkillRow {
            lesson_id: lesson_id.clone(),
            skill_id: skill_id.clone(),
        };
        let _: Vec<Value> = self
            .client
            .upsert("lesson_skills", &row, Some("lesson_id,skill_id"))
            .await?;
        Ok(())
    }

    async fn lessons_for_skills(&self, skill_ids: &[SkillId]) -> Result<Vec<LessonId>, StorageError> {
        if skill_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<LessonSkillRow> = self
            .client
            .select(
                "lesson_skills",
                &[
                    ("select", "lesson_id,skill_id".to_string()),
                    ("skill_id", in_list(skill_ids.iter().map(SkillId::as_str))),
                ],
            )
            .await?;
        let lessons: BTreeSet<LessonId> = rows.into_iter().map(|row| row.lesson_id).collect();
        Ok(lessons.into_iter().collect())
    }

    async fn linked_skills(&self, limit: usize) -> Result<Vec<SkillId>, StorageError> {
        let rows: Vec<LessonSkillRow> = self
            .client
            .select(
                "lesson_skills",
                &[
                    ("select", "lesson_id,skill_id".to_string()),
                    ("order", "skill_id.asc".to_string()),
                ],
            )
            .await?;
        let skills: BTreeSet<SkillId> = rows.into_iter().map(|row| row.skill_id).collect();
        Ok(skills.into_iter().take(limit).collect())
    }
}

#[async_trait]
impl ChildRepository for RestRepository {
    async fn list_children(&self, family_id: &FamilyId) -> Result<Vec<ChildProfile>, StorageError> {
        self.client
            .select(
                "child_profiles",
                &[
                    ("family_id", eq(family_id.as_str())),
                    ("order", "created_at.asc".to_string()),
                ],
            )
            .await
    }

    async fn get_child(&self, id: &ChildId) -> Result<Option<ChildProfile>, StorageError> {
        let rows: Vec<ChildProfile> = self
            .client
            .select("child_profiles", &[("id", eq(id.as_str())), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_child(&self, child: ValidatedChildProfile) -> Result<ChildProfile, StorageError> {
        let row = NewChildRow {
            family_id: &child.family_id,
            name: &child.name,
            age_group: child.age_group,
            avatar_url: child.avatar_url.as_deref(),
        };
        let stored: Vec<ChildProfile> = self.client.upsert("child_profiles", &row, None).await?;
        stored
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::Serialization("insert returned no row".into()))
    }
}

#[async_trait]
impl MasteryRepository for RestRepository {
    async fn list_mastery(&self, child_id: &ChildId) -> Result<Vec<SkillMastery>, StorageError> {
        let rows: Vec<MasteryRow> = self
            .client
            .select(
                "child_skill_mastery",
                &[
                    (
                        "select",
                        "child_id,skill_id,mastery_level,last_practiced_at,skills(name)".to_string(),
                    ),
                    ("child_id", eq(child_id.as_str())),
                    ("order", "mastery_level.desc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(SkillMastery::from).collect())
    }
}

#[async_trait]
impl CompletionRepository for RestRepository {
    async fn record_completion(&self, record: &CompletionRecord) -> Result<(), StorageError> {
        let row = CompletionRow {
            child_id: &record.child_id,
            lesson_id: &record.lesson_id,
            completed_at: record.completed_at,
            score: record.score,
            xp_earned: record.xp_earned,
        };
        let _: Vec<Value> = self
            .client
            .upsert("lesson_completions", &row, Some("child_id,lesson_id"))
            .await?;
        Ok(())
    }

    async fn list_completions(&self, child_id: &ChildId) -> Result<Vec<CompletionRecord>, StorageError> {
        let rows: Vec<StoredCompletion> = self
            .client
            .select(
                "lesson_completions",
                &[
                    ("select", "child_id,lesson_id,completed_at,score,xp_earned".to_string()),
                    ("child_id", eq(child_id.as_str())),
                    ("order", "completed_at.asc,lesson_id.asc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(CompletionRecord::from).collect())
    }

    async fn grant_xp(&self, child_id: &ChildId, amount: u32) -> Result<u64, StorageError> {
        let total: Option<i64> = self
            .client
            .rpc(
                "grant_xp",
                &GrantXpArgs {
                    p_child_id: child_id,
                    p_xp_amount: amount,
                },
            )
            .await?;
        let total = total.ok_or(StorageError::NotFound)?;
        u64::try_from(total).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl FamilyRepository for RestRepository {
    async fn resolve_family(
        &self,
        user_id: &ProfileId,
        email: Option<&str>,
        default_name: &str,
    ) -> Result<FamilyResolution, StorageError> {
        self.client
            .rpc(
                "resolve_family",
                &ResolveFamilyArgs {
                    p_user_id: user_id,
                    p_email: email,
                    p_default_name: default_name,
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mastery_row_flattens_skill_name() {
        let row: MasteryRow = serde_json::from_str(
            r#"{"child_id":"c1","skill_id":"s1","mastery_level":72.6,"last_practiced_at":null,"skills":{"name":"Greetings"}}"#,
        )
        .unwrap();
        let mastery = SkillMastery::from(row);
        assert_eq!(mastery.skill_name, "Greetings");
        assert_eq!(mastery.mastery_level, 73);
    }

    #[test]
    fn in_list_quotes_each_value() {
        assert_eq!(in_list(["s1", "a,b"]), r#"in.("s1","a,b")"#);
    }

    #[test]
    fn new_child_row_uses_wire_age_group() {
        let family = FamilyId::new("f1");
        let row = NewChildRow {
            family_id: &family,
            name: "Kai",
            age_group: AgeGroup::SixthToEighth,
            avatar_url: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["age_group"], "6-8");
        assert!(json.get("avatar_url").is_none());
    }
}
