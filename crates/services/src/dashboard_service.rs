use std::collections::HashSet;
use std::sync::Arc;

use lesson_core::leveling::LevelProgress;
use lesson_core::model::{
    ChildId, ChildProfile, ChildProfileDraft, FamilyId, Lesson, LessonId, LevelId, SkillMastery,
};
use storage::repository::{
    ChildRepository, CompletionRepository, LessonRepository, MasteryRepository,
};
use tracing::info;

use crate::error::DashboardError;

/// One child's card on the parent dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildOverview {
    pub child: ChildProfile,
    pub level: LevelProgress,
    pub mastery: Vec<SkillMastery>,
}

/// A lesson on the mission list and whether this child has finished it.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonStatus {
    pub lesson: Lesson,
    pub completed: bool,
}

/// Lessons sharing a level, in lesson order. `level_id` is `None` for
/// lessons not placed in any level.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonGroup {
    pub level_id: Option<LevelId>,
    pub lessons: Vec<LessonStatus>,
}

impl LessonGroup {
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.lessons.iter().filter(|status| status.completed).count()
    }
}

/// Groups ordered lessons by level. Levels keep the order of their first
/// lesson; unplaced lessons come last.
#[must_use]
pub fn group_lessons(lessons: Vec<Lesson>, completed: &HashSet<LessonId>) -> Vec<LessonGroup> {
    let mut groups: Vec<LessonGroup> = Vec::new();
    let mut unplaced = Vec::new();

    for lesson in lessons {
        let status = LessonStatus {
            completed: completed.contains(&lesson.id),
            lesson,
        };
        let Some(level_id) = status.lesson.level_id.clone() else {
            unplaced.push(status);
            continue;
        };
        match groups
            .iter_mut()
            .find(|group| group.level_id.as_ref() == Some(&level_id))
        {
            Some(group) => group.lessons.push(status),
            None => groups.push(LessonGroup {
                level_id: Some(level_id),
                lessons: vec![status],
            }),
        }
    }

    if !unplaced.is_empty() {
        groups.push(LessonGroup {
            level_id: None,
            lessons: unplaced,
        });
    }
    groups
}

#[derive(Clone)]
pub struct DashboardService {
    children: Arc<dyn ChildRepository>,
    mastery: Arc<dyn MasteryRepository>,
    lessons: Arc<dyn LessonRepository>,
    completions: Arc<dyn CompletionRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        children: Arc<dyn ChildRepository>,
        mastery: Arc<dyn MasteryRepository>,
        lessons: Arc<dyn LessonRepository>,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            children,
            mastery,
            lessons,
            completions,
        }
    }

    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if the children cannot be read.
    pub async fn list_children(&self, family_id: &FamilyId) -> Result<Vec<ChildProfile>, DashboardError> {
        Ok(self.children.list_children(family_id).await?)
    }

    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if the child cannot be read.
    pub async fn get_child(&self, child_id: &ChildId) -> Result<Option<ChildProfile>, DashboardError> {
        Ok(self.children.get_child(child_id).await?)
    }

    /// Validates the form and creates the child.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Child` for form errors, or
    /// `DashboardError::Storage` whose message is the backend's own text.
    pub async fn create_child(&self, draft: ChildProfileDraft) -> Result<ChildProfile, DashboardError> {
        let validated = draft.validate()?;
        let child = self.children.insert_child(validated).await?;
        info!(child_id = %child.id, family_id = %child.family_id, "child created");
        Ok(child)
    }

    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if mastery rows cannot be read.
    pub async fn list_mastery(&self, child_id: &ChildId) -> Result<Vec<SkillMastery>, DashboardError> {
        Ok(self.mastery.list_mastery(child_id).await?)
    }

    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if lessons cannot be read.
    pub async fn list_lessons(&self, level_id: Option<&LevelId>) -> Result<Vec<Lesson>, DashboardError> {
        Ok(self.lessons.list_lessons(level_id).await?)
    }

    /// Ids of every lesson the child has finished at least once.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if completions cannot be read.
    pub async fn completed_lessons(&self, child_id: &ChildId) -> Result<HashSet<LessonId>, DashboardError> {
        Ok(self
            .completions
            .list_completions(child_id)
            .await?
            .into_iter()
            .map(|record| record.lesson_id)
            .collect())
    }

    /// The mission list for one child: every lesson grouped by level, with
    /// finished lessons marked.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if lessons or completions cannot be read.
    pub async fn lesson_map(&self, child_id: &ChildId) -> Result<Vec<LessonGroup>, DashboardError> {
        let lessons = self.list_lessons(None).await?;
        let completed = self.completed_lessons(child_id).await?;
        Ok(group_lessons(lessons, &completed))
    }

    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if mastery rows cannot be read.
    pub async fn overview(&self, child: ChildProfile) -> Result<ChildOverview, DashboardError> {
        let mastery = self.list_mastery(&child.id).await?;
        Ok(ChildOverview {
            level: LevelProgress::from_total(u64::from(child.total_points)),
            child,
            mastery,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{AgeGroup, ChildProfileError};
    use lesson_core::time::fixed_now;
    use storage::repository::{CompletionRecord, InMemoryRepository, Storage};

    fn service_over(repo: &InMemoryRepository) -> DashboardService {
        let storage = Storage::from_in_memory(repo.clone());
        DashboardService::new(
            storage.children,
            storage.mastery,
            storage.lessons,
            storage.completions,
        )
    }

    fn service() -> DashboardService {
        service_over(&InMemoryRepository::new())
    }

    fn lesson(id: &str, level: Option<&str>, order: i32) -> Lesson {
        Lesson {
            id: LessonId::new(id),
            level_id: level.map(LevelId::new),
            title: format!("Lesson {id}"),
            description: None,
            order_index: order,
        }
    }

    #[tokio::test]
    async fn create_child_trims_and_lists() {
        let svc = service();
        let family = FamilyId::new("f1");
        let child = svc
            .create_child(ChildProfileDraft::new(family.clone(), "  Aiko ", Some(AgeGroup::ThirdToFifth)))
            .await
            .unwrap();
        assert_eq!(child.name, "Aiko");
        assert_eq!(svc.list_children(&family).await.unwrap(), vec![child.clone()]);

        let overview = svc.overview(child).await.unwrap();
        assert_eq!(overview.level.level, 1);
    }

    #[tokio::test]
    async fn create_child_requires_age_group() {
        let svc = service();
        let err = svc
            .create_child(ChildProfileDraft::new(FamilyId::new("f1"), "Aiko", None))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Child(ChildProfileError::MissingAgeGroup)));
    }

    #[test]
    fn lessons_group_by_level_in_first_seen_order() {
        let lessons = vec![
            lesson("tokyo", Some("japan"), 0),
            lesson("loose", None, 1),
            lesson("paris", Some("france"), 2),
            lesson("kyoto", Some("japan"), 3),
        ];
        let completed: HashSet<LessonId> = [LessonId::new("kyoto")].into_iter().collect();

        let groups = group_lessons(lessons, &completed);
        let levels: Vec<Option<&str>> = groups
            .iter()
            .map(|group| group.level_id.as_ref().map(LevelId::as_str))
            .collect();
        assert_eq!(levels, vec![Some("japan"), Some("france"), None]);
        assert_eq!(groups[0].lessons.len(), 2);
        assert_eq!(groups[0].completed_count(), 1);
        assert!(groups[0].lessons[1].completed);
        assert_eq!(groups[1].completed_count(), 0);
    }

    #[tokio::test]
    async fn lesson_map_marks_only_this_childs_completions() {
        let repo = InMemoryRepository::new();
        repo.upsert_lesson(&lesson("l1", Some("level-1"), 0)).await.unwrap();
        repo.upsert_lesson(&lesson("l2", Some("level-1"), 1)).await.unwrap();
        repo.upsert_lesson(&lesson("l3", Some("level-2"), 2)).await.unwrap();
        for (child, lesson) in [("c1", "l2"), ("c2", "l1")] {
            repo.record_completion(&CompletionRecord {
                child_id: ChildId::new(child),
                lesson_id: LessonId::new(lesson),
                completed_at: fixed_now(),
                score: 10,
                xp_earned: 100,
            })
            .await
            .unwrap();
        }

        let groups = service_over(&repo).lesson_map(&ChildId::new("c1")).await.unwrap();
        assert_eq!(groups.len(), 2);
        let marks: Vec<(&str, bool)> = groups[0]
            .lessons
            .iter()
            .map(|status| (status.lesson.id.as_str(), status.completed))
            .collect();
        assert_eq!(marks, vec![("l1", false), ("l2", true)]);
        assert_eq!(groups[1].completed_count(), 0);
    }
}
