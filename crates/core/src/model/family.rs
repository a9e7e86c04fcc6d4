use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChildId, FamilyId, LessonId, LevelId, ProfileId, SkillId};

/// Longest child name accepted by the dashboard form.
pub const MAX_CHILD_NAME_LEN: usize = 40;

//
// ─── AGE GROUP ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "K-2")]
    KindergartenToSecond,
    #[serde(rename = "3-5")]
    ThirdToFifth,
    #[serde(rename = "6-8")]
    SixthToEighth,
    #[serde(rename = "9-12")]
    NinthToTwelfth,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 4] = [
        AgeGroup::KindergartenToSecond,
        AgeGroup::ThirdToFifth,
        AgeGroup::SixthToEighth,
        AgeGroup::NinthToTwelfth,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AgeGroup::KindergartenToSecond => "K-2",
            AgeGroup::ThirdToFifth => "3-5",
            AgeGroup::SixthToEighth => "6-8",
            AgeGroup::NinthToTwelfth => "9-12",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeGroup {
    type Err = ChildProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgeGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == s.trim())
            .ok_or_else(|| ChildProfileError::UnknownAgeGroup(s.to_string()))
    }
}

//
// ─── CHILD PROFILE ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildProfileDraft {
    pub family_id: FamilyId,
    pub name: String,
    pub age_group: Option<AgeGroup>,
    pub avatar_url: Option<String>,
}

impl ChildProfileDraft {
    #[must_use]
    pub fn new(family_id: FamilyId, name: impl Into<String>, age_group: Option<AgeGroup>) -> Self {
        Self {
            family_id,
            name: name.into(),
            age_group,
            avatar_url: None,
        }
    }

    /// Trims the name and checks the form constraints.
    ///
    /// # Errors
    ///
    /// Returns `ChildProfileError` when the name is empty or too long, or the
    /// age group is missing.
    pub fn validate(self) -> Result<ValidatedChildProfile, ChildProfileError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ChildProfileError::EmptyName);
        }
        let len = name.chars().count();
        if len > MAX_CHILD_NAME_LEN {
            return Err(ChildProfileError::NameTooLong {
                max: MAX_CHILD_NAME_LEN,
                actual: len,
            });
        }
        let age_group = self.age_group.ok_or(ChildProfileError::MissingAgeGroup)?;

        Ok(ValidatedChildProfile {
            family_id: self.family_id,
            name,
            age_group,
            avatar_url: self.avatar_url.filter(|url| !url.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChildProfile {
    pub family_id: FamilyId,
    pub name: String,
    pub age_group: AgeGroup,
    pub avatar_url: Option<String>,
}

impl ValidatedChildProfile {
    #[must_use]
    pub fn assign_id(self, id: ChildId) -> ChildProfile {
        ChildProfile {
            id,
            family_id: self.family_id,
            name: self.name,
            avatar_url: self.avatar_url,
            age_group: self.age_group,
            streak_count: 0,
            total_points: 0,
            mastery_gating_enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildProfile {
    pub id: ChildId,
    pub family_id: FamilyId,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub age_group: AgeGroup,
    #[serde(default)]
    pub streak_count: u32,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub mastery_gating_enabled: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChildProfileError {
    #[error("name is required")]
    EmptyName,
    #[error("name is too long: {actual} characters (max {max})")]
    NameTooLong { max: usize, actual: usize },
    #[error("age group is required")]
    MissingAgeGroup,
    #[error("unknown age group: {0}")]
    UnknownAgeGroup(String),
}

//
// ─── FAMILY / PROFILE ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of the resolve-or-create family procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyResolution {
    pub profile: Profile,
    pub family_id: FamilyId,
}

/// Family name used when a parent signs in for the first time.
///
/// `"ana@example.com"` becomes `"ana's Family"`.
#[must_use]
pub fn default_family_name(email: Option<&str>) -> String {
    email
        .and_then(|email| email.split('@').next())
        .map(str::trim)
        .filter(|local| !local.is_empty())
        .map_or_else(|| "My Family".to_string(), |local| format!("{local}'s Family"))
}

//
// ─── LESSONS / MASTERY ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    #[serde(default)]
    pub level_id: Option<LevelId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMastery {
    pub child_id: ChildId,
    pub skill_id: SkillId,
    #[serde(default)]
    pub skill_name: String,
    /// Percentage in `0..=100`.
    pub mastery_level: u8,
    #[serde(default)]
    pub last_practiced_at: Option<DateTime<Utc>>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> FamilyId {
        FamilyId::new("fam-1")
    }

    #[test]
    fn draft_trims_name() {
        let profile = ChildProfileDraft::new(family(), "  Mika ", Some(AgeGroup::ThirdToFifth))
            .validate()
            .unwrap()
            .assign_id(ChildId::new("c1"));
        assert_eq!(profile.name, "Mika");
        assert_eq!(profile.total_points, 0);
    }

    #[test]
    fn draft_rejects_blank_and_long_names() {
        let blank = ChildProfileDraft::new(family(), "   ", Some(AgeGroup::ThirdToFifth));
        assert_eq!(blank.validate().unwrap_err(), ChildProfileError::EmptyName);

        let long = ChildProfileDraft::new(family(), "x".repeat(41), Some(AgeGroup::ThirdToFifth));
        assert!(matches!(
            long.validate().unwrap_err(),
            ChildProfileError::NameTooLong { max: 40, actual: 41 }
        ));
    }

    #[test]
    fn draft_requires_age_group() {
        let draft = ChildProfileDraft::new(family(), "Mika", None);
        assert_eq!(draft.validate().unwrap_err(), ChildProfileError::MissingAgeGroup);
    }

    #[test]
    fn age_group_uses_hosted_labels() {
        assert_eq!("6-8".parse::<AgeGroup>().unwrap(), AgeGroup::SixthToEighth);
        assert_eq!(
            serde_json::to_string(&AgeGroup::KindergartenToSecond).unwrap(),
            "\"K-2\""
        );
        assert!("adult".parse::<AgeGroup>().is_err());
    }

    #[test]
    fn default_family_name_uses_local_part() {
        assert_eq!(default_family_name(Some("ana@example.com")), "ana's Family");
        assert_eq!(default_family_name(Some("@example.com")), "My Family");
        assert_eq!(default_family_name(None), "My Family");
    }
}
