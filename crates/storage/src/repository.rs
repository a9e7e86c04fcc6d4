use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_core::model::{
    Activity, ActivityId, ChildId, ChildProfile, Family, FamilyId, FamilyResolution, Lesson,
    LessonId, LevelId, Profile, ProfileId, SkillId, SkillMastery, ValidatedChildProfile,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The hosted backend rejected the request; `message` is its raw text.
    #[error("{message}")]
    Remote { status: u16, message: String },
}

/// One finished lesson, upserted on `(child_id, lesson_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub child_id: ChildId,
    pub lesson_id: LessonId,
    pub completed_at: DateTime<Utc>,
    pub score: u32,
    pub xp_earned: u32,
}

/// Activities of a lesson, in presentation order.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Activities of `lesson_id` sorted by `order_index`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_activities(&self, lesson_id: &LessonId) -> Result<Vec<Activity>, StorageError>;

    /// Insert or replace an activity. The activity must carry a `lesson_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` without a lesson id, or other storage errors.
    async fn upsert_activity(&self, activity: &Activity) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such activity exists.
    async fn delete_activity(&self, id: &ActivityId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Lessons sorted by `order_index`, optionally limited to one level.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_lessons(&self, level_id: Option<&LevelId>) -> Result<Vec<Lesson>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_lesson(&self, id: &LessonId) -> Result<Option<Lesson>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Tags a lesson as practicing a skill. Linking twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the link cannot be stored.
    async fn link_skill(&self, lesson_id: &LessonId, skill_id: &SkillId) -> Result<(), StorageError>;

    /// Distinct lessons tagged with any of `skill_ids`, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn lessons_for_skills(&self, skill_ids: &[SkillId]) -> Result<Vec<LessonId>, StorageError>;

    /// The first `limit` skills (by id) that have at least one lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn linked_skills(&self, limit: usize) -> Result<Vec<SkillId>, StorageError>;
}

#[async_trait]
pub trait ChildRepository: Send + Sync {
    /// Children of a family, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_children(&self, family_id: &FamilyId) -> Result<Vec<ChildProfile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_child(&self, id: &ChildId) -> Result<Option<ChildProfile>, StorageError>;

    /// Creates a child and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Remote` with the backend's message when the insert is rejected.
    async fn insert_child(&self, child: ValidatedChildProfile) -> Result<ChildProfile, StorageError>;
}

#[async_trait]
pub trait MasteryRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_mastery(&self, child_id: &ChildId) -> Result<Vec<SkillMastery>, StorageError>;
}

#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn record_completion(&self, record: &CompletionRecord) -> Result<(), StorageError>;

    /// Every lesson the child has finished, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_completions(&self, child_id: &ChildId) -> Result<Vec<CompletionRecord>, StorageError>;

    /// Adds `amount` XP to the child and returns the new total.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown child, or other storage errors.
    async fn grant_xp(&self, child_id: &ChildId, amount: u32) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait FamilyRepository: Send + Sync {
    /// Idempotent resolve-or-create: ensures the profile row, then returns the
    /// family the user belongs to, linking an owned family or creating
    /// `default_name` when there is none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any step fails; nothing is left half-created.
    async fn resolve_family(
        &self,
        user_id: &ProfileId,
        email: Option<&str>,
        default_name: &str,
    ) -> Result<FamilyResolution, StorageError>;
}

/// Local boolean flags (the onboarding flag today).
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_flag(&self, key: &str) -> Result<Option<bool>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be stored.
    async fn set_flag(&self, key: &str, value: bool) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct FamilyRow {
    family: Family,
    created_by: ProfileId,
    seq: u64,
}

#[derive(Debug, Default)]
struct FamilyState {
    profiles: HashMap<ProfileId, Profile>,
    families: Vec<FamilyRow>,
    members: Vec<(FamilyId, ProfileId)>,
    next_seq: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    activities: Arc<Mutex<HashMap<ActivityId, Activity>>>,
    lessons: Arc<Mutex<HashMap<LessonId, Lesson>>>,
    lesson_skills: Arc<Mutex<BTreeSet<(SkillId, LessonId)>>>,
    children: Arc<Mutex<Vec<ChildProfile>>>,
    mastery: Arc<Mutex<Vec<SkillMastery>>>,
    completions: Arc<Mutex<HashMap<(ChildId, LessonId), CompletionRecord>>>,
    families: Arc<Mutex<FamilyState>>,
    flags: Arc<Mutex<HashMap<String, bool>>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a mastery row; the hosted store computes these server-side.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_mastery(&self, row: SkillMastery) -> Result<(), StorageError> {
        self.mastery.lock().map_err(poisoned)?.push(row);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn completions(&self) -> Result<Vec<CompletionRecord>, StorageError> {
        Ok(self
            .completions
            .lock()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect())
    }

    /// Links a profile to an existing family, as an invite would.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the family does not exist.
    pub fn add_member(&self, family_id: &FamilyId, profile_id: &ProfileId) -> Result<(), StorageError> {
        let mut state = self.families.lock().map_err(poisoned)?;
        if !state.families.iter().any(|row| &row.family.id == family_id) {
            return Err(StorageError::NotFound);
        }
        state.members.push((family_id.clone(), profile_id.clone()));
        Ok(())
    }
}

#[async_trait]
impl ActivityRepository for InMemoryRepository {
    async fn list_activities(&self, lesson_id: &LessonId) -> Result<Vec<Activity>, StorageError> {
        let guard = self.activities.lock().map_err(poisoned)?;
        let mut found: Vec<Activity> = guard
            .values()
            .filter(|activity| activity.lesson_id.as_ref() == Some(lesson_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.order_index.cmp(&b.order_index).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn upsert_activity(&self, activity: &Activity) -> Result<(), StorageError> {
        if activity.lesson_id.is_none() {
            return Err(StorageError::Serialization("activity has no lesson_id".into()));
        }
        let mut guard = self.activities.lock().map_err(poisoned)?;
        guard.insert(activity.id.clone(), activity.clone());
        Ok(())
    }

    async fn delete_activity(&self, id: &ActivityId) -> Result<(), StorageError> {
        let mut guard = self.activities.lock().map_err(poisoned)?;
        guard.remove(id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn list_lessons(&self, level_id: Option<&LevelId>) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        let mut found: Vec<Lesson> = guard
            .values()
            .filter(|lesson| level_id.is_none_or(|level| lesson.level_id.as_ref() == Some(level)))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.order_index.cmp(&b.order_index).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Option<Lesson>, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        guard.insert(lesson.id.clone(), lesson.clone());
        Ok(())
    }

    async fn link_skill(&self, lesson_id: &LessonId, skill_id: &SkillId) -> Result<(), StorageError> {
        let mut guard = self.lesson_skills.lock().map_err(poisoned)?;
        guard.insert((skill_id.clone(), lesson_id.clone()));
        Ok(())
    }

    async fn lessons_for_skills(&self, skill_ids: &[SkillId]) -> Result<Vec<LessonId>, StorageError> {
        let guard = self.lesson_skills.lock().map_err(poisoned)?;
        let found: BTreeSet<LessonId> = guard
            .iter()
            .filter(|(skill, _)| skill_ids.contains(skill))
            .map(|(_, lesson)| lesson.clone())
            .collect();
        Ok(found.into_iter().collect())
    }

    async fn linked_skills(&self, limit: usize) -> Result<Vec<SkillId>, StorageError> {
        let guard = self.lesson_skills.lock().map_err(poisoned)?;
        let skills: BTreeSet<SkillId> = guard.iter().map(|(skill, _)| skill.clone()).collect();
        Ok(skills.into_iter().take(limit).collect())
    }
}

#[async_trait]
impl ChildRepository for InMemoryRepository {
    async fn list_children(&self, family_id: &FamilyId) -> Result<Vec<ChildProfile>, StorageError> {
        let guard = self.children.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|child| &child.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn get_child(&self, id: &ChildId) -> Result<Option<ChildProfile>, StorageError> {
        let guard = self.children.lock().map_err(poisoned)?;
        Ok(guard.iter().find(|child| &child.id == id).cloned())
    }

    async fn insert_child(&self, child: ValidatedChildProfile) -> Result<ChildProfile, StorageError> {
        let profile = child.assign_id(ChildId::generate());
        let mut guard = self.children.lock().map_err(poisoned)?;
        guard.push(profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl MasteryRepository for InMemoryRepository {
    async fn list_mastery(&self, child_id: &ChildId) -> Result<Vec<SkillMastery>, StorageError> {
        let guard = self.mastery.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|row| &row.child_id == child_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn record_completion(&self, record: &CompletionRecord) -> Result<(), StorageError> {
        let mut guard = self.completions.lock().map_err(poisoned)?;
        guard.insert(
            (record.child_id.clone(), record.lesson_id.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn list_completions(&self, child_id: &ChildId) -> Result<Vec<CompletionRecord>, StorageError> {
        let guard = self.completions.lock().map_err(poisoned)?;
        let mut found: Vec<CompletionRecord> = guard
            .values()
            .filter(|record| &record.child_id == child_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.completed_at
                .cmp(&b.completed_at)
                .then_with(|| a.lesson_id.cmp(&b.lesson_id))
        });
        Ok(found)
    }

    async fn grant_xp(&self, child_id: &ChildId, amount: u32) -> Result<u64, StorageError> {
        let mut guard = self.children.lock().map_err(poisoned)?;
        let child = guard
            .iter_mut()
            .find(|child| &child.id == child_id)
            .ok_or(StorageError::NotFound)?;
        child.total_points = child.total_points.saturating_add(amount);
        Ok(u64::from(child.total_points))
    }
}

#[async_trait]
impl FamilyRepository for InMemoryRepository {
    async fn resolve_family(
        &self,
        user_id: &ProfileId,
        email: Option<&str>,
        default_name: &str,
    ) -> Result<FamilyResolution, StorageError> {
        let child_counts: HashMap<FamilyId, usize> = {
            let children = self.children.lock().map_err(poisoned)?;
            let mut counts = HashMap::new();
            for child in children.iter() {
                *counts.entry(child.family_id.clone()).or_default() += 1;
            }
            counts
        };

        let mut state = self.families.lock().map_err(poisoned)?;
        let profile = state
            .profiles
            .entry(user_id.clone())
            .and_modify(|profile| {
                if let Some(email) = email {
                    profile.email = Some(email.to_string());
                }
            })
            .or_insert_with(|| Profile {
                id: user_id.clone(),
                email: email.map(str::to_string),
            })
            .clone();

        // Existing membership: prefer the family with the most children.
        let memberships: Vec<FamilyId> = state
            .members
            .iter()
            .filter(|(_, member)| member == user_id)
            .map(|(family, _)| family.clone())
            .collect();
        if let Some(family_id) = memberships
            .iter()
            .enumerate()
            .max_by_key(|(index, family)| {
                (
                    child_counts.get(*family).copied().unwrap_or(0),
                    std::cmp::Reverse(*index),
                )
            })
            .map(|(_, family)| family.clone())
        {
            return Ok(FamilyResolution { profile, family_id });
        }

        let owned = state
            .families
            .iter()
            .filter(|row| &row.created_by == user_id)
            .min_by_key(|row| row.seq)
            .map(|row| row.family.id.clone());
        let family_id = match owned {
            Some(family_id) => family_id,
            None => {
                let family_id = FamilyId::generate();
                let seq = state.next_seq;
                state.next_seq += 1;
                state.families.push(FamilyRow {
                    family: Family {
                        id: family_id.clone(),
                        name: default_name.to_string(),
                    },
                    created_by: user_id.clone(),
                    seq,
                });
                family_id
            }
        };
        state.members.push((family_id.clone(), user_id.clone()));

        Ok(FamilyResolution { profile, family_id })
    }
}

#[async_trait]
impl PreferenceRepository for InMemoryRepository {
    async fn get_flag(&self, key: &str) -> Result<Option<bool>, StorageError> {
        let guard = self.flags.lock().map_err(poisoned)?;
        Ok(guard.get(key).copied())
    }

    async fn set_flag(&self, key: &str, value: bool) -> Result<(), StorageError> {
        let mut guard = self.flags.lock().map_err(poisoned)?;
        guard.insert(key.to_string(), value);
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub activities: Arc<dyn ActivityRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub children: Arc<dyn ChildRepository>,
    pub mastery: Arc<dyn MasteryRepository>,
    pub completions: Arc<dyn CompletionRepository>,
    pub families: Arc<dyn FamilyRepository>,
    pub preferences: Arc<dyn PreferenceRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    /// Wraps an existing in-memory repository so tests can keep a handle for seeding.
    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        Self {
            activities: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            children: Arc::new(repo.clone()),
            mastery: Arc::new(repo.clone()),
            completions: Arc::new(repo.clone()),
            families: Arc::new(repo.clone()),
            preferences: Arc::new(repo),
        }
    }
}
