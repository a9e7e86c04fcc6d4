use std::sync::Arc;

use lesson_core::model::{Activity, ActivityId, LessonId};
use storage::repository::ActivityRepository;
use tracing::info;

use crate::error::ContentAdminError;

/// Activity editing for the parent/admin screens.
#[derive(Clone)]
pub struct ContentAdminService {
    activities: Arc<dyn ActivityRepository>,
}

impl ContentAdminService {
    #[must_use]
    pub fn new(activities: Arc<dyn ActivityRepository>) -> Self {
        Self { activities }
    }

    /// # Errors
    ///
    /// Returns `ContentAdminError::Storage` if the activities cannot be read.
    pub async fn list(&self, lesson_id: &LessonId) -> Result<Vec<Activity>, ContentAdminError> {
        Ok(self.activities.list_activities(lesson_id).await?)
    }

    /// Validates and upserts an activity under `lesson_id`.
    ///
    /// # Errors
    ///
    /// Returns `ContentAdminError::Activity` when the activity fails validation,
    /// or `ContentAdminError::Storage` if it cannot be stored.
    pub async fn save(&self, lesson_id: &LessonId, activity: Activity) -> Result<Activity, ContentAdminError> {
        let activity = activity.with_lesson(lesson_id.clone());
        activity.validate()?;
        self.activities.upsert_activity(&activity).await?;
        info!(activity_id = %activity.id, lesson_id = %lesson_id, "activity saved");
        Ok(activity)
    }

    /// # Errors
    ///
    /// Returns `ContentAdminError::Storage` (`NotFound` included) if the delete fails.
    pub async fn delete(&self, activity_id: &ActivityId) -> Result<(), ContentAdminError> {
        self.activities.delete_activity(activity_id).await?;
        info!(activity_id = %activity_id, "activity deleted");
        Ok(())
    }
}
