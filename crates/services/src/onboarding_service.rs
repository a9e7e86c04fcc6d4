use std::sync::Arc;

use lesson_core::onboarding::ONBOARDING_FLAG_KEY;
use storage::repository::PreferenceRepository;
use tracing::warn;

use crate::error::OnboardingError;

/// Remembers whether the tutorial overlay has been seen on this device.
#[derive(Clone)]
pub struct OnboardingService {
    preferences: Arc<dyn PreferenceRepository>,
}

impl OnboardingService {
    #[must_use]
    pub fn new(preferences: Arc<dyn PreferenceRepository>) -> Self {
        Self { preferences }
    }

    /// True until the flag has been stored. An unreadable flag shows the
    /// tutorial again.
    pub async fn should_show(&self) -> bool {
        match self.preferences.get_flag(ONBOARDING_FLAG_KEY).await {
            Ok(flag) => flag != Some(true),
            Err(err) => {
                warn!(error = %err, "failed to read onboarding flag");
                true
            }
        }
    }

    /// Called on both finish and skip.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::Storage` if the flag cannot be stored.
    pub async fn mark_done(&self) -> Result<(), OnboardingError> {
        self.preferences.set_flag(ONBOARDING_FLAG_KEY, true).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn shown_until_marked_done() {
        let repo = Arc::new(InMemoryRepository::new());
        let svc = OnboardingService::new(repo.clone());
        assert!(svc.should_show().await);

        svc.mark_done().await.unwrap();
        assert!(!svc.should_show().await);
        assert!(!OnboardingService::new(repo).should_show().await);
    }
}
