use std::sync::Arc;

use storage::repository::{PreferenceRepository, Storage};
use storage::rest::{RestClient, RestConfig};
use storage::sqlite::SqliteRepository;

use crate::Clock;
use crate::auth::{AuthClient, AuthSession, GoTrueClient, LocalAuthClient};
use crate::content_admin_service::ContentAdminService;
use crate::dashboard_service::DashboardService;
use crate::error::{AppServicesError, FamilyError};
use crate::family_service::{FamilyContext, FamilyService};
use crate::lesson_service::LessonService;
use crate::onboarding_service::OnboardingService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    auth: Arc<dyn AuthClient>,
    rest: Option<RestClient>,
    lessons: Arc<LessonService>,
    families: Arc<FamilyService>,
    dashboard: Arc<DashboardService>,
    content_admin: Arc<ContentAdminService>,
    onboarding: Arc<OnboardingService>,
}

impl AppServices {
    /// Build services backed by local `SQLite` storage and the offline auth provider.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url, clock).await?;
        Ok(Self::from_storage(storage, Arc::new(LocalAuthClient), None, clock))
    }

    /// Build services against the hosted backend. Preference flags live in
    /// the local `SQLite` database at `prefs_db_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the local database or HTTP clients cannot be set up.
    pub async fn new_remote(
        config: RestConfig,
        prefs_db_url: &str,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let prefs = SqliteRepository::connect(prefs_db_url).await?.with_clock(clock);
        prefs.migrate().await?;
        let preferences: Arc<dyn PreferenceRepository> = Arc::new(prefs);

        let auth = Arc::new(GoTrueClient::new(&config)?);
        let (storage, rest) = Storage::remote(config, preferences)?;
        Ok(Self::from_storage(storage, auth, Some(rest), clock))
    }

    /// In-memory backend, for tests and previews.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), Arc::new(LocalAuthClient), None, clock)
    }

    #[must_use]
    pub fn from_storage(
        storage: Storage,
        auth: Arc<dyn AuthClient>,
        rest: Option<RestClient>,
        clock: Clock,
    ) -> Self {
        let lessons = Arc::new(LessonService::new(
            clock,
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.activities),
            Arc::clone(&storage.mastery),
            Arc::clone(&storage.completions),
        ));
        let families = Arc::new(FamilyService::new(Arc::clone(&storage.families)));
        let dashboard = Arc::new(DashboardService::new(
            Arc::clone(&storage.children),
            Arc::clone(&storage.mastery),
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.completions),
        ));
        let content_admin = Arc::new(ContentAdminService::new(Arc::clone(&storage.activities)));
        let onboarding = Arc::new(OnboardingService::new(Arc::clone(&storage.preferences)));

        Self {
            clock,
            auth,
            rest,
            lessons,
            families,
            dashboard,
            content_admin,
            onboarding,
        }
    }

    /// Signs in, points remote requests at the new session and resolves the family.
    ///
    /// # Errors
    ///
    /// Returns `FamilyError::Auth` for rejected credentials, or
    /// `FamilyError::Storage` if the family cannot be resolved.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<FamilyContext, FamilyError> {
        let session = self.auth.sign_in_with_password(email, password).await?;
        self.attach(session).await
    }

    /// Builds the family context for a session obtained elsewhere (sign-up, magic link).
    ///
    /// # Errors
    ///
    /// Returns `FamilyError::Storage` if the family cannot be resolved.
    pub async fn attach(&self, session: AuthSession) -> Result<FamilyContext, FamilyError> {
        if let Some(rest) = &self.rest {
            rest.set_access_token(Some(session.access_token.clone()));
        }
        self.families.resolve(session).await
    }

    /// # Errors
    ///
    /// Returns `FamilyError::Auth` if the provider cannot revoke the session.
    pub async fn sign_out(&self, context: &FamilyContext) -> Result<(), FamilyError> {
        if let Some(rest) = &self.rest {
            rest.set_access_token(None);
        }
        self.auth.sign_out(&context.session).await?;
        Ok(())
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn auth(&self) -> Arc<dyn AuthClient> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonService> {
        Arc::clone(&self.lessons)
    }

    #[must_use]
    pub fn families(&self) -> Arc<FamilyService> {
        Arc::clone(&self.families)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn content_admin(&self) -> Arc<ContentAdminService> {
        Arc::clone(&self.content_admin)
    }

    #[must_use]
    pub fn onboarding(&self) -> Arc<OnboardingService> {
        Arc::clone(&self.onboarding)
    }
}
