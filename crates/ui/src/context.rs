use std::sync::Arc;

use lesson_core::Clock;
use lesson_core::model::{ChildId, FamilyId};
use lesson_core::speech::{SpeechBackend, SpeechQueue};
use services::{
    AppServices, ContentAdminService, DashboardService, FamilyContext, LessonService,
    OnboardingService,
};

/// What the composition root hands to the UI.
pub trait UiApp: Send + Sync {
    fn services(&self) -> AppServices;

    /// Signed-in family, resolved before launch.
    fn family(&self) -> FamilyContext;

    /// Child preselected on the dashboard.
    fn initial_child(&self) -> Option<ChildId>;

    fn speech_backend(&self) -> Arc<dyn SpeechBackend>;
}

#[derive(Clone)]
pub struct AppContext {
    clock: Clock,
    family: Arc<FamilyContext>,
    initial_child: Option<ChildId>,
    speech: SpeechQueue,

    lessons: Arc<LessonService>,
    dashboard: Arc<DashboardService>,
    content_admin: Arc<ContentAdminService>,
    onboarding: Arc<OnboardingService>,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        let services = app.services();

        Self {
            clock: services.clock(),
            family: Arc::new(app.family()),
            initial_child: app.initial_child(),
            speech: SpeechQueue::new(app.speech_backend()),
            lessons: services.lessons(),
            dashboard: services.dashboard(),
            content_admin: services.content_admin(),
            onboarding: services.onboarding(),
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn family(&self) -> Arc<FamilyContext> {
        Arc::clone(&self.family)
    }

    #[must_use]
    pub fn family_id(&self) -> FamilyId {
        self.family.family_id.clone()
    }

    #[must_use]
    pub fn initial_child(&self) -> Option<ChildId> {
        self.initial_child.clone()
    }

    #[must_use]
    pub fn speech(&self) -> SpeechQueue {
        self.speech.clone()
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonService> {
        Arc::clone(&self.lessons)
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

// This context is provided by the application composition root (`crates/app`).

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
