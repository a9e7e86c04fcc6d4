#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth;
pub mod content_admin_service;
pub mod dashboard_service;
pub mod error;
pub mod family_service;
pub mod lesson_plan;
pub mod lesson_service;
pub mod onboarding_service;

pub use lesson_core::Clock;

pub use app_services::AppServices;
pub use auth::{AuthClient, AuthSession, GoTrueClient, LocalAuthClient, SignUpOutcome};
pub use content_admin_service::ContentAdminService;
pub use dashboard_service::{ChildOverview, DashboardService, LessonGroup, LessonStatus};
pub use error::{
    AppServicesError, AuthError, ContentAdminError, DashboardError, FamilyError,
    LessonServiceError, OnboardingError,
};
pub use family_service::{FamilyContext, FamilyService};
pub use lesson_plan::{LessonPlan, PRACTICE_ACTIVITY_LIMIT, SessionNonce};
pub use lesson_service::{CompletionSummary, LessonService, PracticeSession};
pub use onboarding_service::OnboardingService;
