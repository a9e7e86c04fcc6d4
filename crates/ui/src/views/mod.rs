mod admin;
mod dashboard;
mod lesson;
mod onboarding;
pub(crate) mod speak;
mod state;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod view_smoke;

pub use admin::{AdminLessonsView, ContentAdminView};
pub use dashboard::DashboardView;
pub use lesson::{LessonView, PracticeView, SkillPracticeView};
pub use onboarding::OnboardingOverlay;
pub use state::{ViewError, ViewState, view_state_from_resource};
