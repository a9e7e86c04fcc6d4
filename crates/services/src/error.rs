//! Shared error types for the services crate.

use thiserror::Error;

use lesson_core::model::{ActivityError, ChildProfileError, LessonId};
use storage::repository::StorageError;
use storage::rest::RestInitError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `LessonService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonServiceError {
    #[error("lesson {0} not found")]
    LessonNotFound(LessonId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by an `AuthClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    /// The provider refused the request; `message` is its own wording.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("auth response did not contain a session")]
    MissingSession,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Errors emitted by `FamilyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FamilyError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error(transparent)]
    Child(#[from] ChildProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ContentAdminService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentAdminError {
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `OnboardingService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OnboardingError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Rest(#[from] RestInitError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
