use std::sync::Arc;
use std::time::Duration;

use lesson_core::Clock;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{
    ActivityRepository, ChildRepository, CompletionRepository, FamilyRepository,
    LessonRepository, MasteryRepository, PreferenceRepository, Storage,
};

mod child_repo;
mod content_repo;
mod family_repo;
mod mapping;
mod migrate;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
    clock: Clock,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// enforcing foreign key constraints fails during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self {
            pool,
            clock: Clock::default(),
        })
    }

    /// Stamps `created_at` and `applied_at` columns from `clock` instead of the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool, self.clock.now()).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`, timestamping rows from `clock`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str, clock: Clock) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?.with_clock(clock);
        repo.migrate().await?;
        Ok(Self::from_sqlite(repo))
    }

    #[must_use]
    pub fn from_sqlite(repo: SqliteRepository) -> Self {
        let activities: Arc<dyn ActivityRepository> = Arc::new(repo.clone());
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let children: Arc<dyn ChildRepository> = Arc::new(repo.clone());
        let mastery: Arc<dyn MasteryRepository> = Arc::new(repo.clone());
        let completions: Arc<dyn CompletionRepository> = Arc::new(repo.clone());
        let families: Arc<dyn FamilyRepository> = Arc::new(repo.clone());
        let preferences: Arc<dyn PreferenceRepository> = Arc::new(repo);
        Self {
            activities,
            lessons,
            children,
            mastery,
            completions,
            families,
            preferences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }
}
