use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS lessons (
        id TEXT PRIMARY KEY,
        level_id TEXT,
        title TEXT NOT NULL,
        description TEXT,
        order_index INTEGER NOT NULL DEFAULT 0
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS activities (
        id TEXT PRIMARY KEY,
        lesson_id TEXT NOT NULL,
        type TEXT NOT NULL,
        question_text TEXT NOT NULL,
        content TEXT,
        media_url TEXT,
        options TEXT NOT NULL DEFAULT '[]',
        order_index INTEGER NOT NULL DEFAULT 0,
        difficulty INTEGER NOT NULL DEFAULT 1 CHECK (difficulty BETWEEN 1 AND 3),
        FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY,
        email TEXT,
        created_at TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS families (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        created_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (created_by) REFERENCES profiles(id)
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS family_members (
        family_id TEXT NOT NULL,
        profile_id TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'admin',
        PRIMARY KEY (family_id, profile_id),
        FOREIGN KEY (family_id) REFERENCES families(id) ON DELETE CASCADE,
        FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS child_profiles (
        id TEXT PRIMARY KEY,
        family_id TEXT NOT NULL,
        name TEXT NOT NULL,
        avatar_url TEXT,
        age_group TEXT NOT NULL CHECK (age_group IN ('K-2', '3-5', '6-8', '9-12')),
        streak_count INTEGER NOT NULL DEFAULT 0 CHECK (streak_count >= 0),
        total_points INTEGER NOT NULL DEFAULT 0 CHECK (total_points >= 0),
        mastery_gating_enabled INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        FOREIGN KEY (family_id) REFERENCES families(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS skills (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS child_skill_mastery (
        child_id TEXT NOT NULL,
        skill_id TEXT NOT NULL,
        mastery_level INTEGER NOT NULL CHECK (mastery_level BETWEEN 0 AND 100),
        last_practiced_at TEXT,
        PRIMARY KEY (child_id, skill_id),
        FOREIGN KEY (child_id) REFERENCES child_profiles(id) ON DELETE CASCADE,
        FOREIGN KEY (skill_id) REFERENCES skills(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS lesson_completions (
        child_id TEXT NOT NULL,
        lesson_id TEXT NOT NULL,
        completed_at TEXT NOT NULL,
        score INTEGER NOT NULL CHECK (score >= 0),
        xp_earned INTEGER NOT NULL CHECK (xp_earned >= 0),
        PRIMARY KEY (child_id, lesson_id),
        FOREIGN KEY (child_id) REFERENCES child_profiles(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS preferences (
        key TEXT PRIMARY KEY,
        value INTEGER NOT NULL
    );
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_activities_lesson_order
        ON activities (lesson_id, order_index);
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_child_profiles_family
        ON child_profiles (family_id, created_at);
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_family_members_profile
        ON family_members (profile_id);
    ",
];

const SCHEMA_V2: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS lesson_skills (
        lesson_id TEXT NOT NULL,
        skill_id TEXT NOT NULL,
        PRIMARY KEY (lesson_id, skill_id),
        FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_lesson_skills_skill
        ON lesson_skills (skill_id, lesson_id);
    ",
];

const MIGRATIONS: &[(i64, &[&str])] = &[(1, SCHEMA_V1), (2, SCHEMA_V2)];

/// Applies pending schema versions, each inside its own transaction.
pub async fn run_migrations(pool: &SqlitePool, now: DateTime<Utc>) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    for &(version, statements) in MIGRATIONS {
        if is_applied(pool, version).await? {
            continue;
        }
        let mut tx = pool.begin().await?;

        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(version)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(version, "applied sqlite schema");
    }

    Ok(())
}
