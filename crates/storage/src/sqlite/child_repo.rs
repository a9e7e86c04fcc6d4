use async_trait::async_trait;
use lesson_core::model::{ChildId, ChildProfile, FamilyId, SkillMastery, ValidatedChildProfile};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, map_child_row, map_completion_row, map_mastery_row, rejected, ser};
use crate::repository::{
    ChildRepository, CompletionRecord, CompletionRepository, MasteryRepository, StorageError,
};

const CHILD_COLUMNS: &str = "id, family_id, name, avatar_url, age_group, streak_count, total_points, mastery_gating_enabled";

#[async_trait]
impl ChildRepository for SqliteRepository {
    async fn list_children(&self, family_id: &FamilyId) -> Result<Vec<ChildProfile>, StorageError> {
        let sql = format!(
            "SELECT {CHILD_COLUMNS} FROM child_profiles WHERE family_id = ?1 ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(family_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_child_row).collect()
    }

    async fn get_child(&self, id: &ChildId) -> Result<Option<ChildProfile>, StorageError> {
        let sql = format!("SELECT {CHILD_COLUMNS} FROM child_profiles WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_child_row).transpose()
    }

    async fn insert_child(&self, child: ValidatedChildProfile) -> Result<ChildProfile, StorageError> {
        let profile = child.assign_id(ChildId::generate());

        sqlx::query(
            r"
            INSERT INTO child_profiles (id, family_id, name, avatar_url, age_group, streak_count, total_points, mastery_gating_enabled, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, 0, ?6)
            ",
        )
        .bind(profile.id.as_str())
        .bind(profile.family_id.as_str())
        .bind(&profile.name)
        .bind(&profile.avatar_url)
        .bind(profile.age_group.as_str())
        .bind(self.clock.now())
        .execute(&self.pool)
        .await
        .map_err(rejected)?;

        Ok(profile)
    }
}

#[async_trait]
impl MasteryRepository for SqliteRepository {
    async fn list_mastery(&self, child_id: &ChildId) -> Result<Vec<SkillMastery>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT m.child_id, m.skill_id, s.name AS skill_name, m.mastery_level, m.last_practiced_at
            FROM child_skill_mastery m
            LEFT JOIN skills s ON s.id = m.skill_id
            WHERE m.child_id = ?1
            ORDER BY m.mastery_level DESC, m.skill_id ASC
            ",
        )
        .bind(child_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_mastery_row).collect()
    }
}

#[async_trait]
impl CompletionRepository for SqliteRepository {
    async fn record_completion(&self, record: &CompletionRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_completions (child_id, lesson_id, completed_at, score, xp_earned)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(child_id, lesson_id) DO UPDATE SET
                completed_at = excluded.completed_at,
                score = excluded.score,
                xp_earned = excluded.xp_earned
            ",
        )
        .bind(record.child_id.as_str())
        .bind(record.lesson_id.as_str())
        .bind(record.completed_at)
        .bind(i64::from(record.score))
        .bind(i64::from(record.xp_earned))
        .execute(&self.pool)
        .await
        .map_err(rejected)?;

        Ok(())
    }

    async fn list_completions(&self, child_id: &ChildId) -> Result<Vec<CompletionRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT child_id, lesson_id, completed_at, score, xp_earned
            FROM lesson_completions
            WHERE child_id = ?1
            ORDER BY completed_at ASC, lesson_id ASC
            ",
        )
        .bind(child_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_completion_row).collect()
    }

    async fn grant_xp(&self, child_id: &ChildId, amount: u32) -> Result<u64, StorageError> {
        let row = sqlx::query(
            r"
            UPDATE child_profiles
            SET total_points = total_points + ?1
            WHERE id = ?2
            RETURNING total_points
            ",
        )
        .bind(i64::from(amount))
        .bind(child_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Err(StorageError::NotFound);
        };
        let total: i64 = row.try_get("total_points").map_err(ser)?;
        u64::try_from(total).map_err(ser)
    }
}
