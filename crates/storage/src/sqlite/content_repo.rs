use async_trait::async_trait;
use lesson_core::model::{Activity, ActivityId, Lesson, LessonId, LevelId, SkillId};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::SqliteRepository;
use super::mapping::{conn, map_activity_row, map_lesson_row, options_to_json, ser};
use crate::repository::{ActivityRepository, LessonRepository, StorageError};

#[async_trait]
impl ActivityRepository for SqliteRepository {
    async fn list_activities(&self, lesson_id: &LessonId) -> Result<Vec<Activity>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, type, question_text, content, media_url, options, order_index, difficulty
            FROM activities
            WHERE lesson_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(lesson_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_activity_row).collect()
    }

    async fn upsert_activity(&self, activity: &Activity) -> Result<(), StorageError> {
        let Some(lesson_id) = activity.lesson_id.as_ref() else {
            return Err(StorageError::Serialization("activity has no lesson_id".into()));
        };
        let options = options_to_json(&activity.options)?;

        sqlx::query(
            r"
            INSERT INTO activities (id, lesson_id, type, question_text, content, media_url, options, order_index, difficulty)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                lesson_id = excluded.lesson_id,
                type = excluded.type,
                question_text = excluded.question_text,
                content = excluded.content,
                media_url = excluded.media_url,
                options = excluded.options,
                order_index = excluded.order_index,
                difficulty = excluded.difficulty
            ",
        )
        .bind(activity.id.as_str())
        .bind(lesson_id.as_str())
        .bind(activity.kind.as_tag())
        .bind(&activity.question_text)
        .bind(&activity.content)
        .bind(&activity.media_url)
        .bind(options)
        .bind(activity.order_index)
        .bind(i64::from(activity.difficulty))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn delete_activity(&self, id: &ActivityId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM activities WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for SqliteRepository {
    async fn list_lessons(&self, level_id: Option<&LevelId>) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, level_id, title, description, order_index
            FROM lessons
            WHERE ?1 IS NULL OR level_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(level_id.map(LevelId::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_lesson_row).collect()
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, level_id, title, description, order_index
            FROM lessons
            WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, level_id, title, description, order_index)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                level_id = excluded.level_id,
                title = excluded.title,
                description = excluded.description,
                order_index = excluded.order_index
            ",
        )
        .bind(lesson.id.as_str())
        .bind(lesson.level_id.as_ref().map(LevelId::as_str))
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(lesson.order_index)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn link_skill(&self, lesson_id: &LessonId, skill_id: &SkillId) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_skills (lesson_id, skill_id)
            VALUES (?1, ?2)
            ON CONFLICT(lesson_id, skill_id) DO NOTHING
            ",
        )
        .bind(lesson_id.as_str())
        .bind(skill_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn lessons_for_skills(&self, skill_ids: &[SkillId]) -> Result<Vec<LessonId>, StorageError> {
        if skill_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT DISTINCT lesson_id FROM lesson_skills WHERE skill_id IN (");
        let mut separated = query.separated(", ");
        for skill_id in skill_ids {
            separated.push_bind(skill_id.as_str());
        }
        separated.push_unseparated(") ORDER BY lesson_id ASC");

        let rows = query.build().fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("lesson_id")
                    .map(LessonId::from)
                    .map_err(ser)
            })
            .collect()
    }

    async fn linked_skills(&self, limit: usize) -> Result<Vec<SkillId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT DISTINCT skill_id
            FROM lesson_skills
            ORDER BY skill_id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("skill_id")
                    .map(SkillId::from)
                    .map_err(ser)
            })
            .collect()
    }
}
