use lesson_core::model::{
    Activity, ActivityKind, AgeGroup, ChildProfile, ChoiceOption, Lesson, SkillMastery,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{CompletionRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Constraint failures keep the database's own message, like a rejected remote write.
pub(crate) fn rejected(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::Database(db) => StorageError::Remote {
            status: 400,
            message: db.message().to_string(),
        },
        other => conn(other),
    }
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn options_to_json(options: &[ChoiceOption]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn map_activity_row(row: &SqliteRow) -> Result<Activity, StorageError> {
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<ChoiceOption> = serde_json::from_str(&options_json).map_err(ser)?;
    let difficulty: i64 = row.try_get("difficulty").map_err(ser)?;

    Ok(Activity {
        id: row.try_get::<String, _>("id").map_err(ser)?.into(),
        lesson_id: Some(row.try_get::<String, _>("lesson_id").map_err(ser)?.into()),
        kind: ActivityKind::from_tag(&row.try_get::<String, _>("type").map_err(ser)?),
        question_text: row.try_get("question_text").map_err(ser)?,
        content: row.try_get("content").map_err(ser)?,
        media_url: row.try_get("media_url").map_err(ser)?,
        options,
        order_index: row.try_get("order_index").map_err(ser)?,
        difficulty: u8::try_from(difficulty)
            .map_err(|_| StorageError::Serialization(format!("invalid difficulty: {difficulty}")))?,
    })
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Ok(Lesson {
        id: row.try_get::<String, _>("id").map_err(ser)?.into(),
        level_id: row
            .try_get::<Option<String>, _>("level_id")
            .map_err(ser)?
            .map(Into::into),
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        order_index: row.try_get("order_index").map_err(ser)?,
    })
}

pub(crate) fn map_child_row(row: &SqliteRow) -> Result<ChildProfile, StorageError> {
    let age_group: AgeGroup = row
        .try_get::<String, _>("age_group")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    Ok(ChildProfile {
        id: row.try_get::<String, _>("id").map_err(ser)?.into(),
        family_id: row.try_get::<String, _>("family_id").map_err(ser)?.into(),
        name: row.try_get("name").map_err(ser)?,
        avatar_url: row.try_get("avatar_url").map_err(ser)?,
        age_group,
        streak_count: u32_from_i64("streak_count", row.try_get("streak_count").map_err(ser)?)?,
        total_points: u32_from_i64("total_points", row.try_get("total_points").map_err(ser)?)?,
        mastery_gating_enabled: row.try_get::<i64, _>("mastery_gating_enabled").map_err(ser)? != 0,
    })
}

pub(crate) fn map_mastery_row(row: &SqliteRow) -> Result<SkillMastery, StorageError> {
    let level: i64 = row.try_get("mastery_level").map_err(ser)?;
    Ok(SkillMastery {
        child_id: row.try_get::<String, _>("child_id").map_err(ser)?.into(),
        skill_id: row.try_get::<String, _>("skill_id").map_err(ser)?.into(),
        skill_name: row
            .try_get::<Option<String>, _>("skill_name")
            .map_err(ser)?
            .unwrap_or_default(),
        mastery_level: u8::try_from(level.clamp(0, 100)).map_err(ser)?,
        last_practiced_at: row.try_get("last_practiced_at").map_err(ser)?,
    })
}

pub(crate) fn map_completion_row(row: &SqliteRow) -> Result<CompletionRecord, StorageError> {
    Ok(CompletionRecord {
        child_id: row.try_get::<String, _>("child_id").map_err(ser)?.into(),
        lesson_id: row.try_get::<String, _>("lesson_id").map_err(ser)?.into(),
        completed_at: row.try_get("completed_at").map_err(ser)?,
        score: u32_from_i64("score", row.try_get("score").map_err(ser)?)?,
        xp_earned: u32_from_i64("xp_earned", row.try_get("xp_earned").map_err(ser)?)?,
    })
}
