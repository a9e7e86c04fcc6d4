//! Content refresh script generator.
//!
//! Topic `i` renames level `i` and lesson `i`, wipes that lesson's
//! activities and inserts an info slide plus one multiple-choice question.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Topic {
    pub title: String,
    pub description: String,
    /// Markdown body of the info slide.
    pub intro: String,
    pub question: String,
    pub options: Vec<TopicOption>,
}

/// Single-quoted SQL literal.
#[must_use]
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Builds the whole script as one transaction.
///
/// # Errors
///
/// Fails when there are fewer level or lesson ids than topics, or the
/// options cannot be encoded.
pub fn generate_update_sql(
    topics: &[Topic],
    level_ids: &[String],
    lesson_ids: &[String],
) -> anyhow::Result<String> {
    if level_ids.len() < topics.len() {
        bail!("{} topics but only {} level ids", topics.len(), level_ids.len());
    }
    if lesson_ids.len() < topics.len() {
        bail!("{} topics but only {} lesson ids", topics.len(), lesson_ids.len());
    }

    let mut sql = String::from("BEGIN;\n");

    for (topic, level_id) in topics.iter().zip(level_ids) {
        let _ = writeln!(
            sql,
            "UPDATE public.levels SET title = {}, description = {} WHERE id = {};",
            quote(&topic.title),
            quote(&topic.description),
            quote(level_id),
        );
    }

    for (topic, lesson_id) in topics.iter().zip(lesson_ids) {
        let lesson = quote(lesson_id);
        let options = serde_json::to_string(&topic.options).context("encoding options")?;
        let _ = writeln!(
            sql,
            "UPDATE public.lessons SET title = {} WHERE id = {lesson};",
            quote(&topic.title),
        );
        let _ = writeln!(sql, "DELETE FROM public.activities WHERE lesson_id = {lesson};");
        let _ = writeln!(
            sql,
            "INSERT INTO public.activities (lesson_id, type, question_text, content, order_index) VALUES ({lesson}, 'info', {}, {}, 1);",
            quote(&topic.title),
            quote(&topic.intro),
        );
        let _ = writeln!(
            sql,
            "INSERT INTO public.activities (lesson_id, type, question_text, options, order_index) VALUES ({lesson}, 'multiple_choice', {}, {}::jsonb, 2);",
            quote(&topic.question),
            quote(&options),
        );
    }

    sql.push_str("COMMIT;");
    Ok(sql)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Reads the topic file and the two id lists (JSON string arrays).
///
/// # Errors
///
/// Fails on unreadable or malformed input.
pub fn load_inputs(
    topics: &Path,
    level_ids: &Path,
    lesson_ids: &Path,
) -> anyhow::Result<(Vec<Topic>, Vec<String>, Vec<String>)> {
    Ok((read_json(topics)?, read_json(level_ids)?, read_json(lesson_ids)?))
}
