//! Content lint over the cultural fact files.
//!
//! Each file is a JSON array of fact rows. Rows that are not objects are
//! skipped; string fields that are missing count as empty.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, bail};
use regex::Regex;
use serde_json::Value;

/// Fact files checked when no paths are given.
pub const DEFAULT_FACT_FILES: [&str; 3] = [
    "public/data/supercharge_facts.json",
    "public/data/supercharge_facts.v1.json",
    "public/data/supercharge_facts.review.json",
];

/// Printed issues stop here; the count still reflects all of them.
pub const MAX_PRINTED_ISSUES: usize = 100;

/// Japanese terms that need a phonetic spelling in parentheses right after them.
const PHONETIC_TERMS: [&str; 14] = [
    "Konnichiwa",
    "Arigato",
    "Ohayo",
    "Sumimasen",
    "Itadakimasu",
    "onigiri",
    "miso",
    "ramen",
    "torii",
    "shinkansen",
    "matsuri",
    "ema",
    "omikuji",
    "hatsumode",
];

const BLOCKED_TERMS: [(&str, &str); 5] = [
    ("dark pattern", r"(?i)dark pattern"),
    ("gamble", r"(?i)\bgamble\b"),
    ("bet", r"(?i)\bbet\b"),
    ("shame", r"(?i)\bshame\b"),
    ("violence", r"(?i)\bviolence\b"),
];

#[allow(clippy::expect_used)]
static PHONETIC_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PHONETIC_TERMS
        .iter()
        .map(|term| Regex::new(&format!(r"(?i)\b{term}\b")).expect("static pattern"))
        .collect()
});

#[allow(clippy::expect_used)]
static BLOCKED_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    BLOCKED_TERMS
        .iter()
        .map(|(label, pattern)| (*label, Regex::new(pattern).expect("static pattern")))
        .collect()
});

#[allow(clippy::expect_used)]
static TRUE_FALSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)true\s*or\s*false").expect("static pattern"));

#[allow(clippy::expect_used)]
static REGIONAL_NOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)different in different places").expect("static pattern"));

/// Non-empty segments between `.`, `!` and `?`.
#[must_use]
pub fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|segment| !segment.trim().is_empty())
        .count()
}

/// True when `term` appears somewhere without `(` following it.
fn missing_phonetic(rule: &Regex, payload: &str) -> bool {
    rule.find_iter(payload)
        .any(|found| !payload[found.end()..].trim_start().starts_with('('))
}

fn text_field<'a>(row: &'a serde_json::Map<String, Value>, key: &str) -> &'a str {
    row.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Issues for one parsed fact array, each prefixed with the row index.
#[must_use]
pub fn lint_rows(rows: &[Value]) -> Vec<String> {
    let mut issues = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let Some(row) = row.as_object() else {
            continue;
        };
        let story = text_field(row, "story");
        let question = text_field(row, "question");
        let explanation = text_field(row, "explanation");
        let payload = format!("{story} {question} {explanation}");

        if sentence_count(story) > 2 {
            issues.push(format!("[{index}] story exceeds 2 sentences"));
        }
        if TRUE_FALSE.is_match(question) {
            issues.push(format!("[{index}] question uses true/false"));
        }
        for rule in PHONETIC_RULES.iter() {
            if missing_phonetic(rule, &payload) {
                let context = if question.is_empty() { story } else { question };
                issues.push(format!(
                    "[{index}] missing phonetic spelling for Japanese term in: {context}"
                ));
            }
        }
        for (label, rule) in BLOCKED_RULES.iter() {
            if rule.is_match(&payload) {
                issues.push(format!("[{index}] blocked term matched ({label})"));
            }
        }

        let source_confidence = text_field(row, "sourceConfidence");
        let source_note = text_field(row, "sourceNote");
        if source_confidence == "regional" && !REGIONAL_NOTE.is_match(source_note) {
            issues.push(format!(
                "[{index}] regional fact missing sourceNote variation guidance"
            ));
        }
    }

    issues
}

/// # Errors
///
/// Returns an error when the file cannot be read, is not JSON, or is not an array.
pub fn lint_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    let Value::Array(rows) = value else {
        bail!("{}: expected JSON array", path.display());
    };
    Ok(lint_rows(&rows))
}

/// Lints every path; a missing file is an issue, not an error.
///
/// # Errors
///
/// Returns an error when an existing file cannot be parsed.
pub fn lint_paths(paths: &[PathBuf]) -> anyhow::Result<Vec<String>> {
    let mut all = Vec::new();
    for path in paths {
        if !path.exists() {
            all.push(format!("[missing] {} not found", path.display()));
            continue;
        }
        for issue in lint_file(path)? {
            all.push(format!("{} {issue}", path.display()));
        }
    }
    Ok(all)
}
