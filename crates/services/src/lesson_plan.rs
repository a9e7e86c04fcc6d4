//! Picks the questions one lesson run will ask.
//!
//! Questions are deduplicated by normalized text, ranked by a hash of the
//! session nonce so every run (and every retry) draws a different but
//! reproducible subset, then interleaved with the lesson's info slides and
//! skip-only activities by `order_index`.
//!
//! Practice sessions draw from several lessons at once: only their scored
//! questions, in ranked order, at most [`PRACTICE_ACTIVITY_LIMIT`].

use std::collections::HashSet;

use lesson_core::leveling::Difficulty;
use lesson_core::model::Activity;
use rand::Rng;

use crate::Clock;

/// Lowercases and collapses whitespace; used as the duplicate signature.
#[must_use]
pub fn normalize_question_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 32-bit rolling string hash (`h * 31 + unit` over UTF-16 units, wrapping),
/// made non-negative.
#[must_use]
pub fn hash_string(value: &str) -> u64 {
    let hash = value.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    i64::from(hash).unsigned_abs()
}

/// Per-run seed for question ranking. A retry gets a fresh one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionNonce(String);

impl SessionNonce {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// `"<unix millis>-<random>"`.
    #[must_use]
    pub fn generate(clock: &Clock, rng: &mut impl Rng) -> Self {
        let millis = clock.now().timestamp_millis();
        let salt: u32 = rng.random();
        Self(format!("{millis}-{salt}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Questions in one practice session.
pub const PRACTICE_ACTIVITY_LIMIT: usize = 10;

/// The activities of one run plus how many of them are scored questions.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonPlan {
    pub activities: Vec<Activity>,
    pub question_count: u32,
}

impl LessonPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

/// Builds the run for `difficulty` out of a lesson's activities.
#[must_use]
pub fn build_lesson_plan(
    activities: &[Activity],
    difficulty: Difficulty,
    nonce: &SessionNonce,
) -> LessonPlan {
    // Info slides and unsupported activities are never scored, so they ride
    // along outside the question cap.
    let (pool, mut unscored): (Vec<&Activity>, Vec<&Activity>) = activities
        .iter()
        .partition(|activity| activity.kind.is_answerable());
    unscored.sort_by_key(|activity| activity.order_index);

    let mut questions = pick_questions(pool, nonce, difficulty.question_count());
    questions.sort_by_key(|activity| activity.order_index);

    let question_count = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    LessonPlan {
        activities: interleave(&unscored, &questions),
        question_count,
    }
}

/// Builds a practice session out of the activities of several lessons.
#[must_use]
pub fn build_practice_plan(activities: &[Activity], nonce: &SessionNonce) -> LessonPlan {
    let pool: Vec<&Activity> = activities
        .iter()
        .filter(|activity| activity.kind.is_answerable())
        .collect();
    let questions = pick_questions(pool, nonce, PRACTICE_ACTIVITY_LIMIT);

    LessonPlan {
        question_count: u32::try_from(questions.len()).unwrap_or(u32::MAX),
        activities: questions.into_iter().cloned().collect(),
    }
}

// Drops repeated question texts, then keeps the `limit` lowest nonce ranks.
fn pick_questions<'a>(pool: Vec<&'a Activity>, nonce: &SessionNonce, limit: usize) -> Vec<&'a Activity> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<(u64, &Activity)> = pool
        .into_iter()
        .filter(|activity| {
            let signature = normalize_question_text(&activity.question_text);
            !signature.is_empty() && seen.insert(signature)
        })
        .map(|question| {
            let key = format!(
                "{}|{}|{}",
                nonce.as_str(),
                question.id,
                normalize_question_text(&question.question_text)
            );
            (hash_string(&key), question)
        })
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);

    ranked
        .into_iter()
        .take(limit)
        .map(|(_, question)| question)
        .collect()
}

// Each unscored activity goes in front of the first question whose
// order_index is not smaller than its own.
fn interleave(unscored: &[&Activity], questions: &[&Activity]) -> Vec<Activity> {
    let mut merged = Vec::with_capacity(unscored.len() + questions.len());
    let mut slides = unscored.iter().peekable();

    for question in questions {
        while let Some(slide) = slides.next_if(|slide| slide.order_index <= question.order_index) {
            merged.push((*slide).clone());
        }
        merged.push((*question).clone());
    }
    merged.extend(slides.map(|slide| (*slide).clone()));
    merged
}
