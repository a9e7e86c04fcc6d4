//! XP, levels, difficulty rewards and star ratings.
//!
//! Going from level `L` to `L + 1` costs `L * 100` XP, so the cumulative XP
//! needed to reach level `L` is `L * (L - 1) * 50`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::POINTS_PER_CORRECT;

/// Cumulative XP required to reach `level`.
#[must_use]
pub fn xp_for_level(level: u32) -> u64 {
    let level = u64::from(level);
    level * level.saturating_sub(1) * 50
}

/// Level reached with `total_xp`. Never below 1.
#[must_use]
pub fn level_from_xp(total_xp: u64) -> u32 {
    #[allow(clippy::cast_precision_loss)]
    let root = (1.0 + (1.0 + (4.0 * total_xp as f64) / 50.0).sqrt()) / 2.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut level = root.floor() as u32;

    // Guard the float estimate against rounding at exact boundaries.
    while level > 1 && xp_for_level(level) > total_xp {
        level -= 1;
    }
    while xp_for_level(level + 1) <= total_xp {
        level += 1;
    }
    level.max(1)
}

/// XP earned inside the current level.
#[must_use]
pub fn xp_progress_in_level(total_xp: u64) -> u64 {
    total_xp - xp_for_level(level_from_xp(total_xp))
}

/// XP the current level costs in total.
#[must_use]
pub fn xp_needed_for_next_level(total_xp: u64) -> u64 {
    u64::from(level_from_xp(total_xp)) * 100
}

/// Progress inside the current level, capped at 100.
#[must_use]
pub fn level_progress_percent(total_xp: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let percent =
        xp_progress_in_level(total_xp) as f64 / xp_needed_for_next_level(total_xp) as f64 * 100.0;
    percent.min(100.0)
}

/// Snapshot for the completion screen and dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelProgress {
    pub level: u32,
    pub xp_in_level: u64,
    pub xp_needed: u64,
    pub percent: f64,
}

impl LevelProgress {
    #[must_use]
    pub fn from_total(total_xp: u64) -> Self {
        Self {
            level: level_from_xp(total_xp),
            xp_in_level: xp_progress_in_level(total_xp),
            xp_needed: xp_needed_for_next_level(total_xp),
            percent: level_progress_percent(total_xp),
        }
    }
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[must_use]
    pub fn question_count(self) -> usize {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 20,
            Difficulty::Hard => 30,
        }
    }

    #[must_use]
    pub fn base_xp(self) -> u32 {
        match self {
            Difficulty::Easy => 100,
            Difficulty::Medium => 200,
            Difficulty::Hard => 300,
        }
    }

    /// Rank name on the challenge picker.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Rookie",
            Difficulty::Medium => "Scout",
            Difficulty::Hard => "Explorer",
        }
    }

    #[must_use]
    pub fn tagline(self) -> &'static str {
        match self {
            Difficulty::Easy => "Quick Start",
            Difficulty::Medium => "Regular Training",
            Difficulty::Hard => "Master Class",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown difficulty: {0}")]
pub struct ParseDifficultyError(String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "rookie" => Ok(Difficulty::Easy),
            "medium" | "scout" => Ok(Difficulty::Medium),
            "hard" | "explorer" => Ok(Difficulty::Hard),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Score clamped to what `question_count` questions can earn.
#[must_use]
pub fn capped_score(score: u32, question_count: u32) -> u32 {
    score.min(question_count.saturating_mul(POINTS_PER_CORRECT))
}

#[must_use]
pub fn is_perfect(final_score: u32, question_count: u32) -> bool {
    final_score == question_count.saturating_mul(POINTS_PER_CORRECT)
}

/// XP granted for a finished lesson; a perfect score doubles it.
#[must_use]
pub fn xp_reward(difficulty: Difficulty, final_score: u32, question_count: u32) -> u32 {
    let base = difficulty.base_xp();
    if is_perfect(final_score, question_count) {
        base * 2
    } else {
        base
    }
}

/// Flat XP for a skill practice session, whatever the score.
pub const PRACTICE_XP: u32 = 50;

/// 1 to 3 stars from accuracy.
#[must_use]
pub fn star_rating(correct_count: u32, total_questions: u32) -> u8 {
    if total_questions == 0 {
        return 1;
    }
    let accuracy = f64::from(correct_count) / f64::from(total_questions);
    if accuracy > 0.9 {
        3
    } else if accuracy > 0.6 {
        2
    } else {
        1
    }
}

#[must_use]
pub fn star_quote(stars: u8) -> &'static str {
    match stars {
        3 => "Amazing work, Explorer!",
        2 => "You're a star!",
        _ => "Great start!",
    }
}
