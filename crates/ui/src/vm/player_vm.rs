use lesson_core::leveling::{Difficulty, level_from_xp, star_quote};
use lesson_core::model::OptionId;
use lesson_core::player::LessonRun;
use lesson_core::widgets::{ChoiceKey, MoveDirection, OptionMark, PinPosition};
use services::CompletionSummary;

/// Learner actions routed into the mounted [`LessonRun`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerIntent {
    ChooseDifficulty(Difficulty),
    Select(OptionId),
    Key(ChoiceKey),
    MoveCard { index: usize, direction: MoveDirection },
    BeginDrag(usize),
    DropCard(usize),
    /// Footer button.
    Primary,
    /// Skip-only fallback for unsupported activities.
    Skip,
    Hint,
    /// Back to the difficulty picker, or a fresh practice session.
    Restart,
}

/// Maps a printable key to the choice list's shortcut input.
#[must_use]
pub fn choice_key_from_char(value: &str) -> Option<ChoiceKey> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ChoiceKey::Char(ch)),
        _ => None,
    }
}

/// Shortcut shown next to an option: `1..9`, nothing past the ninth.
#[must_use]
pub fn option_shortcut(index: usize) -> Option<String> {
    (index < 9).then(|| (index + 1).to_string())
}

#[must_use]
pub fn option_class(mark: OptionMark) -> &'static str {
    match mark {
        OptionMark::Idle => "option",
        OptionMark::Selected => "option option-selected",
        OptionMark::Correct => "option option-correct",
        OptionMark::Wrong => "option option-wrong",
    }
}

#[must_use]
pub fn pin_style(position: PinPosition) -> String {
    format!("top: {:.1}%; left: {:.1}%;", position.top, position.left)
}

#[must_use]
pub fn step_label(run: &LessonRun) -> String {
    let engine = run.engine();
    format!("{} / {}", engine.cursor() + 1, engine.len())
}

#[must_use]
pub fn progress_style(run: &LessonRun) -> String {
    format!("width: {:.0}%;", run.engine().progress() * 100.0)
}

#[must_use]
pub fn difficulty_card_label(difficulty: Difficulty) -> String {
    format!("{} Questions", difficulty.question_count())
}

/// Completion screen copy.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionVm {
    pub headline: &'static str,
    pub quote: &'static str,
    pub stars: String,
    pub correct_label: String,
    pub xp_label: String,
    pub score_label: String,
    pub level_label: String,
    pub level_xp_label: String,
    pub next_level_label: String,
    pub level_style: String,
    pub leveled_up: bool,
    /// Set when the backend did not take the result.
    pub sync_note: Option<&'static str>,
}

#[must_use]
pub fn completion_vm(summary: &CompletionSummary) -> CompletionVm {
    let level = summary.level;
    let previous_level = level_from_xp(summary.total_xp.saturating_sub(u64::from(summary.xp_earned)));
    let filled = usize::from(summary.stars.min(3));

    CompletionVm {
        headline: "Mission Complete!",
        quote: star_quote(summary.stars),
        stars: format!("{}{}", "★".repeat(filled), "☆".repeat(3 - filled)),
        correct_label: format!("{}/{}", summary.correct_count, summary.total_questions),
        xp_label: format!("+{}", summary.xp_earned),
        score_label: format!("Score: {}", summary.score),
        level_label: format!("Level {}", level.level),
        level_xp_label: format!("{} / {} XP", level.xp_in_level, level.xp_needed),
        next_level_label: format!(
            "{} XP to Level {}!",
            level.xp_needed.saturating_sub(level.xp_in_level),
            level.level + 1
        ),
        level_style: format!("width: {:.0}%;", level.percent),
        leveled_up: summary.synced && level.level > previous_level,
        sync_note: (!summary.synced).then_some("Progress could not be saved right now."),
    }
}

/// Same screen after a skill practice session, with practice copy.
#[must_use]
pub fn practice_completion_vm(summary: &CompletionSummary) -> CompletionVm {
    CompletionVm {
        headline: "Practice Complete!",
        quote: "Great job working on your skills!",
        ..completion_vm(summary)
    }
}
