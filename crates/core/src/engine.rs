//! Linear lesson state machine.
//!
//! The engine owns the ordered activities of one lesson session, the cursor,
//! the cumulative score and the set of activities that already counted. Widgets
//! never touch this state directly; they report correctness through
//! [`LessonEngine::report_answer`] and the footer drives [`LessonEngine::advance`].

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{Activity, ActivityId, ActivityKind, WidgetKind};
use crate::time::Clock;

/// Fixed increment for a correct answer. There is no partial credit.
pub const POINTS_PER_CORRECT: u32 = 10;

/// Refused continue attempts before the stuck hint shows up.
pub const STUCK_ATTEMPT_THRESHOLD: u32 = 2;

/// Default time on one step before the stuck hint shows up.
pub const DEFAULT_STUCK_DELAY_SECS: i64 = 12;

/// Lower bound for a configured stuck delay.
pub const MIN_STUCK_DELAY_SECS: i64 = 3;

//
// ─── PUBLIC TYPES ──────────────────────────────────────────────────────────────
//

/// Final numbers handed to the completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonOutcome {
    pub score: u32,
    pub correct_count: u32,
    pub wrong_ids: Vec<ActivityId>,
    pub total_questions: u32,
}

impl LessonOutcome {
    /// Share of answerable activities answered correctly, in `0.0..=1.0`.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.correct_count) / f64::from(self.total_questions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unanswered { cursor: usize },
    Answered { cursor: usize },
    Terminal,
}

/// What the primary footer action does right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Answerable activity without a pending choice; the action is disabled.
    AwaitingInput,
    /// A pending choice exists; the action submits it.
    ReadyToSubmit,
    /// The action moves on (info slide, skip-only fallback, or answered).
    ReadyToContinue,
}

impl ProgressPhase {
    #[must_use]
    pub fn is_enabled(self) -> bool {
        !matches!(self, ProgressPhase::AwaitingInput)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved { cursor: usize },
    /// The current activity still needs an answer.
    Blocked,
    Completed(LessonOutcome),
    AlreadyComplete,
}

/// Effect of one correctness report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerReport {
    /// False when the activity had already been scored (or the lesson ended).
    pub counted: bool,
    pub points: u32,
    pub score: u32,
    pub streak: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    #[error("a lesson needs at least one activity")]
    NoActivities,
}

pub type CompletionCallback = Box<dyn FnMut(&LessonOutcome) + Send>;

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

pub struct LessonEngine {
    activities: Vec<Activity>,
    cursor: usize,
    score: u32,
    completed: HashSet<ActivityId>,
    correct_count: u32,
    wrong_ids: Vec<ActivityId>,
    streak: u32,
    terminal: bool,
    selection_made: bool,
    refused_attempts: u32,
    step_started_at: DateTime<Utc>,
    stuck_delay: Duration,
    clock: Clock,
    on_complete: Option<CompletionCallback>,
}

impl fmt::Debug for LessonEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LessonEngine")
            .field("activities", &self.activities.len())
            .field("cursor", &self.cursor)
            .field("score", &self.score)
            .field("completed", &self.completed.len())
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

impl LessonEngine {
    /// Starts a session at cursor 0.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoActivities` for an empty list; the player shows
    /// its empty state instead of mounting an engine.
    pub fn new(activities: Vec<Activity>) -> Result<Self, EngineError> {
        Self::with_clock(activities, Clock::default())
    }

    /// # Errors
    ///
    /// Returns `EngineError::NoActivities` for an empty list.
    pub fn with_clock(activities: Vec<Activity>, clock: Clock) -> Result<Self, EngineError> {
        if activities.is_empty() {
            return Err(EngineError::NoActivities);
        }
        Ok(Self {
            activities,
            cursor: 0,
            score: 0,
            completed: HashSet::new(),
            correct_count: 0,
            wrong_ids: Vec::new(),
            streak: 0,
            terminal: false,
            selection_made: false,
            refused_attempts: 0,
            step_started_at: clock.now(),
            stuck_delay: Duration::seconds(DEFAULT_STUCK_DELAY_SECS),
            clock,
            on_complete: None,
        })
    }

    /// Resumes at `index`, clamped into the activity range.
    #[must_use]
    pub fn with_initial_index(mut self, index: usize) -> Self {
        self.cursor = index.min(self.activities.len() - 1);
        self
    }

    #[must_use]
    pub fn with_stuck_delay(mut self, delay: Duration) -> Self {
        self.stuck_delay = delay.max(Duration::seconds(MIN_STUCK_DELAY_SECS));
        self
    }

    /// Registers the callback fired once when the lesson reaches its terminal state.
    #[must_use]
    pub fn on_complete(mut self, callback: impl FnMut(&LessonOutcome) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    //
    // ─── READ ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Activity under the cursor. Still the last one once terminal.
    #[must_use]
    pub fn current(&self) -> &Activity {
        &self.activities[self.cursor]
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor + 1 == self.activities.len()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    #[must_use]
    pub fn is_completed(&self, id: &ActivityId) -> bool {
        self.completed.contains(id)
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        if self.terminal {
            EngineState::Terminal
        } else if self.is_completed(&self.current().id) {
            EngineState::Answered {
                cursor: self.cursor,
            }
        } else {
            EngineState::Unanswered {
                cursor: self.cursor,
            }
        }
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        let count = self
            .activities
            .iter()
            .filter(|activity| activity.kind.is_answerable())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn outcome(&self) -> LessonOutcome {
        LessonOutcome {
            score: self.score,
            correct_count: self.correct_count,
            wrong_ids: self.wrong_ids.clone(),
            total_questions: self.total_questions(),
        }
    }

    /// Progress bar fill in `0.0..=1.0`; the current step counts as reached.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.terminal {
            return 1.0;
        }
        (self.cursor + 1) as f64 / self.activities.len() as f64
    }

    #[must_use]
    pub fn phase(&self) -> ProgressPhase {
        let current = self.current();
        if self.terminal || !current.kind.is_answerable() || self.is_completed(&current.id) {
            ProgressPhase::ReadyToContinue
        } else if self.selection_made {
            ProgressPhase::ReadyToSubmit
        } else {
            ProgressPhase::AwaitingInput
        }
    }

    #[must_use]
    pub fn primary_action_label(&self) -> &'static str {
        match self.phase() {
            ProgressPhase::AwaitingInput | ProgressPhase::ReadyToSubmit => "Check Answer",
            ProgressPhase::ReadyToContinue if self.is_last() => "Finish Lesson",
            ProgressPhase::ReadyToContinue => match self.current().kind {
                ActivityKind::Info => "Continue ->",
                _ => "Next Activity ->",
            },
        }
    }

    /// True when the learner looks stuck on the current step.
    #[must_use]
    pub fn should_offer_hint(&self, now: DateTime<Utc>) -> bool {
        let current = self.current();
        if self.terminal
            || current.kind.widget() == WidgetKind::InfoSlide
            || self.is_completed(&current.id)
            || self.phase() != ProgressPhase::AwaitingInput
        {
            return false;
        }
        self.refused_attempts >= STUCK_ATTEMPT_THRESHOLD
            || now - self.step_started_at >= self.stuck_delay
    }

    /// Same as [`Self::should_offer_hint`] with the engine's own clock.
    #[must_use]
    pub fn hint_due(&self) -> bool {
        self.should_offer_hint(self.clock.now())
    }

    #[must_use]
    pub fn hint_text(&self) -> &'static str {
        self.current().kind.hint_text()
    }

    //
    // ─── TRANSITIONS ──────────────────────────────────────────────────────
    //

    /// Records the first correctness report for `activity_id`.
    ///
    /// Later reports for the same id change nothing. A report for an id that is
    /// not under the cursor is still scored but never moves the cursor.
    pub fn report_answer(&mut self, activity_id: &ActivityId, is_correct: bool) -> AnswerReport {
        if self.terminal || self.completed.contains(activity_id) {
            return AnswerReport {
                counted: false,
                points: 0,
                score: self.score,
                streak: self.streak,
            };
        }

        if activity_id == &self.current().id {
            self.refused_attempts = 0;
        }
        self.completed.insert(activity_id.clone());
        let points = if is_correct {
            self.correct_count += 1;
            self.streak += 1;
            POINTS_PER_CORRECT
        } else {
            self.wrong_ids.push(activity_id.clone());
            self.streak = 0;
            0
        };
        self.score += points;

        AnswerReport {
            counted: true,
            points,
            score: self.score,
            streak: self.streak,
        }
    }

    /// Side channel from widgets: a pending choice exists (or was cleared).
    pub fn set_selection_made(&mut self, made: bool) {
        if !self.terminal {
            self.selection_made = made;
        }
    }

    /// Moves one step forward, or finishes the lesson from the last activity.
    pub fn advance(&mut self) -> Advance {
        if self.terminal {
            return Advance::AlreadyComplete;
        }

        let current = &self.activities[self.cursor];
        match current.kind.widget() {
            WidgetKind::InfoSlide => {
                self.completed.insert(current.id.clone());
            }
            WidgetKind::Unsupported => {}
            WidgetKind::Choice | WidgetKind::MapClick | WidgetKind::CardReorder => {
                if !self.completed.contains(&current.id) {
                    self.refused_attempts += 1;
                    return Advance::Blocked;
                }
            }
        }

        if self.is_last() {
            self.terminal = true;
            self.selection_made = false;
            let outcome = self.outcome();
            if let Some(mut callback) = self.on_complete.take() {
                callback(&outcome);
            }
            return Advance::Completed(outcome);
        }

        self.cursor += 1;
        self.selection_made = false;
        self.refused_attempts = 0;
        self.step_started_at = self.clock.now();
        Advance::Moved {
            cursor: self.cursor,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
