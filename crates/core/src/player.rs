//! One mounted lesson: the engine plus the widget of the current activity.
//!
//! `LessonRun` routes widget signals into the engine and remounts the widget
//! whenever the cursor moves, so per-activity state never leaks across steps.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::engine::{Advance, AnswerReport, LessonEngine, ProgressPhase};
use crate::model::{Activity, ActivityId, OptionId};
use crate::widgets::{ActivityWidget, ChoiceKey, Feedback, MoveDirection, WidgetSignal};

/// Streak length at which the player shows the streak banner.
pub const STREAK_BANNER_MIN: u32 = 3;

/// Result of one learner action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Nothing changed (locked widget, unknown option, ...).
    Ignored,
    SelectionChanged,
    Answered {
        is_correct: bool,
        report: AnswerReport,
    },
    Advanced(Advance),
}

#[derive(Debug)]
pub struct LessonRun {
    engine: LessonEngine,
    widget: ActivityWidget,
    rng: StdRng,
    shuffle: bool,
    hint_for: Option<ActivityId>,
}

impl LessonRun {
    /// Mounts the first widget with an OS-seeded shuffle.
    #[must_use]
    pub fn new(engine: LessonEngine) -> Self {
        Self::build(engine, StdRng::from_os_rng(), true)
    }

    /// Deterministic shuffle for tests and replays.
    #[must_use]
    pub fn with_seed(engine: LessonEngine, seed: u64) -> Self {
        Self::build(engine, StdRng::seed_from_u64(seed), true)
    }

    /// Keeps authored option order.
    #[must_use]
    pub fn unshuffled(engine: LessonEngine) -> Self {
        Self::build(engine, StdRng::seed_from_u64(0), false)
    }

    fn build(engine: LessonEngine, rng: StdRng, shuffle: bool) -> Self {
        let mut run = Self {
            widget: ActivityWidget::InfoSlide {
                activity_id: engine.current().id.clone(),
            },
            engine,
            rng,
            shuffle,
            hint_for: None,
        };
        run.remount();
        run
    }

    fn remount(&mut self) {
        self.widget = ActivityWidget::mount(self.engine.current(), &mut self.rng, self.shuffle);
        self.hint_for = None;
        // A card stack always holds a submittable order.
        self.engine.set_selection_made(self.widget.has_selection());
    }

    #[must_use]
    pub fn engine(&self) -> &LessonEngine {
        &self.engine
    }

    #[must_use]
    pub fn widget(&self) -> &ActivityWidget {
        &self.widget
    }

    #[must_use]
    pub fn current(&self) -> &Activity {
        self.engine.current()
    }

    #[must_use]
    pub fn feedback(&self) -> Option<Feedback> {
        self.widget.feedback()
    }

    #[must_use]
    pub fn show_streak_banner(&self) -> bool {
        self.engine.streak() >= STREAK_BANNER_MIN
    }

    //
    // ─── LEARNER INPUT ────────────────────────────────────────────────────
    //

    /// Picks an option in a choice list or a pin on a map.
    pub fn select_option(&mut self, id: &OptionId) -> RunEvent {
        let signal = match &mut self.widget {
            ActivityWidget::Choice(widget) => widget.select(id),
            ActivityWidget::MapClick(widget) => widget.select(id),
            _ => None,
        };
        self.apply(signal)
    }

    pub fn choice_key(&mut self, key: ChoiceKey) -> RunEvent {
        let signal = match &mut self.widget {
            ActivityWidget::Choice(widget) => widget.handle_key(key),
            _ => None,
        };
        self.apply(signal)
    }

    pub fn move_card(&mut self, index: usize, direction: MoveDirection) -> RunEvent {
        let signal = match &mut self.widget {
            ActivityWidget::CardReorder(widget) => widget.move_with_keyboard(index, direction),
            _ => None,
        };
        self.apply(signal)
    }

    pub fn begin_drag(&mut self, index: usize) {
        if let ActivityWidget::CardReorder(widget) = &mut self.widget {
            widget.begin_drag(index);
        }
    }

    pub fn drop_card(&mut self, index: usize) -> RunEvent {
        let signal = match &mut self.widget {
            ActivityWidget::CardReorder(widget) => widget.drop_on(index),
            _ => None,
        };
        self.apply(signal)
    }

    pub fn submit(&mut self) -> RunEvent {
        let signal = self.widget.submit();
        self.apply(signal)
    }

    /// Footer button: submit, continue, or count a refused attempt.
    pub fn primary_action(&mut self) -> RunEvent {
        match self.engine.phase() {
            ProgressPhase::ReadyToSubmit => self.submit(),
            ProgressPhase::AwaitingInput | ProgressPhase::ReadyToContinue => self.advance(),
        }
    }

    /// Skip-only escape hatch and plain continue.
    pub fn advance(&mut self) -> RunEvent {
        let result = self.engine.advance();
        if let Advance::Moved { .. } = result {
            self.remount();
        }
        RunEvent::Advanced(result)
    }

    /// Shows the hint for the current step when the learner looks stuck.
    pub fn request_hint(&mut self) -> Option<&'static str> {
        if !self.engine.hint_due() {
            return None;
        }
        self.hint_for = Some(self.engine.current().id.clone());
        Some(self.engine.hint_text())
    }

    /// Hint text if one was requested for the current step.
    #[must_use]
    pub fn visible_hint(&self) -> Option<&'static str> {
        (self.hint_for.as_ref() == Some(&self.engine.current().id))
            .then(|| self.engine.hint_text())
    }

    fn apply(&mut self, signal: Option<WidgetSignal>) -> RunEvent {
        match signal {
            None => RunEvent::Ignored,
            Some(WidgetSignal::SelectionMade) => {
                self.engine.set_selection_made(true);
                RunEvent::SelectionChanged
            }
            Some(WidgetSignal::Answered { is_correct }) => {
                let id = self.widget.activity_id().clone();
                let report = self.engine.report_answer(&id, is_correct);
                RunEvent::Answered { is_correct, report }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::engine::LessonOutcome;
    use crate::model::{ActivityKind, ChoiceOption};
    use crate::time::fixed_clock;

    fn mc(id: &str, correct: &str) -> Activity {
        Activity::question(
            id,
            ActivityKind::MultipleChoice,
            format!("Question {id}"),
            vec![
                ChoiceOption::new("A", "Alpha", correct == "A"),
                ChoiceOption::new("B", "Beta", correct == "B"),
            ],
        )
    }

    fn run_with_sink() -> (LessonRun, Arc<Mutex<Vec<LessonOutcome>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let engine = LessonEngine::with_clock(
            vec![
                Activity::info("intro", "Welcome", "Let's learn about manners."),
                mc("q1", "B"),
                mc("q2", "A"),
            ],
            fixed_clock(),
        )
        .unwrap()
        .on_complete(move |outcome| sink.lock().unwrap().push(outcome.clone()));
        (LessonRun::with_seed(engine, 3), calls)
    }

    #[test]
    fn full_lesson_through_primary_action() {
        let (mut run, calls) = run_with_sink();

        assert_eq!(run.engine().primary_action_label(), "Continue ->");
        run.primary_action();

        assert_eq!(run.primary_action(), RunEvent::Advanced(Advance::Blocked));
        run.select_option(&OptionId::new("B"));
        assert_eq!(run.engine().primary_action_label(), "Check Answer");
        assert!(matches!(
            run.primary_action(),
            RunEvent::Answered { is_correct: true, .. }
        ));
        run.primary_action();

        run.select_option(&OptionId::new("A"));
        run.primary_action();
        assert_eq!(run.engine().primary_action_label(), "Finish Lesson");
        assert!(matches!(
            run.primary_action(),
            RunEvent::Advanced(Advance::Completed(_))
        ));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].score, 20);
    }

    #[test]
    fn wrong_answer_keeps_correct_option_visible() {
        let (mut run, calls) = run_with_sink();
        run.advance();
        run.select_option(&OptionId::new("A"));
        run.submit();
        let feedback = run.feedback().unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(feedback.correct_text.as_deref(), Some("Beta"));

        run.advance();
        run.select_option(&OptionId::new("A"));
        run.submit();
        run.advance();
        assert_eq!(calls.lock().unwrap()[0].score, 10);
    }

    #[test]
    fn widget_state_resets_on_advance() {
        let (mut run, _) = run_with_sink();
        run.advance();
        run.select_option(&OptionId::new("B"));
        run.submit();
        run.advance();
        assert_eq!(run.widget().activity_id().as_str(), "q2");
        assert!(!run.widget().is_submitted());
        assert!(!run.widget().has_selection());
        assert_eq!(run.engine().phase(), ProgressPhase::AwaitingInput);
    }

    #[test]
    fn card_stack_is_submittable_on_mount() {
        let engine = LessonEngine::new(vec![Activity::question(
            "f",
            ActivityKind::Flashcard,
            "Best first",
            vec![
                ChoiceOption::new("1", "Bow", true),
                ChoiceOption::new("2", "Shout", false),
            ],
        )])
        .unwrap();
        let mut run = LessonRun::unshuffled(engine);
        assert_eq!(run.engine().phase(), ProgressPhase::ReadyToSubmit);
        assert_eq!(run.move_card(0, MoveDirection::Up), RunEvent::Ignored);
        assert!(matches!(
            run.primary_action(),
            RunEvent::Answered { is_correct: true, .. }
        ));
    }

    #[test]
    fn hint_after_two_blocked_attempts() {
        let (mut run, _) = run_with_sink();
        run.advance();
        assert_eq!(run.request_hint(), None);
        run.primary_action();
        run.primary_action();
        assert_eq!(
            run.request_hint(),
            Some("Hint: Read every choice out loud and cross out one choice that does not fit.")
        );
        assert!(run.visible_hint().is_some());
        run.select_option(&OptionId::new("B"));
        run.submit();
        run.advance();
        assert_eq!(run.visible_hint(), None);
    }
}
