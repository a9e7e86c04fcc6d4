use crate::model::{Activity, ActivityId, ChoiceOption};
use crate::widgets::{AnswerWidget, Feedback, WidgetSignal};

const CORRECT_FALLBACK: &str = "Great job sorting those cards!";
const WRONG_PROMPT: &str = "Try placing the best answer at the top! The correct answer was:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Card stack: reorder by drag or keyboard, submit judges the top card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardReorderWidget {
    activity_id: ActivityId,
    cards: Vec<ChoiceOption>,
    correct_text: Option<String>,
    drag_from: Option<usize>,
    focus: usize,
    submitted: bool,
}

impl CardReorderWidget {
    #[must_use]
    pub fn new(activity: &Activity) -> Self {
        Self {
            activity_id: activity.id.clone(),
            cards: activity.options.clone(),
            correct_text: activity.correct_options().next().map(|option| option.text.clone()),
            drag_from: None,
            focus: 0,
            submitted: false,
        }
    }

    #[must_use]
    pub fn cards(&self) -> &[ChoiceOption] {
        &self.cards
    }

    #[must_use]
    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn set_focus(&mut self, index: usize) {
        if index < self.cards.len() {
            self.focus = index;
        }
    }

    /// Moves the card at `from` to `to`. No scoring happens here.
    pub fn move_card(&mut self, from: usize, to: usize) -> Option<WidgetSignal> {
        if self.submitted || from >= self.cards.len() || to >= self.cards.len() {
            return None;
        }
        let card = self.cards.remove(from);
        self.cards.insert(to, card);
        Some(WidgetSignal::SelectionMade)
    }

    /// One step up or down, clamped at the ends (no wraparound).
    pub fn move_with_keyboard(
        &mut self,
        index: usize,
        direction: MoveDirection,
    ) -> Option<WidgetSignal> {
        if self.submitted || index >= self.cards.len() {
            return None;
        }
        let target = match direction {
            MoveDirection::Up => index.saturating_sub(1),
            MoveDirection::Down => (index + 1).min(self.cards.len() - 1),
        };
        if target == index {
            return None;
        }
        let signal = self.move_card(index, target);
        self.focus = target;
        signal
    }

    pub fn begin_drag(&mut self, index: usize) {
        if !self.submitted && index < self.cards.len() {
            self.drag_from = Some(index);
        }
    }

    pub fn drop_on(&mut self, index: usize) -> Option<WidgetSignal> {
        let from = self.drag_from.take()?;
        self.move_card(from, index)
    }

    #[must_use]
    pub fn top_card(&self) -> Option<&ChoiceOption> {
        self.cards.first()
    }
}

impl AnswerWidget for CardReorderWidget {
    fn activity_id(&self) -> &ActivityId {
        &self.activity_id
    }

    /// The stack always has an order to submit.
    fn has_selection(&self) -> bool {
        !self.cards.is_empty()
    }

    fn is_submitted(&self) -> bool {
        self.submitted
    }

    fn submit(&mut self) -> Option<WidgetSignal> {
        if self.submitted {
            return None;
        }
        let is_correct = self.top_card()?.is_correct;
        self.submitted = true;
        self.drag_from = None;
        Some(WidgetSignal::Answered { is_correct })
    }

    fn feedback(&self) -> Option<Feedback> {
        if !self.submitted {
            return None;
        }
        let top = self.top_card()?;
        let explanation = top.explanation.clone().filter(|text| !text.trim().is_empty());
        let feedback = if top.is_correct {
            Feedback {
                is_correct: true,
                headline: "✨ Correct!".to_string(),
                body: explanation.unwrap_or_else(|| CORRECT_FALLBACK.to_string()),
                correct_text: None,
            }
        } else {
            Feedback {
                is_correct: false,
                headline: "🔍 Not quite...".to_string(),
                body: match explanation {
                    Some(text) => format!("{WRONG_PROMPT} {text}"),
                    None => WRONG_PROMPT.to_string(),
                },
                correct_text: self.correct_text.clone(),
            }
        };
        Some(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActivityKind;

    fn activity() -> Activity {
        Activity::question(
            "cards-1",
            ActivityKind::Flashcard,
            "Put the best way to greet a teacher first",
            vec![
                ChoiceOption::new("1", "Wave from far away", false),
                ChoiceOption::new("2", "Bow and say ohayo gozaimasu", true),
                ChoiceOption::new("3", "Say nothing", false),
            ],
        )
    }

    fn order(widget: &CardReorderWidget) -> Vec<&str> {
        widget.cards().iter().map(|card| card.id.as_str()).collect()
    }

    #[test]
    fn keyboard_up_at_top_is_a_no_op() {
        let mut widget = CardReorderWidget::new(&activity());
        assert_eq!(widget.move_with_keyboard(0, MoveDirection::Up), None);
        assert_eq!(order(&widget), vec!["1", "2", "3"]);
    }

    #[test]
    fn keyboard_down_at_bottom_is_a_no_op() {
        let mut widget = CardReorderWidget::new(&activity());
        assert_eq!(widget.move_with_keyboard(2, MoveDirection::Down), None);
        assert_eq!(order(&widget), vec!["1", "2", "3"]);
    }

    #[test]
    fn keyboard_moves_one_step_and_follows_focus() {
        let mut widget = CardReorderWidget::new(&activity());
        assert_eq!(
            widget.move_with_keyboard(1, MoveDirection::Up),
            Some(WidgetSignal::SelectionMade)
        );
        assert_eq!(order(&widget), vec!["2", "1", "3"]);
        assert_eq!(widget.focus(), 0);
    }

    #[test]
    fn drag_and_drop_reorders() {
        let mut widget = CardReorderWidget::new(&activity());
        widget.begin_drag(2);
        assert_eq!(widget.drop_on(0), Some(WidgetSignal::SelectionMade));
        assert_eq!(order(&widget), vec!["3", "1", "2"]);
        assert_eq!(widget.drop_on(1), None);
    }

    #[test]
    fn submit_judges_top_card() {
        let mut widget = CardReorderWidget::new(&activity());
        widget.move_card(1, 0);
        assert_eq!(widget.submit(), Some(WidgetSignal::Answered { is_correct: true }));
        assert_eq!(widget.submit(), None);
        assert_eq!(widget.move_card(0, 2), None);
        assert_eq!(
            widget.feedback().map(|f| f.body),
            Some("Great job sorting those cards!".to_string())
        );
    }

    #[test]
    fn wrong_top_card_names_correct_answer() {
        let mut widget = CardReorderWidget::new(&activity());
        assert_eq!(widget.submit(), Some(WidgetSignal::Answered { is_correct: false }));
        let feedback = widget.feedback().unwrap();
        assert_eq!(feedback.correct_text.as_deref(), Some("Bow and say ohayo gozaimasu"));
        assert!(feedback.body.starts_with("Try placing the best answer at the top!"));
    }

    #[test]
    fn empty_stack_cannot_submit() {
        let activity = Activity::question("empty", ActivityKind::Flashcard, "Nothing", Vec::new());
        let mut widget = CardReorderWidget::new(&activity);
        assert_eq!(widget.submit(), None);
        assert!(!widget.is_submitted());
        assert_eq!(widget.move_with_keyboard(0, MoveDirection::Down), None);
    }
}
