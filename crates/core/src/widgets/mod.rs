//! Per-activity interaction state.
//!
//! A widget lives for one mount of one activity. It collects a pending choice,
//! locks it in on submit and emits at most one [`WidgetSignal::Answered`].
//! Selection changes travel on a separate [`WidgetSignal::SelectionMade`]
//! channel so the footer can enable its primary action.

mod card_reorder;
mod choice;
mod map_click;

use rand::Rng;

use crate::model::{Activity, ActivityId, WidgetKind};

pub use card_reorder::{CardReorderWidget, MoveDirection};
pub use choice::{ChoiceKey, ChoiceWidget, OptionMark};
pub use map_click::{MapClickWidget, Pin, PinPosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetSignal {
    SelectionMade,
    Answered { is_correct: bool },
}

/// What the learner sees after submitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub is_correct: bool,
    pub headline: String,
    pub body: String,
    /// Text of the correct option, shown when the learner missed it.
    pub correct_text: Option<String>,
}

/// Uniform answer contract shared by the answerable widgets.
pub trait AnswerWidget {
    fn activity_id(&self) -> &ActivityId;

    fn has_selection(&self) -> bool;

    fn is_submitted(&self) -> bool;

    /// Locks in the pending choice. `None` when there is nothing to submit or
    /// the widget is already locked.
    fn submit(&mut self) -> Option<WidgetSignal>;

    fn feedback(&self) -> Option<Feedback>;
}

/// Widget state for the activity under the cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityWidget {
    InfoSlide { activity_id: ActivityId },
    Choice(ChoiceWidget),
    MapClick(MapClickWidget),
    CardReorder(CardReorderWidget),
    Unsupported { activity_id: ActivityId, tag: String },
}

impl ActivityWidget {
    /// Fresh widget for `activity`. Choice options are shuffled with `rng`
    /// when `shuffle` is set.
    pub fn mount<R: Rng + ?Sized>(activity: &Activity, rng: &mut R, shuffle: bool) -> Self {
        match activity.kind.widget() {
            WidgetKind::InfoSlide => ActivityWidget::InfoSlide {
                activity_id: activity.id.clone(),
            },
            WidgetKind::Choice => {
                let widget = if shuffle {
                    ChoiceWidget::shuffled(activity, rng)
                } else {
                    ChoiceWidget::new(activity)
                };
                ActivityWidget::Choice(widget)
            }
            WidgetKind::MapClick => ActivityWidget::MapClick(MapClickWidget::new(activity)),
            WidgetKind::CardReorder => {
                ActivityWidget::CardReorder(CardReorderWidget::new(activity))
            }
            WidgetKind::Unsupported => ActivityWidget::Unsupported {
                activity_id: activity.id.clone(),
                tag: activity.kind.as_tag().to_string(),
            },
        }
    }

    #[must_use]
    pub fn activity_id(&self) -> &ActivityId {
        match self {
            ActivityWidget::InfoSlide { activity_id }
            | ActivityWidget::Unsupported { activity_id, .. } => activity_id,
            ActivityWidget::Choice(widget) => widget.activity_id(),
            ActivityWidget::MapClick(widget) => widget.activity_id(),
            ActivityWidget::CardReorder(widget) => widget.activity_id(),
        }
    }

    fn answerable(&self) -> Option<&dyn AnswerWidget> {
        match self {
            ActivityWidget::Choice(widget) => Some(widget),
            ActivityWidget::MapClick(widget) => Some(widget),
            ActivityWidget::CardReorder(widget) => Some(widget),
            ActivityWidget::InfoSlide { .. } | ActivityWidget::Unsupported { .. } => None,
        }
    }

    fn answerable_mut(&mut self) -> Option<&mut dyn AnswerWidget> {
        match self {
            ActivityWidget::Choice(widget) => Some(widget),
            ActivityWidget::MapClick(widget) => Some(widget),
            ActivityWidget::CardReorder(widget) => Some(widget),
            ActivityWidget::InfoSlide { .. } | ActivityWidget::Unsupported { .. } => None,
        }
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.answerable().is_some_and(|widget| widget.has_selection())
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.answerable().is_some_and(|widget| widget.is_submitted())
    }

    pub fn submit(&mut self) -> Option<WidgetSignal> {
        self.answerable_mut().and_then(|widget| widget.submit())
    }

    #[must_use]
    pub fn feedback(&self) -> Option<Feedback> {
        self.answerable().and_then(|widget| widget.feedback())
    }

    /// Message for the skip-only fallback.
    #[must_use]
    pub fn unsupported_message(&self) -> Option<String> {
        match self {
            ActivityWidget::Unsupported { tag, .. } => {
                Some(format!("Activity type '{tag}' not yet supported."))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::model::{ActivityKind, ChoiceOption};

    #[test]
    fn mount_dispatches_on_kind() {
        let mut rng = StdRng::seed_from_u64(7);
        let options = vec![ChoiceOption::new("1", "Tokyo", true)];

        let info = Activity::info("i", "Title", "Body");
        assert!(matches!(
            ActivityWidget::mount(&info, &mut rng, true),
            ActivityWidget::InfoSlide { .. }
        ));

        let map = Activity::question("m", ActivityKind::MapClick, "Where?", options.clone());
        assert!(matches!(
            ActivityWidget::mount(&map, &mut rng, true),
            ActivityWidget::MapClick(_)
        ));

        let cards = Activity::question("f", ActivityKind::Flashcard, "Order", options);
        assert!(matches!(
            ActivityWidget::mount(&cards, &mut rng, true),
            ActivityWidget::CardReorder(_)
        ));
    }

    #[test]
    fn unsupported_widget_names_the_tag() {
        let mut rng = StdRng::seed_from_u64(7);
        let activity = Activity::new("x", ActivityKind::from_tag("puzzle"), "Solve");
        let mut widget = ActivityWidget::mount(&activity, &mut rng, false);
        assert_eq!(
            widget.unsupported_message().as_deref(),
            Some("Activity type 'puzzle' not yet supported.")
        );
        assert_eq!(widget.submit(), None);
        assert!(!widget.has_selection());
    }
}
