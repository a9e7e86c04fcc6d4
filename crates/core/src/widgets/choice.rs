use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{Activity, ActivityId, ChoiceOption, OptionId};
use crate::widgets::{AnswerWidget, Feedback, WidgetSignal};

const CORRECT_MESSAGES: [&str; 10] = [
    "Great Job!",
    "Awesome!",
    "You nailed it!",
    "Super smart!",
    "Sugoi! (すごい)",
    "Perfect!",
    "Way to go!",
    "Brilliant!",
    "You're a Japan expert!",
    "Amazing work!",
];

const WRONG_MESSAGES: [&str; 6] = [
    "Not quite right...",
    "Almost!",
    "Good try!",
    "So close!",
    "Let's learn from this!",
    "Keep going!",
];

const EXPLANATION_FALLBACK: &str = "Keep going!";

/// Single-select list for `multiple_choice`, `image_choice` and `scenario`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceWidget {
    activity_id: ActivityId,
    options: Vec<ChoiceOption>,
    selected: Option<OptionId>,
    submitted: bool,
    cheer: usize,
}

/// Keyboard input understood by the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKey {
    Char(char),
    Enter,
}

/// Visual state of one option row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    Idle,
    Selected,
    /// Correct option after submit, chosen or not.
    Correct,
    /// The learner's wrong choice after submit.
    Wrong,
}

impl ChoiceWidget {
    /// Options in authored order.
    #[must_use]
    pub fn new(activity: &Activity) -> Self {
        Self {
            activity_id: activity.id.clone(),
            options: activity.options.clone(),
            selected: None,
            submitted: false,
            cheer: 0,
        }
    }

    /// Options shuffled once for this mount.
    pub fn shuffled<R: Rng + ?Sized>(activity: &Activity, rng: &mut R) -> Self {
        let mut widget = Self::new(activity);
        widget.options.shuffle(rng);
        widget.cheer = rng.random_range(0..CORRECT_MESSAGES.len() * WRONG_MESSAGES.len());
        widget
    }

    /// Options in display order.
    #[must_use]
    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    #[must_use]
    pub fn selected(&self) -> Option<&ChoiceOption> {
        let selected = self.selected.as_ref()?;
        self.options.iter().find(|option| &option.id == selected)
    }

    /// Updates the pending choice. Ignored once submitted or for unknown ids.
    pub fn select(&mut self, id: &OptionId) -> Option<WidgetSignal> {
        if self.submitted || !self.options.iter().any(|option| &option.id == id) {
            return None;
        }
        self.selected = Some(id.clone());
        Some(WidgetSignal::SelectionMade)
    }

    /// Selects by displayed position (0-based).
    pub fn select_index(&mut self, index: usize) -> Option<WidgetSignal> {
        let id = self.options.get(index)?.id.clone();
        self.select(&id)
    }

    /// `1..9` or `a..` select by displayed position; Enter submits.
    pub fn handle_key(&mut self, key: ChoiceKey) -> Option<WidgetSignal> {
        if self.submitted {
            return None;
        }
        match key {
            ChoiceKey::Enter => self.submit(),
            ChoiceKey::Char(c) => {
                let c = c.to_ascii_lowercase();
                let index = match c {
                    '1'..='9' => usize::from(c as u8 - b'1'),
                    'a'..='z' => usize::from(c as u8 - b'a'),
                    _ => return None,
                };
                self.select_index(index)
            }
        }
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.submitted && self.selected.is_some()
    }

    #[must_use]
    pub fn mark(&self, id: &OptionId) -> OptionMark {
        let Some(option) = self.options.iter().find(|option| &option.id == id) else {
            return OptionMark::Idle;
        };
        let is_selected = self.selected.as_ref() == Some(id);
        match (self.submitted, is_selected) {
            (true, _) if option.is_correct => OptionMark::Correct,
            (true, true) => OptionMark::Wrong,
            (false, true) => OptionMark::Selected,
            _ => OptionMark::Idle,
        }
    }

    pub fn correct_options(&self) -> impl Iterator<Item = &ChoiceOption> {
        self.options.iter().filter(|option| option.is_correct)
    }
}

impl AnswerWidget for ChoiceWidget {
    fn activity_id(&self) -> &ActivityId {
        &self.activity_id
    }

    fn has_selection(&self) -> bool {
        self.selected.is_some()
    }

    fn is_submitted(&self) -> bool {
        self.submitted
    }

    fn submit(&mut self) -> Option<WidgetSignal> {
        if !self.can_submit() {
            return None;
        }
        let is_correct = self.selected()?.is_correct;
        self.submitted = true;
        Some(WidgetSignal::Answered { is_correct })
    }

    fn feedback(&self) -> Option<Feedback> {
        if !self.submitted {
            return None;
        }
        let selected = self.selected()?;
        let headline = if selected.is_correct {
            CORRECT_MESSAGES[self.cheer % CORRECT_MESSAGES.len()]
        } else {
            WRONG_MESSAGES[self.cheer % WRONG_MESSAGES.len()]
        };
        let body = selected
            .explanation
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(EXPLANATION_FALLBACK);
        let correct_text = if selected.is_correct {
            None
        } else {
            self.correct_options().next().map(|option| option.text.clone())
        };

        Some(Feedback {
            is_correct: selected.is_correct,
            headline: headline.to_string(),
            body: body.to_string(),
            correct_text,
        })
    }
}
