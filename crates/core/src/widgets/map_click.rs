use crate::model::{Activity, ActivityId, ChoiceOption, OptionId};
use crate::widgets::{AnswerWidget, Feedback, WidgetSignal};

/// Fallback pin spots (top %, left %) for options without a hotspot.
const PIN_PRESETS: [(f64, f64); 6] = [
    (20.0, 22.0),
    (35.0, 64.0),
    (60.0, 40.0),
    (72.0, 75.0),
    (50.0, 18.0),
    (26.0, 82.0),
];

const X_RANGE: (f64, f64) = (5.0, 95.0);
const Y_RANGE: (f64, f64) = (8.0, 92.0);

/// Pin offset inside the map area, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinPosition {
    pub top: f64,
    pub left: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub option_id: OptionId,
    pub label: String,
    pub position: PinPosition,
}

/// Pin map: select a pin, then submit it.
#[derive(Debug, Clone, PartialEq)]
pub struct MapClickWidget {
    activity_id: ActivityId,
    options: Vec<ChoiceOption>,
    selected: Option<OptionId>,
    submitted: bool,
}

impl MapClickWidget {
    #[must_use]
    pub fn new(activity: &Activity) -> Self {
        Self {
            activity_id: activity.id.clone(),
            options: activity.options.clone(),
            selected: None,
            submitted: false,
        }
    }

    #[must_use]
    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    #[must_use]
    pub fn pins(&self) -> Vec<Pin> {
        self.options
            .iter()
            .enumerate()
            .map(|(index, option)| Pin {
                option_id: option.id.clone(),
                label: pin_label(option, index),
                position: pin_position(option, index),
            })
            .collect()
    }

    #[must_use]
    pub fn selected(&self) -> Option<&ChoiceOption> {
        let selected = self.selected.as_ref()?;
        self.options.iter().find(|option| &option.id == selected)
    }

    #[must_use]
    pub fn is_selected(&self, id: &OptionId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    /// Records a pending pin. Pins are disabled once submitted.
    pub fn select(&mut self, id: &OptionId) -> Option<WidgetSignal> {
        if self.submitted || !self.options.iter().any(|option| &option.id == id) {
            return None;
        }
        self.selected = Some(id.clone());
        Some(WidgetSignal::SelectionMade)
    }
}

impl AnswerWidget for MapClickWidget {
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
        if self.submitted {
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
            "✨ Correct!"
        } else {
            "🔍 Not quite..."
        };
        Some(Feedback {
            is_correct: selected.is_correct,
            headline: headline.to_string(),
            body: selected.explanation.clone().unwrap_or_default(),
            correct_text: None,
        })
    }
}

fn pin_label(option: &ChoiceOption, index: usize) -> String {
    option
        .hotspot
        .as_ref()
        .and_then(|hotspot| {
            hotspot
                .map_label
                .as_deref()
                .filter(|label| !label.is_empty())
                .or_else(|| hotspot.label.as_deref().filter(|label| !label.is_empty()))
        })
        .map_or_else(|| (index + 1).to_string(), str::to_string)
}

fn pin_position(option: &ChoiceOption, index: usize) -> PinPosition {
    match option.hotspot.as_ref().filter(|hotspot| hotspot.is_finite()) {
        Some(hotspot) => PinPosition {
            top: hotspot.y.clamp(Y_RANGE.0, Y_RANGE.1),
            left: hotspot.x.clamp(X_RANGE.0, X_RANGE.1),
        },
        None => {
            let (top, left) = PIN_PRESETS[index % PIN_PRESETS.len()];
            PinPosition { top, left }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityKind, Hotspot};

    fn activity() -> Activity {
        let mut osaka = Hotspot::new(2.0, 99.0);
        osaka.label = Some("Osaka".into());
        let mut kyoto = Hotspot::new(50.0, 40.0);
        kyoto.map_label = Some("Old capital".into());
        kyoto.label = Some("Kyoto".into());

        Activity::question(
            "map-1",
            ActivityKind::MapClick,
            "Which pin is Kyoto?",
            vec![
                ChoiceOption::new("1", "Osaka", false).with_hotspot(osaka),
                ChoiceOption::new("2", "Kyoto", true)
                    .with_hotspot(kyoto)
                    .with_explanation("Kyoto was the capital for a thousand years."),
                ChoiceOption::new("3", "Sapporo", false),
            ],
        )
    }

    #[test]
    fn last_pin_before_submit_wins() {
        let mut widget = MapClickWidget::new(&activity());
        widget.select(&OptionId::new("2"));
        widget.select(&OptionId::new("1"));
        assert_eq!(widget.submit(), Some(WidgetSignal::Answered { is_correct: false }));

        let mut widget = MapClickWidget::new(&activity());
        widget.select(&OptionId::new("1"));
        widget.select(&OptionId::new("2"));
        assert_eq!(widget.submit(), Some(WidgetSignal::Answered { is_correct: true }));
    }

    #[test]
    fn submit_without_pin_does_nothing() {
        let mut widget = MapClickWidget::new(&activity());
        assert_eq!(widget.submit(), None);
        assert!(!widget.is_submitted());
    }

    #[test]
    fn pins_are_disabled_after_submit() {
        let mut widget = MapClickWidget::new(&activity());
        widget.select(&OptionId::new("2"));
        widget.submit();
        assert_eq!(widget.select(&OptionId::new("1")), None);
        assert!(widget.is_selected(&OptionId::new("2")));
        assert_eq!(widget.submit(), None);
    }

    #[test]
    fn pins_clamp_hotspots_and_fall_back_to_presets() {
        let pins = MapClickWidget::new(&activity()).pins();
        assert_eq!(pins[0].position, PinPosition { top: 92.0, left: 5.0 });
        assert_eq!(pins[1].position, PinPosition { top: 40.0, left: 50.0 });
        assert_eq!(pins[2].position, PinPosition { top: 60.0, left: 40.0 });
    }

    #[test]
    fn pin_labels_prefer_map_label() {
        let labels: Vec<String> = MapClickWidget::new(&activity())
            .pins()
            .into_iter()
            .map(|pin| pin.label)
            .collect();
        assert_eq!(labels, vec!["Osaka", "Old capital", "3"]);
    }

    #[test]
    fn feedback_uses_selected_explanation() {
        let mut widget = MapClickWidget::new(&activity());
        widget.select(&OptionId::new("2"));
        widget.submit();
        let feedback = widget.feedback().unwrap();
        assert!(feedback.is_correct);
        assert_eq!(feedback.body, "Kyoto was the capital for a thousand years.");
    }
}
