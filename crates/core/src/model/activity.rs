use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::{ActivityId, LessonId, OptionId};

//
// ─── ACTIVITY KIND ─────────────────────────────────────────────────────────────
//

/// Variant tag of an activity.
///
/// The hosted store keeps the tag as free text, so any tag this build does not
/// know is kept verbatim in `Unsupported` instead of failing to load. Every
/// `match` on this type is exhaustive; the player renders `Unsupported` as a
/// skip-only panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityKind {
    Info,
    MultipleChoice,
    ImageChoice,
    MapClick,
    Scenario,
    Flashcard,
    Unsupported(String),
}

/// Which widget renders an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    InfoSlide,
    Choice,
    MapClick,
    CardReorder,
    Unsupported,
}

impl ActivityKind {
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "info" => Self::Info,
            "multiple_choice" => Self::MultipleChoice,
            "image_choice" => Self::ImageChoice,
            "map_click" => Self::MapClick,
            "scenario" => Self::Scenario,
            "flashcard" => Self::Flashcard,
            other => Self::Unsupported(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Info => "info",
            Self::MultipleChoice => "multiple_choice",
            Self::ImageChoice => "image_choice",
            Self::MapClick => "map_click",
            Self::Scenario => "scenario",
            Self::Flashcard => "flashcard",
            Self::Unsupported(tag) => tag.as_str(),
        }
    }

    #[must_use]
    pub fn widget(&self) -> WidgetKind {
        match self {
            Self::Info => WidgetKind::InfoSlide,
            Self::MultipleChoice | Self::ImageChoice | Self::Scenario => WidgetKind::Choice,
            Self::MapClick => WidgetKind::MapClick,
            Self::Flashcard => WidgetKind::CardReorder,
            Self::Unsupported(_) => WidgetKind::Unsupported,
        }
    }

    /// True when the learner must answer before the lesson can move on.
    #[must_use]
    pub fn is_answerable(&self) -> bool {
        match self.widget() {
            WidgetKind::Choice | WidgetKind::MapClick | WidgetKind::CardReorder => true,
            WidgetKind::InfoSlide | WidgetKind::Unsupported => false,
        }
    }

    /// Hint shown by the stuck fallback.
    #[must_use]
    pub fn hint_text(&self) -> &'static str {
        match self.widget() {
            WidgetKind::MapClick => {
                "Hint: Tap the map clue that best matches the place name in the question."
            }
            WidgetKind::CardReorder => {
                "Hint: Move the best answer to the top first, then check your order."
            }
            WidgetKind::Choice => {
                "Hint: Read every choice out loud and cross out one choice that does not fit."
            }
            WidgetKind::InfoSlide | WidgetKind::Unsupported => {
                "Hint: Take a breath, read the prompt again, and try one clear step at a time."
            }
        }
    }
}

impl From<String> for ActivityKind {
    fn from(value: String) -> Self {
        Self::from_tag(&value)
    }
}

impl From<ActivityKind> for String {
    fn from(value: ActivityKind) -> Self {
        match value {
            ActivityKind::Unsupported(tag) => tag,
            known => known.as_tag().to_string(),
        }
    }
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// Pin coordinates for map activities, in percent of the map area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(
        default,
        rename = "mapLabel",
        alias = "map_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub map_label: Option<String>,
}

impl Hotspot {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            label: None,
            map_label: None,
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotspot: Option<Hotspot>,
}

impl ChoiceOption {
    #[must_use]
    pub fn new(id: impl Into<OptionId>, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_correct,
            explanation: None,
            hotspot: None,
        }
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    #[must_use]
    pub fn with_hotspot(mut self, hotspot: Hotspot) -> Self {
        self.hotspot = Some(hotspot);
        self
    }
}

//
// ─── ACTIVITY ──────────────────────────────────────────────────────────────────
//

/// One learning interaction inside a lesson. Immutable once a session loads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<LessonId>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default)]
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, deserialize_with = "options_or_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
}

fn default_difficulty() -> u8 {
    1
}

// `options` is nullable jsonb in the hosted table.
fn options_or_empty<'de, D>(deserializer: D) -> Result<Vec<ChoiceOption>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ChoiceOption>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Activity {
    #[must_use]
    pub fn new(id: impl Into<ActivityId>, kind: ActivityKind, question_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lesson_id: None,
            kind,
            question_text: question_text.into(),
            content: None,
            media_url: None,
            options: Vec::new(),
            order_index: 0,
            difficulty: default_difficulty(),
        }
    }

    /// Info slide with a body text.
    #[must_use]
    pub fn info(id: impl Into<ActivityId>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let mut activity = Self::new(id, ActivityKind::Info, title);
        activity.content = Some(content.into());
        activity
    }

    /// Answerable activity with its options in presentation order.
    #[must_use]
    pub fn question(
        id: impl Into<ActivityId>,
        kind: ActivityKind,
        question_text: impl Into<String>,
        options: Vec<ChoiceOption>,
    ) -> Self {
        let mut activity = Self::new(id, kind, question_text);
        activity.options = options;
        activity
    }

    #[must_use]
    pub fn with_order_index(mut self, order_index: i32) -> Self {
        self.order_index = order_index;
        self
    }

    #[must_use]
    pub fn with_media_url(mut self, media_url: impl Into<String>) -> Self {
        self.media_url = Some(media_url.into());
        self
    }

    #[must_use]
    pub fn with_lesson(mut self, lesson_id: LessonId) -> Self {
        self.lesson_id = Some(lesson_id);
        self
    }

    /// Text for the read-aloud panel: the body if present, else the prompt.
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
            .unwrap_or(self.question_text.as_str())
    }

    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&ChoiceOption> {
        self.options.iter().find(|option| &option.id == id)
    }

    pub fn correct_options(&self) -> impl Iterator<Item = &ChoiceOption> {
        self.options.iter().filter(|option| option.is_correct)
    }

    /// Content problems that would make the activity unplayable or misleading.
    ///
    /// Unsupported kinds are only checked for a prompt; the player skips them anyway.
    #[must_use]
    pub fn lint(&self) -> Vec<ActivityIssue> {
        let mut issues = Vec::new();

        let has_text = match self.kind {
            ActivityKind::Info => !self.display_text().trim().is_empty(),
            _ => !self.question_text.trim().is_empty(),
        };
        if !has_text {
            issues.push(ActivityIssue::EmptyText);
        }

        if let Some(media_url) = self.media_url.as_deref() {
            if !media_url.starts_with('/') && Url::parse(media_url).is_err() {
                issues.push(ActivityIssue::InvalidMediaUrl(media_url.to_string()));
            }
        }

        if !self.kind.is_answerable() {
            return issues;
        }

        if self.options.is_empty() {
            issues.push(ActivityIssue::MissingOptions);
            return issues;
        }

        if self.correct_options().next().is_none() {
            issues.push(ActivityIssue::NoCorrectOption);
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(&option.id) {
                issues.push(ActivityIssue::DuplicateOptionId(option.id.clone()));
            }
            if option.text.trim().is_empty() {
                issues.push(ActivityIssue::EmptyOptionText(option.id.clone()));
            }
            if let Some(hotspot) = option.hotspot.as_ref() {
                let in_range = hotspot.is_finite()
                    && (0.0..=100.0).contains(&hotspot.x)
                    && (0.0..=100.0).contains(&hotspot.y);
                if !in_range {
                    issues.push(ActivityIssue::HotspotOutOfRange(option.id.clone()));
                }
            }
        }

        issues
    }
}

impl Activity {
    /// # Errors
    ///
    /// Returns `ActivityError::Invalid` listing every lint issue.
    pub fn validate(&self) -> Result<(), ActivityError> {
        let issues = self.lint();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ActivityError::Invalid {
                id: self.id.clone(),
                issues,
            })
        }
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActivityIssue {
    #[error("activity has no prompt text")]
    EmptyText,
    #[error("answerable activity has no options")]
    MissingOptions,
    #[error("no option is marked correct")]
    NoCorrectOption,
    #[error("duplicate option id: {0}")]
    DuplicateOptionId(OptionId),
    #[error("option {0} has no text")]
    EmptyOptionText(OptionId),
    #[error("hotspot of option {0} is outside the 0-100 range")]
    HotspotOutOfRange(OptionId),
    #[error("invalid media url: {0}")]
    InvalidMediaUrl(String),
}

/// Raised when an authored activity cannot be saved.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActivityError {
    #[error("activity {id} failed validation: {issues:?}")]
    Invalid {
        id: ActivityId,
        issues: Vec<ActivityIssue>,
    },
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<ChoiceOption> {
        vec![
            ChoiceOption::new("1", "Take off shoes", true).with_explanation("Shoes stay by the door."),
            ChoiceOption::new("2", "Wear shoes inside", false),
        ]
    }

    #[test]
    fn unknown_tag_becomes_unsupported() {
        let kind = ActivityKind::from_tag("drag_and_drop");
        assert_eq!(kind, ActivityKind::Unsupported("drag_and_drop".into()));
        assert_eq!(kind.widget(), WidgetKind::Unsupported);
        assert!(!kind.is_answerable());
        assert_eq!(kind.as_tag(), "drag_and_drop");
    }

    #[test]
    fn choice_family_shares_one_widget() {
        for tag in ["multiple_choice", "image_choice", "scenario"] {
            assert_eq!(ActivityKind::from_tag(tag).widget(), WidgetKind::Choice);
        }
        assert_eq!(ActivityKind::MapClick.widget(), WidgetKind::MapClick);
        assert_eq!(ActivityKind::Flashcard.widget(), WidgetKind::CardReorder);
    }

    #[test]
    fn deserializes_hosted_row() {
        let json = r#"{
            "id": "act-1",
            "lesson_id": "lesson-1",
            "type": "multiple_choice",
            "question_text": "What should Kai do next?",
            "options": [
                {"id": "1", "text": "Take off his shoes", "is_correct": true},
                {"id": "2", "text": "Wear shoes inside", "is_correct": false,
                 "hotspot": {"x": 20, "y": 30, "mapLabel": "Door"}}
            ],
            "order_index": 2,
            "difficulty": 2
        }"#;
        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.kind, ActivityKind::MultipleChoice);
        assert_eq!(activity.options.len(), 2);
        assert_eq!(
            activity.options[1].hotspot.as_ref().and_then(|h| h.map_label.as_deref()),
            Some("Door")
        );
        assert_eq!(activity.order_index, 2);
        assert!(activity.lint().is_empty());
    }

    #[test]
    fn null_options_and_unknown_type_still_load() {
        let json = r#"{"id": "act-9", "type": "video", "question_text": "Watch", "options": null}"#;
        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.kind, ActivityKind::Unsupported("video".into()));
        assert!(activity.options.is_empty());
        assert_eq!(activity.difficulty, 1);
    }

    #[test]
    fn kind_serializes_back_to_tag() {
        let activity = Activity::question("a", ActivityKind::Flashcard, "Order these", options());
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["type"], "flashcard");
    }

    #[test]
    fn display_text_prefers_content() {
        let slide = Activity::info("i1", "Shoes", "Take them off at the door.");
        assert_eq!(slide.display_text(), "Take them off at the door.");
        let bare = Activity::new("i2", ActivityKind::Info, "Title only");
        assert_eq!(bare.display_text(), "Title only");
    }

    #[test]
    fn lint_flags_missing_correct_answer_and_duplicates() {
        let activity = Activity::question(
            "a",
            ActivityKind::MultipleChoice,
            "Pick",
            vec![
                ChoiceOption::new("1", "One", false),
                ChoiceOption::new("1", "Two", false),
            ],
        );
        let issues = activity.lint();
        assert!(issues.contains(&ActivityIssue::NoCorrectOption));
        assert!(issues.contains(&ActivityIssue::DuplicateOptionId(OptionId::new("1"))));
    }

    #[test]
    fn lint_flags_bad_hotspot_and_media() {
        let activity = Activity::question(
            "m",
            ActivityKind::MapClick,
            "Where is Tokyo?",
            vec![ChoiceOption::new("1", "Tokyo", true).with_hotspot(Hotspot::new(140.0, 20.0))],
        )
        .with_media_url("not a url");
        let issues = activity.lint();
        assert!(issues.contains(&ActivityIssue::HotspotOutOfRange(OptionId::new("1"))));
        assert!(issues.contains(&ActivityIssue::InvalidMediaUrl("not a url".into())));
    }

    #[test]
    fn lint_skips_option_checks_for_info() {
        let slide = Activity::info("i", "Title", "Body");
        assert!(slide.lint().is_empty());
        let answerable = Activity::new("q", ActivityKind::Scenario, "Pick one");
        assert_eq!(answerable.lint(), vec![ActivityIssue::MissingOptions]);
    }
}
