use lesson_core::model::{Activity, ActivityId, ActivityKind, ChoiceOption};

/// Tags offered by the editor's type picker.
pub const EDITABLE_KINDS: [&str; 6] = [
    "info",
    "multiple_choice",
    "image_choice",
    "scenario",
    "map_click",
    "flashcard",
];

/// Raw editor fields, as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivityForm {
    pub id: String,
    pub kind: String,
    pub question_text: String,
    pub content: String,
    pub media_url: String,
    /// One option per line; a leading `*` marks a correct one and
    /// ` | ` separates the explanation.
    pub options: String,
    pub order_index: String,
    pub difficulty: String,
}

impl ActivityForm {
    #[must_use]
    pub fn blank() -> Self {
        Self {
            kind: "multiple_choice".into(),
            order_index: "0".into(),
            difficulty: "1".into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            id: activity.id.to_string(),
            kind: activity.kind.as_tag().to_string(),
            question_text: activity.question_text.clone(),
            content: activity.content.clone().unwrap_or_default(),
            media_url: activity.media_url.clone().unwrap_or_default(),
            options: format_option_lines(&activity.options),
            order_index: activity.order_index.to_string(),
            difficulty: activity.difficulty.to_string(),
        }
    }

    /// # Errors
    ///
    /// Returns a message for the inline form error when a number field does not parse.
    pub fn to_activity(&self) -> Result<Activity, String> {
        let order_index = parse_field::<i32>(&self.order_index, "Order")?;
        let difficulty = parse_field::<u8>(&self.difficulty, "Difficulty")?;
        if !(1..=3).contains(&difficulty) {
            return Err("Difficulty must be 1, 2 or 3.".to_string());
        }

        let id = match self.id.trim() {
            "" => ActivityId::generate(),
            id => ActivityId::new(id),
        };
        let mut activity = Activity::new(id, ActivityKind::from_tag(self.kind.trim()), self.question_text.trim())
            .with_order_index(order_index);
        activity.difficulty = difficulty;
        activity.content = non_empty(&self.content);
        activity.media_url = non_empty(&self.media_url);
        activity.options = parse_option_lines(&self.options);
        Ok(activity)
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, String> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| format!("{name} must be a number."))
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[must_use]
pub fn parse_option_lines(text: &str) -> Vec<ChoiceOption> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| {
            let (is_correct, line) = match line.strip_prefix('*') {
                Some(rest) => (true, rest.trim_start()),
                None => (false, line),
            };
            let (text, explanation) = match line.split_once(" | ") {
                Some((text, explanation)) => (text.trim(), Some(explanation.trim())),
                None => (line, None),
            };
            let option = ChoiceOption::new((index + 1).to_string(), text, is_correct);
            match explanation.filter(|value| !value.is_empty()) {
                Some(explanation) => option.with_explanation(explanation),
                None => option,
            }
        })
        .collect()
}

#[must_use]
pub fn format_option_lines(options: &[ChoiceOption]) -> String {
    options
        .iter()
        .map(|option| {
            let marker = if option.is_correct { "*" } else { "" };
            match option.explanation.as_deref() {
                Some(explanation) => format!("{marker}{} | {explanation}", option.text),
                None => format!("{marker}{}", option.text),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One row of the activity table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityRowVm {
    pub id: String,
    pub kind: String,
    pub text: String,
    pub order_label: String,
    pub option_count: usize,
    pub issues: Vec<String>,
}

#[must_use]
pub fn map_activity_rows(activities: &[Activity]) -> Vec<ActivityRowVm> {
    activities
        .iter()
        .map(|activity| ActivityRowVm {
            id: activity.id.to_string(),
            kind: activity.kind.as_tag().to_string(),
            text: activity.display_text().to_string(),
            order_label: format!("#{}", activity.order_index),
            option_count: activity.options.len(),
            issues: activity.lint().iter().map(ToString::to_string).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_lines_mark_correct_and_explanations() {
        let options = parse_option_lines("*Tokyo | The capital.\nOsaka\n\n  Kyoto  ");
        assert_eq!(options.len(), 3);
        assert!(options[0].is_correct);
        assert_eq!(options[0].text, "Tokyo");
        assert_eq!(options[0].explanation.as_deref(), Some("The capital."));
        assert_eq!(options[2].id.as_str(), "3");
        assert_eq!(options[2].text, "Kyoto");
        assert!(!options[2].is_correct);

        assert_eq!(format_option_lines(&options), "*Tokyo | The capital.\nOsaka\nKyoto");
    }

    #[test]
    fn form_builds_activity_and_keeps_unknown_tags() {
        let form = ActivityForm {
            id: "a1".into(),
            kind: "puzzle".into(),
            question_text: " Solve it ".into(),
            order_index: "4".into(),
            difficulty: "2".into(),
            ..ActivityForm::default()
        };
        let activity = form.to_activity().unwrap();
        assert_eq!(activity.kind, ActivityKind::Unsupported("puzzle".into()));
        assert_eq!(activity.question_text, "Solve it");
        assert_eq!(activity.order_index, 4);
        assert_eq!(activity.difficulty, 2);
        assert_eq!(activity.content, None);
    }

    #[test]
    fn form_rejects_bad_numbers() {
        let mut form = ActivityForm::blank();
        form.order_index = "first".into();
        assert_eq!(form.to_activity().unwrap_err(), "Order must be a number.");

        let mut form = ActivityForm::blank();
        form.difficulty = "5".into();
        assert!(form.to_activity().is_err());
    }

    #[test]
    fn rows_surface_lint_issues() {
        let activity = Activity::new("q", ActivityKind::MultipleChoice, "Pick");
        let rows = map_activity_rows(&[activity]);
        assert_eq!(rows[0].issues, vec!["answerable activity has no options".to_string()]);
    }
}
