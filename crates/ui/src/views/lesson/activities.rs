use dioxus::prelude::*;
use lesson_core::model::Activity;
use lesson_core::widgets::{
    AnswerWidget, CardReorderWidget, ChoiceWidget, Feedback, MapClickWidget, MoveDirection,
};

use crate::views::speak::SpeakButton;
use crate::vm::{PlayerIntent, markdown_to_html, option_class, option_shortcut, pin_style, speech_text};

#[component]
pub(super) fn InfoSlidePanel(activity: Activity) -> Element {
    let body_html = activity.content.as_deref().map(markdown_to_html);
    let read_aloud = speech_text(&activity.question_text, activity.content.as_deref());

    rsx! {
        section { class: "activity activity-info",
            div { class: "activity-heading",
                h2 { "{activity.question_text}" }
                SpeakButton { text: read_aloud }
            }
            if let Some(url) = activity.media_url.clone() {
                img { class: "activity-media", src: "{url}", alt: "" }
            }
            if let Some(html) = body_html {
                div { class: "info-body", dangerous_inner_html: "{html}" }
            }
        }
    }
}

#[component]
pub(super) fn ChoicePanel(
    activity: Activity,
    widget: ChoiceWidget,
    dispatch: Callback<PlayerIntent>,
) -> Element {
    let locked = widget.is_submitted();
    let rows: Vec<_> = widget
        .options()
        .iter()
        .enumerate()
        .map(|(index, option)| {
            (
                index,
                option.id.to_string(),
                option.id.clone(),
                option.text.clone(),
                option_class(widget.mark(&option.id)),
            )
        })
        .collect();

    rsx! {
        section { class: "activity activity-choice",
            div { class: "activity-heading",
                h2 { "{activity.question_text}" }
                SpeakButton { text: activity.question_text.clone() }
            }
            if let Some(url) = activity.media_url.clone() {
                img { class: "activity-media", src: "{url}", alt: "" }
            }
            ul { class: "options", role: "listbox",
                for (index, key, option_id, text, class) in rows {
                    li { key: "{key}",
                        button {
                            id: "option-{index}",
                            class,
                            r#type: "button",
                            disabled: locked,
                            onclick: move |_| dispatch.call(PlayerIntent::Select(option_id.clone())),
                            if let Some(shortcut) = option_shortcut(index) {
                                span { class: "option-shortcut", "{shortcut}" }
                            }
                            span { class: "option-text", "{text}" }
                        }
                    }
                }
            }
        }
    }
}

#[component]
pub(super) fn MapPanel(
    activity: Activity,
    widget: MapClickWidget,
    dispatch: Callback<PlayerIntent>,
) -> Element {
    let locked = widget.is_submitted();
    let pins: Vec<_> = widget
        .pins()
        .into_iter()
        .map(|pin| {
            let class = if widget.is_selected(&pin.option_id) { "pin pin-selected" } else { "pin" };
            (pin.option_id.to_string(), pin.option_id, pin.label, pin_style(pin.position), class)
        })
        .collect();

    rsx! {
        section { class: "activity activity-map",
            div { class: "activity-heading",
                h2 { "{activity.question_text}" }
                SpeakButton { text: activity.question_text.clone() }
            }
            div { class: "map-area",
                if let Some(url) = activity.media_url.clone() {
                    img { class: "map-image", src: "{url}", alt: "" }
                }
                for (key, option_id, label, style, class) in pins {
                    button {
                        key: "{key}",
                        class,
                        r#type: "button",
                        style,
                        disabled: locked,
                        onclick: move |_| dispatch.call(PlayerIntent::Select(option_id.clone())),
                        "{label}"
                    }
                }
            }
            if let Some(selected) = widget.selected() {
                p { class: "map-selection", "Selected: {selected.text}" }
            }
        }
    }
}

#[component]
pub(super) fn CardStackPanel(
    activity: Activity,
    widget: CardReorderWidget,
    dispatch: Callback<PlayerIntent>,
) -> Element {
    let locked = widget.is_submitted();
    let last = widget.cards().len().saturating_sub(1);

    rsx! {
        section { class: "activity activity-cards",
            div { class: "activity-heading",
                h2 { "{activity.question_text}" }
                SpeakButton { text: activity.question_text.clone() }
            }
            p { class: "activity-help", "Put the best answer on top, then check it." }
            ol { class: "card-stack",
                for (index, card) in widget.cards().iter().cloned().enumerate() {
                    li {
                        key: "{card.id}",
                        class: if index == 0 { "card card-top" } else { "card" },
                        draggable: !locked,
                        tabindex: "0",
                        ondragstart: move |_| dispatch.call(PlayerIntent::BeginDrag(index)),
                        ondragover: move |evt: DragEvent| evt.prevent_default(),
                        ondrop: move |evt: DragEvent| {
                            evt.prevent_default();
                            dispatch.call(PlayerIntent::DropCard(index));
                        },
                        onkeydown: move |evt: KeyboardEvent| {
                            let direction = match evt.data.key() {
                                Key::ArrowUp => MoveDirection::Up,
                                Key::ArrowDown => MoveDirection::Down,
                                _ => return,
                            };
                            evt.prevent_default();
                            evt.stop_propagation();
                            dispatch.call(PlayerIntent::MoveCard { index, direction });
                        },
                        span { class: "card-text", "{card.text}" }
                        if !locked {
                            span { class: "card-moves",
                                button {
                                    r#type: "button",
                                    aria_label: "Move up",
                                    disabled: index == 0,
                                    onclick: move |_| dispatch.call(PlayerIntent::MoveCard { index, direction: MoveDirection::Up }),
                                    "↑"
                                }
                                button {
                                    r#type: "button",
                                    aria_label: "Move down",
                                    disabled: index == last,
                                    onclick: move |_| dispatch.call(PlayerIntent::MoveCard { index, direction: MoveDirection::Down }),
                                    "↓"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[component]
pub(super) fn UnsupportedPanel(message: String, dispatch: Callback<PlayerIntent>) -> Element {
    rsx! {
        section { class: "activity activity-unsupported",
            p { "{message}" }
            button {
                id: "lesson-skip",
                class: "btn secondary",
                r#type: "button",
                onclick: move |_| dispatch.call(PlayerIntent::Skip),
                "Skip"
            }
        }
    }
}

#[component]
pub(super) fn FeedbackBanner(feedback: Feedback) -> Element {
    rsx! {
        div {
            class: if feedback.is_correct { "feedback feedback-correct" } else { "feedback feedback-wrong" },
            role: "status",
            strong { "{feedback.headline}" }
            p { "{feedback.body}" }
            if let Some(correct) = feedback.correct_text.clone() {
                p { class: "feedback-answer", "Correct answer: {correct}" }
            }
        }
    }
}
