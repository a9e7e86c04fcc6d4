use dioxus::prelude::*;
use services::CompletionSummary;

use crate::vm::{completion_vm, practice_completion_vm};

#[component]
pub(super) fn CompletionScreen(
    summary: CompletionSummary,
    on_retry: EventHandler<()>,
    on_exit: EventHandler<()>,
    #[props(default)]
    practice: bool,
) -> Element {
    let vm = if practice {
        practice_completion_vm(&summary)
    } else {
        completion_vm(&summary)
    };

    rsx! {
        section { class: "completion", id: "lesson-complete",
            if vm.leveled_up {
                div { class: "level-up", role: "status",
                    h2 { "LEVEL UP!" }
                    p { "{vm.level_label}" }
                }
            }
            div { class: "stars", aria_label: "{summary.stars} stars", "{vm.stars}" }
            h1 { "{vm.headline}" }
            p { class: "completion-quote", "{vm.quote}" }
            div { class: "completion-stats",
                div { class: "stat",
                    span { class: "stat-value", "{vm.correct_label}" }
                    span { class: "stat-label", "Correct" }
                }
                div { class: "stat",
                    span { class: "stat-value", "{vm.xp_label}" }
                    span { class: "stat-label", "XP Earned" }
                }
            }
            p { class: "completion-score", "{vm.score_label}" }
            div { class: "level-progress",
                div { class: "level-progress-labels",
                    span { "{vm.level_label}" }
                    span { "{vm.level_xp_label}" }
                }
                div { class: "bar",
                    div { class: "bar-fill", style: "{vm.level_style}" }
                }
                p { class: "level-next", "{vm.next_level_label}" }
            }
            if let Some(note) = vm.sync_note {
                p { class: "sync-note", "{note}" }
            }
            div { class: "completion-actions",
                button {
                    id: "lesson-retry",
                    class: "btn secondary",
                    r#type: "button",
                    onclick: move |_| on_retry.call(()),
                    "Try Again 🔄"
                }
                button {
                    id: "lesson-exit",
                    class: "btn primary",
                    r#type: "button",
                    onclick: move |_| on_exit.call(()),
                    "Return to Base 🚀"
                }
            }
        }
    }
}
