use dioxus::prelude::*;
use lesson_core::onboarding::{ONBOARDING_STEPS, OnboardingFlow, OnboardingProgress};
use tracing::warn;

use crate::context::AppContext;

/// First-run tutorial. Shown until finished or skipped once on this device.
#[component]
pub fn OnboardingOverlay() -> Element {
    let ctx = use_context::<AppContext>();
    let onboarding = ctx.onboarding();
    let mut flow = use_signal(OnboardingFlow::new);

    let should_show = {
        let onboarding = onboarding.clone();
        use_resource(move || {
            let onboarding = onboarding.clone();
            async move { onboarding.should_show().await }
        })
    };

    let advance = use_callback(move |progress: OnboardingProgress| {
        if progress == OnboardingProgress::Completed {
            let onboarding = onboarding.clone();
            spawn(async move {
                if let Err(err) = onboarding.mark_done().await {
                    warn!(error = %err, "failed to store onboarding flag");
                }
            });
        }
    });

    let visible = matches!(*should_show.read(), Some(true));
    let current = flow.read().current();
    let (Some(step), true) = (current, visible) else {
        return rsx! {};
    };
    let step_index = flow.read().step_index();
    let next_label = flow.read().next_label();
    let skip_label = flow.read().skip_label();

    rsx! {
        div { class: "onboarding-backdrop", id: "onboarding",
            div { class: "onboarding", role: "dialog", aria_modal: "true",
                div { class: "onboarding-emoji", "{step.emoji}" }
                h2 { "{step.title}" }
                p { "{step.description}" }
                div { class: "onboarding-dots",
                    for index in 0..ONBOARDING_STEPS.len() {
                        span {
                            key: "{index}",
                            class: if index == step_index { "dot dot-active" } else { "dot" },
                        }
                    }
                }
                div { class: "onboarding-actions",
                    button {
                        id: "onboarding-skip",
                        class: "btn link",
                        r#type: "button",
                        onclick: move |_| {
                            let progress = flow.write().skip();
                            advance.call(progress);
                        },
                        "{skip_label}"
                    }
                    button {
                        id: "onboarding-next",
                        class: "btn primary",
                        r#type: "button",
                        onclick: move |_| {
                            let progress = flow.write().next();
                            advance.call(progress);
                        },
                        "{next_label}"
                    }
                }
            }
        }
    }
}
