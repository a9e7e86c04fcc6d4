use dioxus::document::eval;
use dioxus::prelude::*;

use crate::context::AppContext;
use crate::speech::end_waiter_script;

/// Read-aloud toggle. Pressing it again while its text plays stops it.
#[component]
pub fn SpeakButton(text: String) -> Element {
    let ctx = use_context::<AppContext>();
    let speech = ctx.speech();
    let mut speaking = use_signal(|| false);

    let label = if speaking() { "Stop reading" } else { "Read aloud" };

    rsx! {
        button {
            class: if speaking() { "speak-button speaking" } else { "speak-button" },
            r#type: "button",
            title: label,
            aria_label: label,
            onclick: move |_| match speech.toggle(&text) {
                Some(id) => {
                    speaking.set(true);
                    let speech = speech.clone();
                    spawn(async move {
                        let mut waiter = eval(&end_waiter_script(id));
                        let _ = waiter.recv::<u64>().await;
                        speech.finished(id);
                        speaking.set(false);
                    });
                }
                None => speaking.set(false),
            },
            if speaking() { "⏹" } else { "🔊" }
        }
    }
}
