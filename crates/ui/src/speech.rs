//! Webview speech engine behind the read-aloud mailbox.

use dioxus::document::eval;
use lesson_core::speech::{SpeechBackend, Utterance, UtteranceId};

/// Drives `window.speechSynthesis` through script evaluation.
///
/// Must be called from inside the Dioxus runtime (event handlers, effects).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSpeech;

impl SpeechBackend for WebSpeech {
    fn speak(&self, utterance: &Utterance) {
        let _ = eval(&speak_script(utterance));
    }

    fn cancel(&self) {
        let _ = eval(CANCEL_SCRIPT);
    }
}

const CANCEL_SCRIPT: &str = "window.speechSynthesis && window.speechSynthesis.cancel();";

pub(crate) fn speak_script(utterance: &Utterance) -> String {
    // serde_json gives a quoted, escaped JS string literal.
    let text = serde_json::to_string(&utterance.text).unwrap_or_else(|_| "\"\"".to_string());
    let lang = serde_json::to_string(&utterance.lang).unwrap_or_else(|_| "\"en-US\"".to_string());
    format!(
        r#"(function() {{
            if (!window.speechSynthesis) return;
            const utter = new SpeechSynthesisUtterance({text});
            utter.lang = {lang};
            utter.rate = {rate};
            utter.pitch = {pitch};
            const id = {id};
            const done = () => window.dispatchEvent(new CustomEvent("triplearn-speech-end", {{ detail: id }}));
            utter.onend = done;
            utter.onerror = done;
            window.speechSynthesis.speak(utter);
        }})();"#,
        rate = utterance.rate,
        pitch = utterance.pitch,
        id = utterance.id.get(),
    )
}

/// Resolves with the utterance id once the webview reports it finished.
pub(crate) fn end_waiter_script(id: UtteranceId) -> String {
    format!(
        r#"(function() {{
            const id = {id};
            const onEnd = (event) => {{
                if (event.detail !== id) return;
                window.removeEventListener("triplearn-speech-end", onEnd);
                dioxus.send(id);
            }};
            window.addEventListener("triplearn-speech-end", onEnd);
        }})();"#,
        id = id.get(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lesson_core::speech::{RecordingSpeech, SpeechEvent, SpeechQueue};

    use super::*;

    #[test]
    fn speak_script_escapes_text() {
        let backend = Arc::new(RecordingSpeech::default());
        let queue = SpeechQueue::new(backend.clone());
        queue.speak("Say \"konnichiwa\"");

        let Some(SpeechEvent::Spoke(utterance)) = backend.events().into_iter().last() else {
            panic!("expected an utterance");
        };
        let script = speak_script(&utterance);
        assert!(script.contains(r#"new SpeechSynthesisUtterance("Say \"konnichiwa\"")"#));
        assert!(script.contains(r#"utter.lang = "en-US""#));
        assert!(script.contains("utter.rate = 0.9"));
    }

    #[test]
    fn end_waiter_filters_by_id() {
        let backend = Arc::new(RecordingSpeech::default());
        let queue = SpeechQueue::new(backend);
        let id = queue.speak("Hello");
        assert!(end_waiter_script(id).contains(&format!("const id = {};", id.get())));
    }
}
