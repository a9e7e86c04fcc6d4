//! Read-aloud mailbox.
//!
//! At most one utterance is in flight. A new request cancels the current one
//! before it is handed to the backend; completion events from stale utterances
//! are ignored.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const DEFAULT_LANG: &str = "en-US";
pub const DEFAULT_RATE: f32 = 0.9;
pub const DEFAULT_PITCH: f32 = 1.1;

/// Identifies one utterance handed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceId(u64);

impl UtteranceId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utterance-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
}

/// Platform speech engine.
pub trait SpeechBackend: Send + Sync {
    fn speak(&self, utterance: &Utterance);

    fn cancel(&self);
}

/// Single-slot mailbox in front of a [`SpeechBackend`].
#[derive(Clone)]
pub struct SpeechQueue {
    backend: Arc<dyn SpeechBackend>,
    current: Arc<Mutex<Option<Utterance>>>,
    next_id: Arc<AtomicU64>,
    lang: String,
}

impl fmt::Debug for SpeechQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechQueue")
            .field("current", &self.current_text())
            .field("lang", &self.lang)
            .finish_non_exhaustive()
    }
}

impl SpeechQueue {
    #[must_use]
    pub fn new(backend: Arc<dyn SpeechBackend>) -> Self {
        Self {
            backend,
            current: Arc::new(Mutex::new(None)),
            next_id: Arc::new(AtomicU64::new(1)),
            lang: DEFAULT_LANG.to_string(),
        }
    }

    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    // A poisoned slot only ever holds plain data, so keep using it.
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Utterance>> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Cancels whatever is playing and speaks `text`.
    pub fn speak(&self, text: &str) -> UtteranceId {
        let utterance = Utterance {
            id: UtteranceId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            text: text.to_string(),
            lang: self.lang.clone(),
            rate: DEFAULT_RATE,
            pitch: DEFAULT_PITCH,
        };
        let id = utterance.id;

        let mut slot = self.slot();
        self.backend.cancel();
        self.backend.speak(&utterance);
        *slot = Some(utterance);
        id
    }

    /// Speak button: stops when `text` is already playing, else speaks it.
    pub fn toggle(&self, text: &str) -> Option<UtteranceId> {
        if self.is_speaking(text) {
            self.stop();
            return None;
        }
        Some(self.speak(text))
    }

    pub fn stop(&self) {
        let mut slot = self.slot();
        if slot.take().is_some() {
            self.backend.cancel();
        }
    }

    /// Backend end/error event. Clears the slot only for the current utterance.
    pub fn finished(&self, id: UtteranceId) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|utterance| utterance.id == id) {
            *slot = None;
        }
    }

    #[must_use]
    pub fn is_speaking(&self, text: &str) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|utterance| utterance.text == text)
    }

    #[must_use]
    pub fn current_text(&self) -> Option<String> {
        self.slot().as_ref().map(|utterance| utterance.text.clone())
    }
}

/// Backend that records calls; used by tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingSpeech {
    events: Mutex<Vec<SpeechEvent>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    Spoke(Utterance),
    Cancelled,
}

impl RecordingSpeech {
    #[must_use]
    pub fn events(&self) -> Vec<SpeechEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn push(&self, event: SpeechEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl SpeechBackend for RecordingSpeech {
    fn speak(&self, utterance: &Utterance) {
        self.push(SpeechEvent::Spoke(utterance.clone()));
    }

    fn cancel(&self) {
        self.push(SpeechEvent::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> (SpeechQueue, Arc<RecordingSpeech>) {
        let backend = Arc::new(RecordingSpeech::default());
        (SpeechQueue::new(backend.clone()), backend)
    }

    fn spoken(events: &[SpeechEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|event| match event {
                SpeechEvent::Spoke(utterance) => Some(utterance.text.as_str()),
                SpeechEvent::Cancelled => None,
            })
            .collect()
    }

    #[test]
    fn new_utterance_cancels_previous() {
        let (queue, backend) = queue();
        queue.speak("Konnichiwa");
        queue.speak("Arigato");

        let events = backend.events();
        assert_eq!(events.iter().filter(|e| **e == SpeechEvent::Cancelled).count(), 2);
        assert_eq!(spoken(&events), vec!["Konnichiwa", "Arigato"]);
        assert_eq!(queue.current_text().as_deref(), Some("Arigato"));
    }

    #[test]
    fn utterance_uses_defaults() {
        let (queue, backend) = queue();
        queue.speak("Hello");
        let Some(SpeechEvent::Spoke(utterance)) = backend.events().pop() else {
            panic!("expected an utterance");
        };
        assert_eq!(utterance.lang, "en-US");
        assert!((utterance.rate - 0.9).abs() < f32::EPSILON);
        assert!((utterance.pitch - 1.1).abs() < f32::EPSILON);
    }

    #[test]
    fn toggle_stops_same_text() {
        let (queue, _) = queue();
        assert!(queue.toggle("Ramen").is_some());
        assert!(queue.is_speaking("Ramen"));
        assert!(queue.toggle("Ramen").is_none());
        assert_eq!(queue.current_text(), None);
    }

    #[test]
    fn stale_finish_is_ignored() {
        let (queue, _) = queue();
        let first = queue.speak("one");
        let second = queue.speak("two");
        queue.finished(first);
        assert!(queue.is_speaking("two"));
        queue.finished(second);
        assert_eq!(queue.current_text(), None);
    }
}
