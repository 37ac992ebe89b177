//! Persistent emotion channels.
//!
//! The dialogue collaborator tags each reply with an emotion identifier
//! (`"smile"`, `"angry"`, `"neutral"`, …).  Unlike visemes, an emotion
//! channel persists until explicitly replaced — it is independent of the
//! fragment timeline and of scheduling generations, so stopping or
//! superseding an utterance leaves the face's emotion intact.
//!
//! `"neutral"` (the dialogue service's fallback value) clears the active
//! emotion without activating any channel; the avatar assets carry no
//! "neutral" morph target.

use crate::sink::WeightSink;

/// The emotion identifier that means "no emotion channel active".
pub const EMOTION_NEUTRAL: &str = "neutral";

// ---------------------------------------------------------------------------
// EmotionState
// ---------------------------------------------------------------------------

/// Tracks which emotion channel is currently active so it can be retracted
/// when the next one arrives.
#[derive(Debug, Default)]
pub struct EmotionState {
    current: Option<String>,
}

impl EmotionState {
    /// Create with no emotion active.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently active emotion channel, if any.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Activate `emotion`: weight 1 on its channel, weight 0 on the
    /// previously active one.  `"neutral"` or an empty string clears the
    /// active emotion without writing a new channel.  Reapplying the active
    /// emotion is a no-op.
    pub fn apply(&mut self, sink: &WeightSink, emotion: &str) {
        let emotion = emotion.trim();
        let next = if emotion.is_empty() || emotion == EMOTION_NEUTRAL {
            None
        } else {
            Some(emotion)
        };

        if self.current.as_deref() == next {
            return;
        }

        if let Some(previous) = self.current.take() {
            sink.set_weight(&previous, 0.0);
        }
        if let Some(name) = next {
            sink.set_weight(name, 1.0);
            log::debug!("emotion: {name} active");
            self.current = Some(name.to_owned());
        } else {
            log::debug!("emotion: cleared to neutral");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
