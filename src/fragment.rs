//! Timed speech fragments and the TTS timing-track wire format.
//!
//! A [`Fragment`] is one timed unit of speech — a phoneme or word token with
//! start/end offsets in seconds, relative to the start of the *utterance*
//! (not wall-clock time).  The TTS collaborator delivers them as a JSON
//! array alongside the synthesized audio:
//!
//! ```json
//! [
//!   { "phoneme": "M",  "start": 0.0, "end": 0.2 },
//!   { "phoneme": "AA", "start": 0.2, "end": 0.5 }
//! ]
//! ```
//!
//! When the aligner falls back to word-level granularity the `phoneme` field
//! carries a whole word; the mapper's heuristic fallback handles both.
//! Fragment order within a track is **not** guaranteed — the scheduler sorts
//! and merges intervals itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// FragmentError
// ---------------------------------------------------------------------------

/// Validation failures for a single fragment.
///
/// These are never fatal to a schedule: the scheduler logs a warning and
/// skips the offending fragment, leaving the rest of the utterance intact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FragmentError {
    /// `start_secs` is negative.
    #[error("fragment start is negative: {0}")]
    NegativeStart(f32),

    /// `end_secs <= start_secs` — the fragment has no positive duration.
    #[error("fragment has non-positive duration: start={start}, end={end}")]
    NonPositiveDuration { start: f32, end: f32 },

    /// A timestamp is NaN or infinite.
    #[error("fragment has a non-finite timestamp")]
    NonFinite,
}

// ---------------------------------------------------------------------------
// TimingTrackError
// ---------------------------------------------------------------------------

/// Failure to parse a timing track received from the TTS collaborator.
#[derive(Debug, Error)]
pub enum TimingTrackError {
    /// The payload is not valid JSON or not an array of fragments.
    #[error("malformed timing track: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Fragment
// ---------------------------------------------------------------------------

/// One timed unit of speech within an utterance.
///
/// Invariant (checked by [`validate`](Self::validate), not by construction):
/// `0 <= start_secs < end_secs`, both finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Phoneme code (e.g. `"AA"`, `"M"`) or a whole word when the aligner
    /// only produced word-level timings.  May be empty.
    #[serde(alias = "phoneme", alias = "word")]
    pub token: String,

    /// Offset of the fragment's onset from utterance start, in seconds.
    #[serde(rename = "start", alias = "startSec")]
    pub start_secs: f32,

    /// Offset of the fragment's end from utterance start, in seconds.
    #[serde(rename = "end", alias = "endSec")]
    pub end_secs: f32,
}

impl Fragment {
    /// Convenience constructor, mostly for tests and fixtures.
    pub fn new(token: impl Into<String>, start_secs: f32, end_secs: f32) -> Self {
        Self {
            token: token.into(),
            start_secs,
            end_secs,
        }
    }

    /// Check the timing invariant `0 <= start_secs < end_secs`.
    ///
    /// An empty token is *not* an error — the mapper resolves it to the
    /// default channel.
    pub fn validate(&self) -> Result<(), FragmentError> {
        if !self.start_secs.is_finite() || !self.end_secs.is_finite() {
            return Err(FragmentError::NonFinite);
        }
        if self.start_secs < 0.0 {
            return Err(FragmentError::NegativeStart(self.start_secs));
        }
        if self.end_secs <= self.start_secs {
            return Err(FragmentError::NonPositiveDuration {
                start: self.start_secs,
                end: self.end_secs,
            });
        }
        Ok(())
    }

    /// Duration in seconds.  Negative for malformed fragments.
    pub fn duration_secs(&self) -> f32 {
        self.end_secs - self.start_secs
    }
}

// ---------------------------------------------------------------------------
// parse_timing_track
// ---------------------------------------------------------------------------

/// Parse a JSON timing track as emitted by the TTS collaborator.
///
/// Accepts both the wire field names (`phoneme`/`word`, `start`, `end`) and
/// the canonical ones (`token`, `startSec`, `endSec`).  Malformed *individual*
/// fragments (bad timings) are still returned here — validation happens at
/// scheduling time so the caller keeps the full picture for logging.
///
/// # Errors
///
/// Returns [`TimingTrackError::Malformed`] when the payload is not a JSON
/// array of fragment objects.
pub fn parse_timing_track(json: &str) -> Result<Vec<Fragment>, TimingTrackError> {
    let fragments: Vec<Fragment> = serde_json::from_str(json)?;
    Ok(fragments)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
