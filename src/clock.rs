//! Playback clock abstraction.
//!
//! The audio element owned by the playback collaborator is the one external
//! driver of real time in this crate.  [`PlaybackClock`] is the read-only
//! view of it that the scheduler needs: the current playback position and
//! whether playback is running.  The scheduler only ever *reads* the clock —
//! it never blocks on it and never mutates it.
//!
//! The host integration implements this trait over whatever audio backend it
//! uses (an HTML audio element, a streaming decoder, …).  `MockClock`
//! (test-only) is a scriptable implementation driven by tokio's virtual
//! time, so `start_paused` tests control it deterministically.

// ---------------------------------------------------------------------------
// PlaybackClock trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe view of an audio playback clock.
///
/// # Contract
///
/// - `position_secs` is the playback position in seconds from the start of
///   the current utterance's audio.  It must be monotonic while playing and
///   frozen while paused; a seek may move it in either direction.
/// - `is_playing` reflects whether the position is currently advancing.
/// - Both calls are cheap and non-blocking; the scheduler polls them.
pub trait PlaybackClock: Send + Sync {
    /// Current playback position in seconds.
    fn position_secs(&self) -> f32;

    /// Whether the position is currently advancing.
    fn is_playing(&self) -> bool;
}

// Compile-time assertion: Box<dyn PlaybackClock> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn PlaybackClock>) {}
};

// ---------------------------------------------------------------------------
// MockClock  (test-only)
// ---------------------------------------------------------------------------

/// A scriptable clock for scheduler and session tests.
///
/// Position is derived from [`tokio::time::Instant`], so under a paused
/// runtime (`#[tokio::test(start_paused = true)]`) the clock advances in
/// lock-step with virtual time while "playing" and freezes while "paused" —
/// exactly like a real audio element, but deterministic.
#[cfg(test)]
pub struct MockClock {
    inner: std::sync::Mutex<MockClockInner>,
}

#[cfg(test)]
struct MockClockInner {
    /// Position accumulated up to the last play/pause/seek transition.
    base_secs: f32,
    /// When playback last started; `None` while paused.
    playing_since: Option<tokio::time::Instant>,
}

#[cfg(test)]
impl MockClock {
    /// Create a clock paused at position 0.
    pub fn new() -> Self {
        Self {
            inner: std::sync::Mutex::new(MockClockInner {
                base_secs: 0.0,
                playing_since: None,
            }),
        }
    }

    /// Create a clock already playing from position 0.
    pub fn playing() -> Self {
        let clock = Self::new();
        clock.play();
        clock
    }

    /// Start (or resume) advancing the position.
    pub fn play(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.playing_since.is_none() {
            inner.playing_since = Some(tokio::time::Instant::now());
        }
    }

    /// Freeze the position.
    pub fn pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(since) = inner.playing_since.take() {
            inner.base_secs += since.elapsed().as_secs_f32();
        }
    }

    /// Jump to `position_secs`, preserving the playing/paused state.
    pub fn seek(&self, position_secs: f32) {
        let mut inner = self.inner.lock().unwrap();
        inner.base_secs = position_secs;
        if inner.playing_since.is_some() {
            inner.playing_since = Some(tokio::time::Instant::now());
        }
    }
}

#[cfg(test)]
impl PlaybackClock for MockClock {
    fn position_secs(&self) -> f32 {
        let inner = self.inner.lock().unwrap();
        match inner.playing_since {
            Some(since) => inner.base_secs + since.elapsed().as_secs_f32(),
            None => inner.base_secs,
        }
    }

    fn is_playing(&self) -> bool {
        self.inner.lock().unwrap().playing_since.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
