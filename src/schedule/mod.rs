//! Viseme scheduling — the timing, ordering, and cancellation core.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    SessionController                        │
//! │                                                            │
//! │  SessionEvent (mpsc) ──▶ run() ──▶ handlers                │
//! │                                                            │
//! │  play_utterance ──▶ GenerationCounter.bump()               │
//! │                     TimelineScheduler::start ──┐           │
//! │                                                │           │
//! │  ┌─────────────────────────────────────────────▼────────┐  │
//! │  │            TimelineScheduler (tokio task)            │  │
//! │  │  fragments → mapper → per-channel merged intervals   │  │
//! │  │  wait on clock position → generation check → write   │  │
//! │  └──────────────────────────┬───────────────────────────┘  │
//! │                             ▼                              │
//! │                        WeightSink  ◀── renderer snapshot   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation is cooperative: superseding a session only bumps the shared
//! [`GenerationCounter`].  A stale scheduler's deferred actions still fire,
//! validate their token, and no-op — there is no timer-handle bookkeeping
//! anywhere.

pub mod session;
pub mod timeline;

pub use session::{SessionController, SessionEvent};
pub use timeline::{SchedulerHandle, TimelineScheduler};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// GenerationCounter
// ---------------------------------------------------------------------------

/// Monotonically increasing counter identifying the live scheduling session.
///
/// The controller bumps it to supersede a session; each scheduler holds the
/// token it was started with and validates it immediately before every sink
/// write.  Only the scheduler whose token matches the current value may
/// write.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    value: Arc<AtomicU64>,
}

impl GenerationCounter {
    /// Create a counter at generation 0 (no session has started yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// The current live generation.
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Invalidate every outstanding token and return the new generation.
    pub fn bump(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `token` still identifies the live generation.
    pub fn is_current(&self, token: u64) -> bool {
        self.current() == token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(GenerationCounter::new().current(), 0);
    }

    #[test]
    fn bump_returns_the_new_generation() {
        let gen = GenerationCounter::new();
        assert_eq!(gen.bump(), 1);
        assert_eq!(gen.bump(), 2);
        assert_eq!(gen.current(), 2);
    }

    #[test]
    fn bump_invalidates_older_tokens() {
        let gen = GenerationCounter::new();
        let token = gen.bump();
        assert!(gen.is_current(token));
        gen.bump();
        assert!(!gen.is_current(token));
    }

    #[test]
    fn clones_share_the_counter() {
        let gen = GenerationCounter::new();
        let gen2 = gen.clone();
        gen.bump();
        assert_eq!(gen2.current(), 1);
    }
}
