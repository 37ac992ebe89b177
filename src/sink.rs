//! Channel weight sink — the single source of truth the renderer reads.
//!
//! [`WeightSink`] maps channel names (viseme or emotion morph targets) to a
//! blend weight in `[0, 1]`.  The scheduler writes it; the rendering
//! collaborator takes a [`snapshot`](WeightSink::snapshot) once per animation
//! frame and translates channel names into morph-target influences itself
//! (the name→index lookup lives on the rendering side, never here).
//!
//! Plain last-write-wins key/value store, no history.  Cheap to clone
//! (`Arc` clone); the interior mutex guards short critical sections only and
//! is never held across an `.await` point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// WeightSink
// ---------------------------------------------------------------------------

/// Thread-safe mapping from channel name to current blend weight.
#[derive(Debug, Clone, Default)]
pub struct WeightSink {
    weights: Arc<Mutex<HashMap<String, f32>>>,
}

impl WeightSink {
    /// Create an empty sink — every channel implicitly at weight 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `channel` to `value`, clamped to `[0, 1]`.  Last write wins.
    pub fn set_weight(&self, channel: &str, value: f32) {
        let clamped = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut weights = self.weights.lock().unwrap();
        weights.insert(channel.to_owned(), clamped);
    }

    /// Current weight of `channel`; 0 for channels never written.
    pub fn weight(&self, channel: &str) -> f32 {
        let weights = self.weights.lock().unwrap();
        weights.get(channel).copied().unwrap_or(0.0)
    }

    /// Copy of the full channel→weight mapping, for the per-frame read.
    pub fn snapshot(&self) -> HashMap<String, f32> {
        self.weights.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_channel_reads_zero() {
        let sink = WeightSink::new();
        assert_eq!(sink.weight("viseme_A"), 0.0);
    }

    #[test]
    fn set_then_read_roundtrips() {
        let sink = WeightSink::new();
        sink.set_weight("viseme_M", 1.0);
        assert_eq!(sink.weight("viseme_M"), 1.0);
    }

    #[test]
    fn last_write_wins() {
        let sink = WeightSink::new();
        sink.set_weight("viseme_A", 1.0);
        sink.set_weight("viseme_A", 0.0);
        assert_eq!(sink.weight("viseme_A"), 0.0);
    }

    #[test]
    fn values_are_clamped_to_unit_interval() {
        let sink = WeightSink::new();
        sink.set_weight("viseme_A", 3.5);
        assert_eq!(sink.weight("viseme_A"), 1.0);
        sink.set_weight("viseme_A", -0.2);
        assert_eq!(sink.weight("viseme_A"), 0.0);
    }

    #[test]
    fn non_finite_values_degrade_to_zero() {
        let sink = WeightSink::new();
        sink.set_weight("viseme_A", f32::NAN);
        assert_eq!(sink.weight("viseme_A"), 0.0);
    }

    #[test]
    fn snapshot_contains_all_written_channels() {
        let sink = WeightSink::new();
        sink.set_weight("viseme_A", 1.0);
        sink.set_weight("smile", 1.0);
        let snap = sink.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap["viseme_A"], 1.0);
        assert_eq!(snap["smile"], 1.0);
    }

    #[test]
    fn clones_share_the_same_store() {
        let sink = WeightSink::new();
        let sink2 = sink.clone();
        sink.set_weight("viseme_E", 1.0);
        assert_eq!(sink2.weight("viseme_E"), 1.0);
    }

    #[test]
    fn sink_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WeightSink>();
    }
}
