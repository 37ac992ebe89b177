//! Timeline scheduler — timed apply/release of viseme weights.
//!
//! One scheduler instance covers one playback session.  At start it turns
//! the fragment list into a sorted event list:
//!
//! 1. Malformed fragments (`start >= end`, negative or non-finite times) are
//!    skipped with a warning — never fatal to the rest of the utterance.
//! 2. Each valid fragment is mapped to a viseme channel and collected as a
//!    per-channel interval.
//! 3. Overlapping or abutting intervals on the *same* channel are merged, so
//!    a channel that is already "on" never flickers off while speech sound
//!    for that channel continues.  Intervals on *different* channels overlap
//!    freely — both channels carry weight 1 at once (independent max-hold).
//! 4. Each merged interval becomes an apply event (weight 1) at its start
//!    and a release event (weight 0) at its end.
//!
//! A single tokio task walks the event list in clock order.  It waits on the
//! *clock position*, not wall-clock deadlines: while the clock is playing it
//! sleeps the projected remaining time, while paused it polls at a short
//! interval — so a paused clock never fires events prematurely.  Events
//! whose position has already passed fire immediately in order, which is
//! what lets a post-seek session pick up an in-progress fragment.
//!
//! Immediately before every write the task validates its generation token;
//! a superseded scheduler performs no write.  The final release event of
//! every merged interval leaves all touched channels at 0.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::PlaybackClock;
use crate::config::LipsyncConfig;
use crate::fragment::Fragment;
use crate::schedule::GenerationCounter;
use crate::sink::WeightSink;
use crate::viseme::map_to_channel;

/// Two same-channel intervals closer than this are considered abutting and
/// are merged (float noise from the aligner would otherwise split them).
const ABUT_EPSILON_SECS: f32 = 1e-4;

// ---------------------------------------------------------------------------
// WeightEvent
// ---------------------------------------------------------------------------

/// One scheduled sink write: `channel` goes to `weight` at clock position
/// `at_secs`.
#[derive(Debug, Clone, PartialEq)]
struct WeightEvent {
    at_secs: f32,
    channel: &'static str,
    weight: f32,
}

// ---------------------------------------------------------------------------
// TimelineScheduler
// ---------------------------------------------------------------------------

/// Builds and runs the timed event list for one utterance.
pub struct TimelineScheduler;

impl TimelineScheduler {
    /// Start scheduling `fragments` against `clock`, writing into `sink`
    /// under `token`.
    ///
    /// Returns immediately; the apply/release actions run on a spawned tokio
    /// task.  Must be called from within a tokio runtime.  Never fails —
    /// malformed fragments are skipped, an empty fragment list yields a
    /// handle whose task finishes at once.
    pub fn start(
        fragments: &[Fragment],
        clock: Arc<dyn PlaybackClock>,
        sink: WeightSink,
        generations: GenerationCounter,
        token: u64,
        config: &LipsyncConfig,
    ) -> SchedulerHandle {
        let events = build_events(fragments);
        let channels = touched_channels(&events);

        log::debug!(
            "scheduler gen {token}: {} events on {} channels from {} fragments",
            events.len(),
            channels.len(),
            fragments.len(),
        );

        let pause_poll = Duration::from_millis(config.pause_poll_ms);
        let min_sleep = Duration::from_millis(config.min_sleep_ms);

        let task = tokio::spawn(run_events(
            events, clock, sink, generations, token, pause_poll, min_sleep,
        ));

        SchedulerHandle {
            token,
            channels,
            task,
        }
    }
}

// ---------------------------------------------------------------------------
// SchedulerHandle
// ---------------------------------------------------------------------------

/// Handle to a running (or finished) scheduler.
///
/// Dropping the handle does *not* cancel anything — cancellation is the
/// generation bump.  The controller keeps the handle for the touched-channel
/// set it needs when tearing a session down.
#[derive(Debug)]
pub struct SchedulerHandle {
    token: u64,
    channels: Vec<&'static str>,
    task: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// The generation token this scheduler writes under.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Every channel this schedule will touch (deduplicated).
    pub fn channels(&self) -> &[&'static str] {
        &self.channels
    }

    /// Whether the scheduler task has run to completion (all events fired or
    /// the session detected it was superseded).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// ---------------------------------------------------------------------------
// Event construction
// ---------------------------------------------------------------------------

/// Turn a fragment list into a sorted apply/release event list with
/// same-channel intervals merged.  Fragment order is irrelevant.
fn build_events(fragments: &[Fragment]) -> Vec<WeightEvent> {
    // Group intervals per channel.
    let mut intervals: std::collections::HashMap<&'static str, Vec<(f32, f32)>> =
        std::collections::HashMap::new();

    for fragment in fragments {
        if let Err(err) = fragment.validate() {
            log::warn!("skipping malformed fragment {:?}: {err}", fragment.token);
            continue;
        }
        let channel = map_to_channel(&fragment.token);
        intervals
            .entry(channel)
            .or_default()
            .push((fragment.start_secs, fragment.end_secs));
    }

    let mut events = Vec::new();
    for (channel, mut spans) in intervals {
        spans.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Merge overlapping/abutting spans: the earlier release is
        // suppressed whenever a later apply for the same channel would fall
        // on or before it.
        let mut merged: Vec<(f32, f32)> = Vec::with_capacity(spans.len());
        for (start, end) in spans {
            match merged.last_mut() {
                Some(last) if start <= last.1 + ABUT_EPSILON_SECS => {
                    last.1 = last.1.max(end);
                }
                _ => merged.push((start, end)),
            }
        }

        for (start, end) in merged {
            events.push(WeightEvent {
                at_secs: start,
                channel,
                weight: 1.0,
            });
            events.push(WeightEvent {
                at_secs: end,
                channel,
                weight: 0.0,
            });
        }
    }

    // Clock order; releases before applies on exact ties so a channel
    // handing over to another at the same instant closes first.
    events.sort_by(|a, b| {
        a.at_secs
            .total_cmp(&b.at_secs)
            .then(a.weight.total_cmp(&b.weight))
    });
    events
}

/// Deduplicated channel set of an event list.
fn touched_channels(events: &[WeightEvent]) -> Vec<&'static str> {
    let mut channels: Vec<&'static str> = events.iter().map(|e| e.channel).collect();
    channels.sort_unstable();
    channels.dedup();
    channels
}

// ---------------------------------------------------------------------------
// Event execution
// ---------------------------------------------------------------------------

/// Walk the event list in order, waiting on the clock position and
/// validating the generation token before every write.
async fn run_events(
    events: Vec<WeightEvent>,
    clock: Arc<dyn PlaybackClock>,
    sink: WeightSink,
    generations: GenerationCounter,
    token: u64,
    pause_poll: Duration,
    min_sleep: Duration,
) {
    for event in events {
        if !wait_for_position(&*clock, event.at_secs, &generations, token, pause_poll, min_sleep)
            .await
        {
            log::debug!("scheduler gen {token}: superseded, dropping pending writes");
            return;
        }
        // The token check and the write are the whole critical path: stale
        // events become silent no-ops here.
        if !generations.is_current(token) {
            log::debug!("scheduler gen {token}: superseded, dropping pending writes");
            return;
        }
        sink.set_weight(event.channel, event.weight);
        log::trace!(
            "scheduler gen {token}: {} = {} at {:.3}s",
            event.channel,
            event.weight,
            event.at_secs,
        );
    }
    log::debug!("scheduler gen {token}: schedule complete");
}

/// Wait until the clock reaches `target_secs`.
///
/// Sleeps the projected remaining playback time while the clock is running
/// and polls at `pause_poll` while it is paused.  Returns `false` as soon as
/// the generation goes stale, so a superseded task stops waiting on a clock
/// that may never reach its target again.
async fn wait_for_position(
    clock: &dyn PlaybackClock,
    target_secs: f32,
    generations: &GenerationCounter,
    token: u64,
    pause_poll: Duration,
    min_sleep: Duration,
) -> bool {
    loop {
        if !generations.is_current(token) {
            return false;
        }
        let position = clock.position_secs();
        if position >= target_secs {
            return true;
        }
        let delay = if clock.is_playing() {
            Duration::from_secs_f32((target_secs - position).max(0.0)).max(min_sleep)
        } else {
            pause_poll
        };
        tokio::time::sleep(delay).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::viseme::{VISEME_A, VISEME_E, VISEME_M};

    fn start_live(
        fragments: &[Fragment],
        clock: Arc<MockClock>,
    ) -> (WeightSink, GenerationCounter, SchedulerHandle) {
        let sink = WeightSink::new();
        let generations = GenerationCounter::new();
        let token = generations.bump();
        let handle = TimelineScheduler::start(
            fragments,
            clock,
            sink.clone(),
            generations.clone(),
            token,
            &LipsyncConfig::default(),
        );
        (sink, generations, handle)
    }

    async fn advance_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    // --- build_events ---

    #[test]
    fn events_come_out_in_clock_order_regardless_of_input_order() {
        let fragments = vec![
            Fragment::new("IY", 0.5, 0.8),
            Fragment::new("M", 0.0, 0.2),
            Fragment::new("AA", 0.2, 0.5),
        ];
        let events = build_events(&fragments);
        let times: Vec<f32> = events.iter().map(|e| e.at_secs).collect();
        let mut sorted = times.clone();
        sorted.sort_by(f32::total_cmp);
        assert_eq!(times, sorted);
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn malformed_fragments_are_skipped_not_fatal() {
        let fragments = vec![
            Fragment::new("AA", 0.5, 0.5),  // zero duration
            Fragment::new("M", 0.0, 0.2),   // fine
            Fragment::new("IY", 0.9, 0.4),  // inverted
            Fragment::new("UW", -1.0, 0.5), // negative start
        ];
        let events = build_events(&fragments);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].channel, VISEME_M);
    }

    #[test]
    fn same_channel_overlap_is_merged() {
        // Both map to viseme_A; intervals overlap, so the earlier release
        // must be suppressed — one apply, one release.
        let fragments = vec![
            Fragment::new("AA", 0.0, 0.4),
            Fragment::new("AH", 0.3, 0.7),
        ];
        let events = build_events(&fragments);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], WeightEvent { at_secs: 0.0, channel: VISEME_A, weight: 1.0 });
        assert_eq!(events[1], WeightEvent { at_secs: 0.7, channel: VISEME_A, weight: 0.0 });
    }

    #[test]
    fn same_channel_abutting_intervals_are_merged() {
        let fragments = vec![
            Fragment::new("AA", 0.0, 0.3),
            Fragment::new("AE", 0.3, 0.6),
        ];
        let events = build_events(&fragments);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].at_secs, 0.6);
    }

    #[test]
    fn different_channels_keep_independent_events_when_overlapping() {
        let fragments = vec![
            Fragment::new("M", 0.0, 0.4),
            Fragment::new("AA", 0.2, 0.6),
        ];
        let events = build_events(&fragments);
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn release_sorts_before_apply_on_exact_tie() {
        let fragments = vec![
            Fragment::new("M", 0.0, 0.2),
            Fragment::new("AA", 0.2, 0.5),
        ];
        let events = build_events(&fragments);
        // At 0.2s the M release must precede the A apply.
        assert_eq!(events[1].channel, VISEME_M);
        assert_eq!(events[1].weight, 0.0);
        assert_eq!(events[2].channel, VISEME_A);
        assert_eq!(events[2].weight, 1.0);
    }

    // --- live scheduling against a mock clock ---

    /// The end-to-end timing scenario: M → AA → IY over 0.8 s.
    #[tokio::test(start_paused = true)]
    async fn end_to_end_viseme_sequence() {
        let clock = Arc::new(MockClock::playing());
        let fragments = vec![
            Fragment::new("M", 0.0, 0.2),
            Fragment::new("AA", 0.2, 0.5),
            Fragment::new("IY", 0.5, 0.8),
        ];
        let (sink, _generations, handle) = start_live(&fragments, clock);

        advance_ms(100).await; // t = 0.10
        assert_eq!(sink.weight(VISEME_M), 1.0);
        assert_eq!(sink.weight(VISEME_A), 0.0);

        advance_ms(250).await; // t = 0.35
        assert_eq!(sink.weight(VISEME_M), 0.0);
        assert_eq!(sink.weight(VISEME_A), 1.0);

        advance_ms(300).await; // t = 0.65
        assert_eq!(sink.weight(VISEME_A), 0.0);
        assert_eq!(sink.weight(VISEME_E), 1.0);

        advance_ms(250).await; // t = 0.90
        for (channel, weight) in sink.snapshot() {
            assert_eq!(weight, 0.0, "{channel} still up after the last release");
        }
        assert!(handle.is_finished());
    }

    /// Every touched channel ends at 0 once the last release has elapsed.
    #[tokio::test(start_paused = true)]
    async fn all_channels_end_at_zero() {
        let clock = Arc::new(MockClock::playing());
        let fragments = vec![
            Fragment::new("hello", 0.1, 0.3),
            Fragment::new("UW", 0.25, 0.5),
            Fragment::new("M", 0.45, 0.7),
        ];
        let (sink, _generations, handle) = start_live(&fragments, clock);

        advance_ms(1_000).await;
        assert!(handle.is_finished());
        for (channel, weight) in sink.snapshot() {
            assert_eq!(weight, 0.0, "{channel}");
        }
    }

    /// Same-channel overlap: weight 1 continuously, no dip between the two.
    #[tokio::test(start_paused = true)]
    async fn overlapping_same_channel_never_flickers_off() {
        let clock = Arc::new(MockClock::playing());
        let fragments = vec![
            Fragment::new("AA", 0.0, 0.3),
            Fragment::new("AH", 0.25, 0.6),
        ];
        let (sink, _generations, _handle) = start_live(&fragments, clock);

        advance_ms(280).await; // inside both fragments
        assert_eq!(sink.weight(VISEME_A), 1.0);
        advance_ms(170).await; // t = 0.45, past the first fragment's end
        assert_eq!(sink.weight(VISEME_A), 1.0);
        advance_ms(200).await; // t = 0.65, past the merged release
        assert_eq!(sink.weight(VISEME_A), 0.0);
    }

    /// A paused clock defers events instead of firing them prematurely.
    #[tokio::test(start_paused = true)]
    async fn paused_clock_defers_events() {
        let clock = Arc::new(MockClock::playing());
        let fragments = vec![Fragment::new("AA", 0.2, 0.5)];
        let (sink, _generations, _handle) = start_live(&fragments, Arc::clone(&clock));

        advance_ms(100).await; // t = 0.1, before the apply
        clock.pause();
        advance_ms(5_000).await; // wall time passes, position frozen at 0.1
        assert_eq!(sink.weight(VISEME_A), 0.0, "apply fired while paused");

        clock.play();
        advance_ms(150).await; // position reaches 0.25
        assert_eq!(sink.weight(VISEME_A), 1.0);
    }

    /// Stale generation: pending writes become silent no-ops.
    #[tokio::test(start_paused = true)]
    async fn superseded_scheduler_writes_nothing() {
        let clock = Arc::new(MockClock::playing());
        let fragments = vec![Fragment::new("AA", 0.2, 0.5)];
        let (sink, generations, handle) = start_live(&fragments, clock);

        advance_ms(100).await; // before the apply fires
        generations.bump();
        advance_ms(1_000).await; // apply/release deadlines long passed

        assert_eq!(sink.weight(VISEME_A), 0.0);
        assert!(handle.is_finished());
    }

    /// Events already in the past at start fire immediately, in order —
    /// this is what resync after a seek relies on.
    #[tokio::test(start_paused = true)]
    async fn past_events_fire_immediately_in_order() {
        let clock = Arc::new(MockClock::playing());
        clock.seek(0.3);
        // Interval in progress at 0.3: applies now, releases at 0.6.
        let fragments = vec![Fragment::new("AA", 0.2, 0.6)];
        let (sink, _generations, _handle) = start_live(&fragments, clock);

        advance_ms(10).await;
        assert_eq!(sink.weight(VISEME_A), 1.0);
        advance_ms(300).await; // position 0.61
        assert_eq!(sink.weight(VISEME_A), 0.0);
    }

    /// An empty fragment list produces a handle that finishes immediately.
    #[tokio::test(start_paused = true)]
    async fn empty_fragment_list_finishes_immediately() {
        let clock = Arc::new(MockClock::playing());
        let (sink, _generations, handle) = start_live(&[], clock);
        advance_ms(1).await;
        assert!(handle.is_finished());
        assert!(sink.snapshot().is_empty());
        assert!(handle.channels().is_empty());
    }
}
