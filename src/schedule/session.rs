//! Session controller — binds one audio playback lifecycle to one scheduler.
//!
//! [`SessionController`] owns the generation counter, the [`WeightSink`],
//! and the persistent emotion state.  It guarantees at most one live
//! schedule per audio handle: starting a new utterance, seeking beyond
//! tolerance, or stopping all bump the generation, which supersedes the
//! previous scheduler without touching its timers.
//!
//! # Event flow
//!
//! ```text
//! SessionEvent::Utterance ──▶ play_utterance   (new generation + scheduler)
//! SessionEvent::Pause     ──▶ record position at pause
//! SessionEvent::Play      ──▶ drift > tolerance? ──▶ resync from position
//! SessionEvent::Seeked    ──▶ resync from position (new epoch)
//! SessionEvent::Ended     ──▶ teardown, touched channels to 0
//! SessionEvent::PlaybackError ─▶ same as Ended
//! SessionEvent::Emotion   ──▶ persistent emotion channel swap
//! SessionEvent::Stop      ──▶ teardown
//! ```
//!
//! The handlers are synchronous and non-blocking (scheduling only spawns a
//! task); [`run`](SessionController::run) is the async loop that drives them
//! from an mpsc channel, for hosts that deliver audio-element events that
//! way.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::clock::PlaybackClock;
use crate::config::LipsyncConfig;
use crate::emotion::EmotionState;
use crate::fragment::Fragment;
use crate::schedule::{GenerationCounter, SchedulerHandle, TimelineScheduler};
use crate::sink::WeightSink;

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Everything the host can feed into the controller.
///
/// `Play`/`Pause`/`Seeked`/`Ended`/`PlaybackError` mirror the audio
/// element's lifecycle events; `Utterance` and `Emotion` carry the TTS and
/// dialogue collaborators' outputs.
pub enum SessionEvent {
    /// A new utterance starts playing: its timing track and a handle to the
    /// audio element's clock.
    Utterance {
        clock: Arc<dyn PlaybackClock>,
        fragments: Vec<Fragment>,
    },
    /// Playback resumed.
    Play,
    /// Playback paused.
    Pause,
    /// The playback position jumped.
    Seeked,
    /// Playback reached the end of the audio.
    Ended,
    /// The audio element failed mid-utterance.  Unrecoverable here — the
    /// collaborator that owns playback decides whether to re-issue.
    PlaybackError,
    /// The dialogue collaborator's emotion tag for the current reply.
    Emotion(String),
    /// Explicit teardown.
    Stop,
}

impl std::fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Utterance { fragments, .. } => f
                .debug_struct("Utterance")
                .field("fragments", &fragments.len())
                .finish(),
            SessionEvent::Play => write!(f, "Play"),
            SessionEvent::Pause => write!(f, "Pause"),
            SessionEvent::Seeked => write!(f, "Seeked"),
            SessionEvent::Ended => write!(f, "Ended"),
            SessionEvent::PlaybackError => write!(f, "PlaybackError"),
            SessionEvent::Emotion(name) => f.debug_tuple("Emotion").field(name).finish(),
            SessionEvent::Stop => write!(f, "Stop"),
        }
    }
}

// ---------------------------------------------------------------------------
// ActiveUtterance
// ---------------------------------------------------------------------------

/// The utterance currently bound to the controller: its full timing track
/// (kept for resync), its clock, the live scheduler handle, and the position
/// recorded at the last pause.
struct ActiveUtterance {
    clock: Arc<dyn PlaybackClock>,
    fragments: Vec<Fragment>,
    handle: SchedulerHandle,
    paused_at: Option<f32>,
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Owns the current session and the sink; guarantees at most one live
/// generation of writes at any time.
pub struct SessionController {
    sink: WeightSink,
    config: LipsyncConfig,
    generations: GenerationCounter,
    emotions: EmotionState,
    active: Option<ActiveUtterance>,
}

impl SessionController {
    /// Create a controller writing into `sink`.
    pub fn new(sink: WeightSink, config: LipsyncConfig) -> Self {
        Self {
            sink,
            config,
            generations: GenerationCounter::new(),
            emotions: EmotionState::new(),
            active: None,
        }
    }

    /// The sink this controller writes into.
    pub fn sink(&self) -> &WeightSink {
        &self.sink
    }

    /// The shared generation counter (the cooperative cancellation root).
    pub fn generations(&self) -> &GenerationCounter {
        &self.generations
    }

    /// Token of the live scheduler, if an utterance is active.
    pub fn active_token(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.handle.token())
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Drive the controller from a channel of [`SessionEvent`]s until the
    /// channel closes.  Spawn as a tokio task from the host integration.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            log::debug!("session: {event:?}");
            self.handle_event(event);
        }
        log::info!("session: event channel closed, tearing down");
        self.stop();
    }

    /// Dispatch one event to its handler.  Synchronous and non-blocking.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Utterance { clock, fragments } => {
                self.play_utterance(clock, fragments)
            }
            SessionEvent::Play => self.handle_play(),
            SessionEvent::Pause => self.handle_pause(),
            SessionEvent::Seeked => self.handle_seeked(),
            SessionEvent::Ended => self.handle_ended(),
            SessionEvent::PlaybackError => self.handle_error(),
            SessionEvent::Emotion(name) => self.set_emotion(&name),
            SessionEvent::Stop => self.stop(),
        }
    }

    // -----------------------------------------------------------------------
    // Utterance lifecycle
    // -----------------------------------------------------------------------

    /// Bind a new utterance: bump the generation (superseding any prior
    /// scheduler — its pending writes all short-circuit on the token check)
    /// and start a fresh scheduler against `clock`.
    pub fn play_utterance(&mut self, clock: Arc<dyn PlaybackClock>, fragments: Vec<Fragment>) {
        let token = self.generations.bump();

        // Channels the superseded schedule may have left non-zero are not in
        // the new schedule's hands; clear them before the new epoch writes.
        if let Some(previous) = self.active.take() {
            self.reset_channels(&previous.handle);
        }

        let handle = TimelineScheduler::start(
            &fragments,
            Arc::clone(&clock),
            self.sink.clone(),
            self.generations.clone(),
            token,
            &self.config,
        );
        log::debug!(
            "session: utterance with {} fragments at gen {token}",
            fragments.len()
        );

        self.active = Some(ActiveUtterance {
            clock,
            fragments,
            handle,
            paused_at: None,
        });
    }

    /// Tear the current session down: invalidate all pending writes, return
    /// every touched viseme channel to 0.  Emotion channels persist.
    pub fn stop(&mut self) {
        self.generations.bump();
        if let Some(active) = self.active.take() {
            self.reset_channels(&active.handle);
            log::debug!("session: stopped at gen {}", self.generations.current());
        }
    }

    /// Apply the dialogue collaborator's emotion tag.  Independent of the
    /// viseme timeline and of generations.
    pub fn set_emotion(&mut self, emotion: &str) {
        self.emotions.apply(&self.sink, emotion);
    }

    // -----------------------------------------------------------------------
    // Audio lifecycle handlers
    // -----------------------------------------------------------------------

    /// Playback paused: remember where, so `Play` can measure the drift.
    fn handle_pause(&mut self) {
        if let Some(active) = self.active.as_mut() {
            let position = active.clock.position_secs();
            active.paused_at = Some(position);
            log::debug!("session: paused at {position:.3}s");
        }
    }

    /// Playback resumed.  Within tolerance the live scheduler just carries
    /// on (its waits are gated on clock position); beyond tolerance this is
    /// a new scheduling epoch.
    fn handle_play(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(paused_at) = active.paused_at.take() else {
            return;
        };
        let position = active.clock.position_secs();
        let drift = (position - paused_at).abs();
        if drift > self.config.seek_tolerance_secs {
            log::debug!(
                "session: resumed {drift:.3}s away from pause point, resyncing at {position:.3}s"
            );
            self.resync(position);
        }
    }

    /// The position jumped.  The scheduler is not re-synchronized in place;
    /// it is superseded by a fresh one computed against the new position.
    fn handle_seeked(&mut self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let position = active.clock.position_secs();
        log::debug!("session: seeked to {position:.3}s, resyncing");
        self.resync(position);
    }

    /// Playback finished normally.
    fn handle_ended(&mut self) {
        log::debug!("session: playback ended");
        self.stop();
    }

    /// Playback failed.  Treated identically to `Ended`: nothing here can
    /// resume a broken audio element.
    fn handle_error(&mut self) {
        log::error!("session: playback error, resetting to neutral");
        self.stop();
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Start a fresh scheduler at a new generation covering the fragments
    /// not yet finished at `position`.  A fragment in progress at the seek
    /// point applies immediately and still releases at its own end.
    fn resync(&mut self, position: f32) {
        let Some(active) = self.active.take() else {
            return;
        };

        let token = self.generations.bump();
        self.reset_channels(&active.handle);

        let remaining: Vec<Fragment> = active
            .fragments
            .iter()
            .filter(|f| f.end_secs > position)
            .cloned()
            .collect();
        log::debug!(
            "session: resync gen {token}, {} of {} fragments remain",
            remaining.len(),
            active.fragments.len()
        );

        let handle = TimelineScheduler::start(
            &remaining,
            Arc::clone(&active.clock),
            self.sink.clone(),
            self.generations.clone(),
            token,
            &self.config,
        );

        self.active = Some(ActiveUtterance {
            clock: active.clock,
            fragments: active.fragments,
            handle,
            paused_at: None,
        });
    }

    /// Zero every channel a (superseded) scheduler touched.  Called only
    /// after the generation bump, so the old scheduler cannot write again.
    fn reset_channels(&self, handle: &SchedulerHandle) {
        for channel in handle.channels() {
            self.sink.set_weight(channel, 0.0);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
