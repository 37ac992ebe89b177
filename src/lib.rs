//! avatar-lipsync — viseme/emotion scheduling for a talking 3D avatar.
//!
//! Keeps mouth-shape ("viseme") and emotion blendshape weights synchronized
//! with streamed speech audio as it plays.  The TTS collaborator delivers
//! audio plus a timing track of phoneme/word fragments; this crate turns the
//! track into timed weight writes against the audio's playback clock and
//! guarantees that no stale animation state lingers after playback ends, is
//! seeked, or is superseded.
//!
//! # Architecture
//!
//! ```text
//! TTS timing track ─▶ Fragment list ─┐
//!                                    ▼
//! audio clock ──▶ SessionController ─▶ TimelineScheduler ─▶ WeightSink
//!  (play/pause/      (generations,      (viseme mapper,       ▲
//!   seek/end)         teardown)          timed writes)        │ snapshot
//!                                                             │ per frame
//! dialogue emotion ─▶ EmotionState ───────────────────────────┘
//!                                                         renderer
//! ```
//!
//! The renderer reads [`WeightSink::snapshot`] once per animation frame and
//! translates channel names into morph-target influences itself; nothing in
//! this crate knows about meshes.  Scheduling is cooperative: superseding a
//! session bumps a generation counter, and stale timers validate their token
//! and silently no-op instead of being tracked and cancelled.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use avatar_lipsync::{
//!     config::LipsyncConfig,
//!     fragment::parse_timing_track,
//!     schedule::SessionController,
//!     sink::WeightSink,
//! };
//! # use avatar_lipsync::clock::PlaybackClock;
//! # fn audio_clock() -> Arc<dyn PlaybackClock> { unimplemented!() }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let sink = WeightSink::new();
//! let mut session = SessionController::new(sink.clone(), LipsyncConfig::load()?);
//!
//! let fragments = parse_timing_track(r#"[{"phoneme":"M","start":0.0,"end":0.2}]"#)?;
//! session.play_utterance(audio_clock(), fragments);
//! session.set_emotion("smile");
//!
//! // Each animation frame, on the render side:
//! let weights = sink.snapshot();
//! # let _ = weights;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod emotion;
pub mod fragment;
pub mod schedule;
pub mod sink;
pub mod viseme;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use clock::PlaybackClock;
pub use config::LipsyncConfig;
pub use emotion::EmotionState;
pub use fragment::{parse_timing_track, Fragment, FragmentError, TimingTrackError};
pub use schedule::{GenerationCounter, SessionController, SessionEvent, TimelineScheduler};
pub use sink::WeightSink;
pub use viseme::map_to_channel;
