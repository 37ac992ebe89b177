//! Viseme mapping — fragment token → animation channel name.
//!
//! # Architecture
//!
//! ```text
//! Fragment.token ──▶ map_to_channel()
//!                      │ 1. phoneme table (case-insensitive)
//!                      │ 2. first-character heuristic
//!                      │ 3. default open channel
//!                      ▼
//!                  "viseme_A" | "viseme_E" | "viseme_O" | "viseme_M"
//! ```
//!
//! The mapper is a pure, total function: any input — phoneme code, whole
//! word, empty string, garbage — resolves to some channel.  An unrecognized
//! token lands on the default open channel rather than signalling an error,
//! because imperfect visual sync beats dropped frames or halted playback.

pub mod mapper;

pub use mapper::{map_to_channel, VISEME_CHANNELS, VISEME_A, VISEME_E, VISEME_M, VISEME_O};
