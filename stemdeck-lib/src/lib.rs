//! # Stemdeck
//!
//! Synchronized multi-track (stem) playback. Tracks are fetched and decoded
//! in parallel, then played against one shared transport so they stay
//! sample-aligned through play, pause, stop and seek, with per-track volume,
//! mute and solo.

pub mod audio;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod playback;
pub mod track;

#[cfg(test)]
mod test_support;

pub use config::EngineSettings;
pub use diagnostics::reporter::Report;
pub use error::{EngineError, Result};
pub use playback::engine::{
    CommandOutcome, EngineSnapshot, EngineStatus, IgnoreReason, LoadOptions, LoadOutcome,
    LoadRequest, StemEngine, TrackFailure, TrackSnapshot,
};
pub use playback::mixer::MixerState;
pub use playback::output::{AudioOutput, HeadlessOutput, HeadlessPump, RodioOutput};
pub use playback::single::SingleTrackPlayer;
pub use playback::transport::TransportState;
pub use track::{TrackDescriptor, TrackStatus};
