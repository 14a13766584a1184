//! Public state and command-result types of the stem engine.

use crate::playback::mixer::MixerState;
use crate::playback::transport::TransportState;
use crate::track::TrackStatus;

/// Aggregate readiness of the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Nothing has been loaded yet (or the engine was disposed).
    Idle,
    Loading,
    /// Every track settled and at least one is playable, or the batch is empty.
    Ready,
    /// Every track in a non-empty batch failed. The batch still counts as
    /// ready; it just has nothing to play.
    Failed,
}

impl EngineStatus {
    /// True once every track of the batch has settled, successfully or not.
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Why a command had no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    NotReady,
    UnknownTrack,
    /// The track exists but failed to load.
    TrackUnavailable,
    Unchanged,
    ActivationFailed(String),
    Disposed,
}

/// Acceptance or rejection of a transport or mixer command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Ignored(IgnoreReason),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub(crate) fn changed(changed: bool) -> Self {
        if changed {
            Self::Applied
        } else {
            Self::Ignored(IgnoreReason::Unchanged)
        }
    }
}

/// Result of asking the engine to load a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRequest {
    Started { generation: u64 },
    /// Same batch id as the current healthy batch; nothing was reloaded.
    Skipped,
}

/// Options for [`super::StemEngine::load_tracks_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Start the transport once the batch is ready, provided the audio
    /// output is already active.
    pub autoplay: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFailure {
    pub key: String,
    pub reason: String,
}

/// Settled (or timed-out) view of the current batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub batch_id: Option<String>,
    pub status: EngineStatus,
    pub ready: Vec<String>,
    pub failed: Vec<TrackFailure>,
    pub pending: Vec<String>,
}

impl LoadOutcome {
    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    pub fn all_failed(&self) -> bool {
        self.status == EngineStatus::Failed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub key: String,
    pub name: String,
    pub status: TrackStatus,
    pub mixer: MixerState,
    pub audible: bool,
    pub duration: f64,
}

/// Point-in-time view of the whole engine for UI consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub batch_id: Option<String>,
    pub status: EngineStatus,
    pub is_ready: bool,
    pub is_playing: bool,
    pub transport: TransportState,
    pub position: f64,
    pub duration: f64,
    pub progress_percent: f64,
    pub tracks: Vec<TrackSnapshot>,
}
