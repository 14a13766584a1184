//! Owned per-batch resources: loaded tracks and their mixer channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio::TrackAudio;
use crate::playback::mixer::{self, MixerChannel};
use crate::track::{TrackDescriptor, TrackStatus};

use super::state::{EngineStatus, LoadOutcome, TrackFailure};

/// One track of a batch. The decoded audio and the mixer channel are created
/// together and released together by [`LoadedTrack::dispose`].
#[derive(Debug)]
pub(crate) struct LoadedTrack {
    pub(crate) descriptor: TrackDescriptor,
    status: TrackStatus,
    audio: Option<Arc<TrackAudio>>,
    channel: MixerChannel,
}

impl LoadedTrack {
    pub(crate) fn new(descriptor: TrackDescriptor) -> Self {
        Self {
            descriptor,
            status: TrackStatus::Pending,
            audio: None,
            channel: MixerChannel::new(),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.descriptor.key
    }

    pub(crate) fn status(&self) -> &TrackStatus {
        &self.status
    }

    pub(crate) fn mark_loading(&mut self) {
        if self.status == TrackStatus::Pending {
            self.status = TrackStatus::Loading;
        }
    }

    pub(crate) fn attach(&mut self, audio: TrackAudio) {
        self.audio = Some(Arc::new(audio));
        self.status = TrackStatus::Ready;
    }

    pub(crate) fn fail(&mut self, reason: String) {
        self.audio = None;
        self.status = TrackStatus::Failed(reason);
    }

    pub(crate) fn audio(&self) -> Option<&Arc<TrackAudio>> {
        match self.status {
            TrackStatus::Ready => self.audio.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn channel(&self) -> &MixerChannel {
        &self.channel
    }

    pub(crate) fn channel_mut(&mut self) -> &mut MixerChannel {
        &mut self.channel
    }

    pub(crate) fn frames(&self) -> u64 {
        self.audio().map(|audio| audio.frames()).unwrap_or(0)
    }

    fn dispose(&mut self) {
        self.audio = None;
        self.channel.reset();
    }
}

/// The set of tracks loaded together under one transport clock.
#[derive(Debug)]
pub(crate) struct Batch {
    pub(crate) id: String,
    pub(crate) generation: u64,
    pub(crate) autoplay: bool,
    tracks: Vec<LoadedTrack>,
    abort: Arc<AtomicBool>,
    disposed: bool,
}

impl Batch {
    pub(crate) fn new(
        id: String,
        generation: u64,
        descriptors: Vec<TrackDescriptor>,
        autoplay: bool,
    ) -> Self {
        Self {
            id,
            generation,
            autoplay,
            tracks: descriptors.into_iter().map(LoadedTrack::new).collect(),
            abort: Arc::new(AtomicBool::new(false)),
            disposed: false,
        }
    }

    pub(crate) fn abort_flag(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    pub(crate) fn tracks(&self) -> &[LoadedTrack] {
        &self.tracks
    }

    pub(crate) fn tracks_mut(&mut self) -> &mut [LoadedTrack] {
        &mut self.tracks
    }

    pub(crate) fn track(&self, key: &str) -> Option<&LoadedTrack> {
        self.tracks.iter().find(|track| track.key() == key)
    }

    pub(crate) fn track_mut(&mut self, key: &str) -> Option<&mut LoadedTrack> {
        self.tracks.iter_mut().find(|track| track.key() == key)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.tracks.iter().all(|track| track.status().is_settled())
    }

    pub(crate) fn has_failures(&self) -> bool {
        self.tracks.iter().any(|track| track.status().is_failed())
    }

    pub(crate) fn status(&self) -> EngineStatus {
        if self.tracks.is_empty() {
            return EngineStatus::Ready;
        }
        if !self.is_settled() {
            return EngineStatus::Loading;
        }
        if self.tracks.iter().any(|track| track.audio().is_some()) {
            EngineStatus::Ready
        } else {
            EngineStatus::Failed
        }
    }

    /// A reload with the same id can be skipped once this batch has
    /// settled without failures.
    pub(crate) fn can_skip_reload(&self) -> bool {
        !self.disposed && self.is_settled() && !self.has_failures()
    }

    /// Solo exclusivity is decided over tracks that can actually play.
    pub(crate) fn solo_active(&self) -> bool {
        mixer::solo_active(
            self.tracks
                .iter()
                .filter(|track| !track.status().is_failed())
                .map(|track| track.channel().state()),
        )
    }

    pub(crate) fn is_audible(&self, track: &LoadedTrack) -> bool {
        track.audio().is_some() && mixer::is_audible(&track.channel().state(), self.solo_active())
    }

    /// End of content for the transport: the longest audible track, or the
    /// longest ready track when nothing is audible.
    pub(crate) fn end_frames(&self) -> u64 {
        let solo = self.solo_active();
        let audible = self
            .tracks
            .iter()
            .filter(|track| mixer::is_audible(&track.channel().state(), solo))
            .map(LoadedTrack::frames)
            .max()
            .unwrap_or(0);
        if audible > 0 {
            return audible;
        }
        self.tracks
            .iter()
            .map(LoadedTrack::frames)
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn outcome(&self) -> LoadOutcome {
        let mut ready = Vec::new();
        let mut failed = Vec::new();
        let mut pending = Vec::new();
        for track in &self.tracks {
            match track.status() {
                TrackStatus::Ready => ready.push(track.key().to_string()),
                TrackStatus::Failed(reason) => failed.push(TrackFailure {
                    key: track.key().to_string(),
                    reason: reason.clone(),
                }),
                TrackStatus::Pending | TrackStatus::Loading => {
                    pending.push(track.key().to_string())
                }
            }
        }
        LoadOutcome {
            batch_id: Some(self.id.clone()),
            status: self.status(),
            ready,
            failed,
            pending,
        }
    }

    /// Cancel in-flight loads and release every track's resources.
    /// Runs once; later calls are no-ops.
    pub(crate) fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.abort.store(true, Ordering::SeqCst);
        for track in &mut self.tracks {
            track.dispose();
        }
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        self.dispose();
    }
}
