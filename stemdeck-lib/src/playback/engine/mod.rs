//! Multi-track stem engine.
//!
//! A [`StemEngine`] loads a batch of tracks in parallel, reports aggregate
//! readiness, and plays every ready track against one shared transport.
//! Loading, transport commands and mixer commands may be issued from any
//! thread.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info};

use crate::config::EngineSettings;
use crate::diagnostics::reporter::Reporter;
use crate::error::{EngineError, Result};
use crate::playback::mixer::MixerState;
use crate::playback::output::{AudioOutput, RodioOutput};
use crate::playback::transport::TransportState;
use crate::track::{validate_batch, LoadJob, TrackDescriptor, TrackLoader, TrackStatus};

mod batch;
mod controls;
pub(crate) mod session;
mod state;

#[cfg(test)]
mod tests;

pub use state::{
    CommandOutcome, EngineSnapshot, EngineStatus, IgnoreReason, LoadOptions, LoadOutcome,
    LoadRequest, TrackFailure, TrackSnapshot,
};

use batch::Batch;
use session::Shared;

/// Synchronized multi-track player.
pub struct StemEngine {
    settings: EngineSettings,
    shared: Arc<Shared>,
    loader: TrackLoader,
    output: Mutex<Box<dyn AudioOutput>>,
    reporter: Mutex<Option<Reporter>>,
}

impl StemEngine {
    /// Create an engine that plays through the default audio device.
    ///
    /// The device is not opened until the first play request.
    pub fn new(settings: EngineSettings) -> Self {
        let settings = settings.sanitized();
        let output = RodioOutput::new(&settings);
        Self::with_output(settings, Box::new(output))
    }

    /// Create an engine with a custom output backend.
    pub fn with_output(settings: EngineSettings, output: Box<dyn AudioOutput>) -> Self {
        let settings = settings.sanitized();
        info!(
            "stem engine created: sample_rate={} block_frames={}",
            settings.sample_rate, settings.block_frames
        );
        Self {
            shared: Shared::new(settings.sample_rate),
            loader: TrackLoader::new(settings.clone()),
            output: Mutex::new(output),
            reporter: Mutex::new(None),
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Load a batch of tracks, replacing whatever is loaded now.
    ///
    /// # Arguments
    ///
    /// * `batch_id` - Identity of the batch. Reloading the id of a batch
    ///   that settled without failures is skipped.
    /// * `tracks` - Track descriptors; keys must be unique.
    pub fn load_tracks(
        &self,
        batch_id: impl Into<String>,
        tracks: Vec<TrackDescriptor>,
    ) -> Result<LoadRequest> {
        self.load_tracks_with(batch_id, tracks, LoadOptions::default())
    }

    /// Like [`Self::load_tracks`], with load options.
    pub fn load_tracks_with(
        &self,
        batch_id: impl Into<String>,
        tracks: Vec<TrackDescriptor>,
        options: LoadOptions,
    ) -> Result<LoadRequest> {
        let batch_id = batch_id.into();
        validate_batch(&tracks)?;

        let (generation, jobs) = {
            let mut session = self.shared.lock();
            if session.disposed {
                return Err(EngineError::Disposed);
            }
            if let Some(current) = &session.batch {
                if current.id == batch_id && current.can_skip_reload() {
                    debug!("batch {} already loaded; skipping", batch_id);
                    return Ok(LoadRequest::Skipped);
                }
            }

            session.generation += 1;
            let generation = session.generation;
            if let Some(mut previous) = session.batch.take() {
                previous.dispose();
                info!("disposed batch {}", previous.id);
            }
            session.transport.stop();

            let mut batch = Batch::new(batch_id.clone(), generation, tracks, options.autoplay);
            let abort = batch.abort_flag();
            let jobs: Vec<LoadJob> = batch
                .tracks_mut()
                .iter_mut()
                .map(|track| {
                    track.mark_loading();
                    LoadJob {
                        key: track.descriptor.key.clone(),
                        url: track.descriptor.url.clone(),
                        abort: abort.clone(),
                    }
                })
                .collect();
            session.batch = Some(batch);
            (generation, jobs)
        };
        self.shared.notify();

        info!(
            "loading batch {}: {} tracks (generation {})",
            batch_id,
            jobs.len(),
            generation
        );
        for job in jobs {
            let key = job.key.clone();
            let shared = self.shared.clone();
            let spawned = self.loader.spawn(job, move |key, result| {
                shared.apply_settled(generation, key, result);
            });
            if let Err(err) = spawned {
                self.shared.apply_settled(generation, key, Err(err));
            }
        }

        Ok(LoadRequest::Started { generation })
    }

    /// Block until the current batch settles or `timeout` elapses.
    pub fn wait_until_settled(&self, timeout: Duration) -> LoadOutcome {
        self.shared.wait_until_settled(timeout)
    }

    /// Like [`Self::wait_until_settled`], using the configured timeout.
    pub fn wait_until_settled_default(&self) -> LoadOutcome {
        self.wait_until_settled(Duration::from_millis(self.settings.settle_timeout_ms))
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn status(&self) -> EngineStatus {
        self.shared.lock().status()
    }

    /// True when every track has settled and at least one can play, or the
    /// batch is empty.
    pub fn is_ready(&self) -> bool {
        self.shared.lock().is_ready()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock().transport.is_playing()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    pub fn transport_state(&self) -> TransportState {
        self.shared.lock().transport.state()
    }

    /// Current transport position in seconds.
    pub fn position(&self) -> f64 {
        self.shared.lock().transport.position_seconds()
    }

    /// Length of the longest audible track in seconds.
    pub fn duration(&self) -> f64 {
        self.shared.lock().duration()
    }

    pub fn progress_percent(&self) -> f64 {
        self.shared.lock().progress_percent()
    }

    pub fn track_status(&self, key: &str) -> Option<TrackStatus> {
        let session = self.shared.lock();
        session
            .batch
            .as_ref()
            .and_then(|batch| batch.track(key))
            .map(|track| track.status().clone())
    }

    pub fn mixer_state(&self, key: &str) -> Option<MixerState> {
        let session = self.shared.lock();
        session
            .batch
            .as_ref()
            .and_then(|batch| batch.track(key))
            .filter(|track| !track.status().is_failed())
            .map(|track| track.channel().state())
    }

    /// Playhead of every ready track, in seconds.
    pub fn track_positions(&self) -> Vec<(String, f64)> {
        self.shared.lock().track_positions()
    }

    fn output(&self) -> std::sync::MutexGuard<'_, Box<dyn AudioOutput>> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StemEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}
