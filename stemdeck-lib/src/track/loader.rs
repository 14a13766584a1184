//! Background fetch + decode of individual tracks.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use log::{info, warn};

use crate::audio::TrackAudio;
use crate::config::EngineSettings;
use crate::error::{EngineError, Result};

use super::decode::{decode, DecodedTrack};
use super::fetch::{extension_hint, fetch};

/// A single track to acquire on a worker thread.
#[derive(Debug, Clone)]
pub struct LoadJob {
    pub key: String,
    pub url: String,
    /// Shared by every job of a batch; raised when the batch is superseded.
    pub abort: Arc<AtomicBool>,
}

/// Fetches and decodes tracks without knowing anything about the engine.
#[derive(Debug, Clone)]
pub struct TrackLoader {
    settings: EngineSettings,
}

impl TrackLoader {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    /// Fetch and decode `url` on the calling thread.
    pub fn load(&self, url: &str, abort: &AtomicBool) -> Result<DecodedTrack> {
        let bytes = fetch(url, &self.settings, abort)?;
        let hint = extension_hint(url);
        decode(bytes, hint.as_deref(), self.settings.sample_rate, abort)
    }

    /// Load `job` on a new worker thread.
    ///
    /// `on_settled` is invoked exactly once with the job key and either the
    /// decoded audio or the reason the track failed.
    pub fn spawn<F>(&self, job: LoadJob, on_settled: F) -> Result<()>
    where
        F: FnOnce(String, Result<TrackAudio>) + Send + 'static,
    {
        let loader = self.clone();
        thread::Builder::new()
            .name(format!("stem-load-{}", job.key))
            .spawn(move || {
                let LoadJob { key, url, abort } = job;
                let result = loader.load(&url, &abort).map(|decoded| {
                    info!(
                        "track decoded: key={} frames={} source_rate={} decode_errors={}",
                        key,
                        decoded.audio.frames(),
                        decoded.source_sample_rate,
                        decoded.decode_errors
                    );
                    decoded.audio
                });
                if let Err(err) = &result {
                    if !matches!(err, EngineError::Aborted) {
                        warn!("track failed: key={} url={} error={}", key, url, err);
                    }
                }
                on_settled(key, result);
            })?;
        Ok(())
    }
}
