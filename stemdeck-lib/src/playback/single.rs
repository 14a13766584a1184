//! Single-source player for A/B listening.
//!
//! Wraps a [`StemEngine`] holding one track. The source URL can be swapped
//! while playing (e.g. original upload vs. mastered render) and playback
//! resumes on the new source once it is decoded.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::info;

use crate::config::EngineSettings;
use crate::error::Result;
use crate::playback::engine::{
    CommandOutcome, EngineStatus, IgnoreReason, LoadOptions, LoadOutcome, LoadRequest, StemEngine,
};
use crate::playback::output::AudioOutput;
use crate::track::TrackDescriptor;

const SOURCE_KEY: &str = "source";

pub struct SingleTrackPlayer {
    engine: StemEngine,
    source: Mutex<Option<String>>,
}

impl SingleTrackPlayer {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            engine: StemEngine::new(settings),
            source: Mutex::new(None),
        }
    }

    pub fn with_output(settings: EngineSettings, output: Box<dyn AudioOutput>) -> Self {
        Self {
            engine: StemEngine::with_output(settings, output),
            source: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &StemEngine {
        &self.engine
    }

    pub fn source(&self) -> Option<String> {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Point the player at a new source.
    ///
    /// Nothing is loaded until the first [`Self::toggle_play`]. After that,
    /// a change reloads immediately and resumes if the old source was
    /// playing. `None` and an unchanged URL are no-ops.
    pub fn set_source(&self, url: Option<&str>) -> Result<LoadRequest> {
        let Some(url) = url else {
            return Ok(LoadRequest::Skipped);
        };
        {
            let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
            if source.as_deref() == Some(url) {
                return Ok(LoadRequest::Skipped);
            }
            *source = Some(url.to_string());
        }

        if self.engine.status() == EngineStatus::Idle {
            return Ok(LoadRequest::Skipped);
        }
        let resume = self.engine.is_playing();
        info!("switching source to {} (resume={})", url, resume);
        self.load(url, resume)
    }

    /// Play or pause. The first call opens the output and loads the source,
    /// starting playback once it is ready.
    pub fn toggle_play(&self) -> CommandOutcome {
        if self.engine.is_disposed() || self.engine.status() != EngineStatus::Idle {
            return self.engine.toggle_play();
        }
        let Some(url) = self.source() else {
            return CommandOutcome::Ignored(IgnoreReason::NotReady);
        };
        if let Err(err) = self.engine.activate() {
            return CommandOutcome::Ignored(IgnoreReason::ActivationFailed(err.to_string()));
        }
        match self.load(&url, true) {
            Ok(_) => CommandOutcome::Applied,
            Err(err) => {
                log::warn!("failed to start loading {}: {}", url, err);
                CommandOutcome::Ignored(IgnoreReason::NotReady)
            }
        }
    }

    fn load(&self, url: &str, autoplay: bool) -> Result<LoadRequest> {
        self.engine.load_tracks_with(
            url,
            vec![TrackDescriptor::new(SOURCE_KEY, url, SOURCE_KEY)],
            LoadOptions { autoplay },
        )
    }

    pub fn wait_until_settled(&self, timeout: Duration) -> LoadOutcome {
        self.engine.wait_until_settled(timeout)
    }

    pub fn stop(&self) -> CommandOutcome {
        self.engine.stop()
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn progress_percent(&self) -> f64 {
        self.engine.progress_percent()
    }

    pub fn dispose(&self) {
        self.engine.dispose();
    }
}
