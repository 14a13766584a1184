//! Transport, mixer and lifecycle commands for `StemEngine`.
//!
//! Commands never block on loading. Anything that cannot take effect yet is
//! answered with an [`IgnoreReason`] instead of an error.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{info, warn};

use crate::diagnostics::reporter::{Report, Reporter};
use crate::error::{EngineError, Result};
use crate::playback::mixer::MixerChannel;
use crate::playback::source::TransportSource;
use crate::playback::transport::seconds_to_frames;

use super::{CommandOutcome, IgnoreReason, StemEngine};

impl StemEngine {
    /// Hand the mixing source to the audio output if it is not running yet.
    ///
    /// Called implicitly by [`Self::play`]; exposed so interactive hosts can
    /// open the device up front.
    pub fn activate(&self) -> Result<()> {
        if self.shared.lock().disposed {
            return Err(EngineError::Disposed);
        }
        let mut output = self.output();
        if output.is_active() {
            return Ok(());
        }
        let source = TransportSource::new(
            self.shared.clone(),
            self.settings.block_frames,
            self.settings.sample_rate,
        );
        output.activate(source)?;
        self.shared.set_output_active(true);
        info!("audio output activated");
        Ok(())
    }

    /// Start or resume every ready track from the shared position.
    pub fn play(&self) -> CommandOutcome {
        if let Some(ignored) = self.prepare_play() {
            return ignored;
        }

        let mut session = self.shared.lock();
        // A new batch may have been requested while the output opened.
        if !session.is_ready() {
            return CommandOutcome::Ignored(IgnoreReason::NotReady);
        }
        let outcome = CommandOutcome::changed(session.transport.play());
        if outcome.is_applied() {
            info!(
                "transport playing from {:.3}s",
                session.transport.position_seconds()
            );
        }
        outcome
    }

    /// Checks shared by every command that may start the clock. Opens the
    /// output on first use.
    fn prepare_play(&self) -> Option<CommandOutcome> {
        {
            let session = self.shared.lock();
            if session.disposed {
                return Some(CommandOutcome::Ignored(IgnoreReason::Disposed));
            }
            if !session.is_ready() {
                return Some(CommandOutcome::Ignored(IgnoreReason::NotReady));
            }
        }

        if let Err(err) = self.activate() {
            warn!("play ignored: audio output failed to activate: {}", err);
            return Some(CommandOutcome::Ignored(IgnoreReason::ActivationFailed(
                err.to_string(),
            )));
        }
        None
    }

    /// Freeze every track at the current position.
    pub fn pause(&self) -> CommandOutcome {
        let mut session = self.shared.lock();
        if session.disposed {
            return CommandOutcome::Ignored(IgnoreReason::Disposed);
        }
        let outcome = CommandOutcome::changed(session.transport.pause());
        if outcome.is_applied() {
            info!(
                "transport paused at {:.3}s",
                session.transport.position_seconds()
            );
        }
        outcome
    }

    /// Pause when playing, play otherwise.
    pub fn toggle_play(&self) -> CommandOutcome {
        if !self.is_playing() {
            if let Some(ignored) = self.prepare_play() {
                return ignored;
            }
        }

        let mut session = self.shared.lock();
        if session.disposed {
            return CommandOutcome::Ignored(IgnoreReason::Disposed);
        }
        if !session.is_ready() {
            return CommandOutcome::Ignored(IgnoreReason::NotReady);
        }
        let state = session.transport.toggle();
        info!(
            "transport {:?} at {:.3}s",
            state,
            session.transport.position_seconds()
        );
        CommandOutcome::Applied
    }

    /// Stop and rewind to the start.
    pub fn stop(&self) -> CommandOutcome {
        let mut session = self.shared.lock();
        if session.disposed {
            return CommandOutcome::Ignored(IgnoreReason::Disposed);
        }
        let outcome = CommandOutcome::changed(session.transport.stop());
        if outcome.is_applied() {
            info!("transport stopped");
        }
        outcome
    }

    /// Move the shared position, clamped to the content length. The
    /// transport keeps its playing or paused state.
    pub fn seek(&self, seconds: f64) -> CommandOutcome {
        let mut session = self.shared.lock();
        if session.disposed {
            return CommandOutcome::Ignored(IgnoreReason::Disposed);
        }
        if !session.is_ready() {
            return CommandOutcome::Ignored(IgnoreReason::NotReady);
        }
        let end = session.end_frames();
        let rate = session.transport.sample_rate();
        let before = session.transport.position_frames();
        let state_before = session.transport.state();
        session
            .transport
            .seek_frames(seconds_to_frames(seconds, rate), end);
        CommandOutcome::changed(
            before != session.transport.position_frames()
                || state_before != session.transport.state(),
        )
    }

    /// Set a track's volume in percent (clamped to 0–100).
    pub fn set_volume(&self, key: &str, percent: f32) -> CommandOutcome {
        self.with_channel(key, |channel| channel.set_volume(percent))
    }

    pub fn set_muted(&self, key: &str, muted: bool) -> CommandOutcome {
        self.with_channel(key, |channel| channel.set_muted(muted))
    }

    pub fn set_soloed(&self, key: &str, soloed: bool) -> CommandOutcome {
        self.with_channel(key, |channel| channel.set_soloed(soloed))
    }

    pub fn toggle_mute(&self, key: &str) -> CommandOutcome {
        self.with_channel(key, |channel| {
            let muted = !channel.state().muted;
            channel.set_muted(muted)
        })
    }

    pub fn toggle_solo(&self, key: &str) -> CommandOutcome {
        self.with_channel(key, |channel| {
            let soloed = !channel.state().soloed;
            channel.set_soloed(soloed)
        })
    }

    /// Apply `update` to the mixer channel of `key`.
    ///
    /// Tracks that are still loading accept the change so it is in effect
    /// once their audio arrives; failed tracks have no channel to update.
    fn with_channel<F>(&self, key: &str, update: F) -> CommandOutcome
    where
        F: FnOnce(&mut MixerChannel) -> bool,
    {
        let mut session = self.shared.lock();
        if session.disposed {
            return CommandOutcome::Ignored(IgnoreReason::Disposed);
        }
        let Some(track) = session
            .batch
            .as_mut()
            .and_then(|batch| batch.track_mut(key))
        else {
            return CommandOutcome::Ignored(IgnoreReason::UnknownTrack);
        };
        if track.status().is_failed() {
            return CommandOutcome::Ignored(IgnoreReason::TrackUnavailable);
        }
        CommandOutcome::changed(update(track.channel_mut()))
    }

    /// Call `callback` with a [`Report`] whenever the engine state changes,
    /// polling every `interval`. Replaces any previous reporter.
    pub fn set_reporting(
        &self,
        callback: Arc<Mutex<dyn Fn(Report) + Send>>,
        interval: Duration,
    ) {
        let reporter = Reporter::new(self.shared.clone(), callback, interval);
        reporter.start();
        let previous = self
            .reporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(reporter);
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    /// Stop playback, cancel loads, release every track and close the
    /// output. Safe to call more than once.
    pub fn dispose(&self) {
        let reporter = self
            .reporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reporter) = reporter {
            reporter.stop();
        }

        let released = {
            let mut session = self.shared.lock();
            if session.disposed {
                false
            } else {
                session.disposed = true;
                session.transport.stop();
                if let Some(mut batch) = session.batch.take() {
                    batch.dispose();
                }
                true
            }
        };

        self.shared.set_output_active(false);
        self.output().shutdown();
        self.shared.notify();
        if released {
            info!("stem engine disposed");
        }
    }
}
