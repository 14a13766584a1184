//! State shared between the engine handle, loader threads, the mixing source
//! and the reporter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};

use crate::audio::TrackAudio;
use crate::error::Result;
use crate::playback::mixer;
use crate::playback::transport::{frames_to_seconds, Span, Transport};

use super::batch::Batch;
use super::state::{EngineSnapshot, EngineStatus, LoadOutcome, TrackSnapshot};

/// Everything guarded by the engine lock.
#[derive(Debug)]
pub(crate) struct Session {
    /// Bumped for every accepted load; results tagged with an older value
    /// are discarded.
    pub(crate) generation: u64,
    pub(crate) batch: Option<Batch>,
    pub(crate) transport: Transport,
    pub(crate) disposed: bool,
}

impl Session {
    fn new(sample_rate: u32) -> Self {
        Self {
            generation: 0,
            batch: None,
            transport: Transport::new(sample_rate),
            disposed: false,
        }
    }

    pub(crate) fn status(&self) -> EngineStatus {
        if self.disposed {
            return EngineStatus::Idle;
        }
        self.batch
            .as_ref()
            .map(Batch::status)
            .unwrap_or(EngineStatus::Idle)
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.status().is_ready()
    }

    pub(crate) fn end_frames(&self) -> u64 {
        self.batch.as_ref().map(Batch::end_frames).unwrap_or(0)
    }

    pub(crate) fn duration(&self) -> f64 {
        frames_to_seconds(self.end_frames(), self.transport.sample_rate())
    }

    pub(crate) fn progress_percent(&self) -> f64 {
        let end = self.end_frames();
        if end == 0 {
            return 0.0;
        }
        (self.transport.position_frames() as f64 / end as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub(crate) fn outcome(&self) -> LoadOutcome {
        match (&self.batch, self.disposed) {
            (Some(batch), false) => batch.outcome(),
            _ => LoadOutcome {
                batch_id: None,
                status: EngineStatus::Idle,
                ready: Vec::new(),
                failed: Vec::new(),
                pending: Vec::new(),
            },
        }
    }

    /// Per-track playhead in seconds. Every ready track reads the shared
    /// cursor, clamped to its own length.
    pub(crate) fn track_positions(&self) -> Vec<(String, f64)> {
        let Some(batch) = &self.batch else {
            return Vec::new();
        };
        let position = self.transport.position_frames();
        let rate = self.transport.sample_rate();
        batch
            .tracks()
            .iter()
            .filter(|track| track.audio().is_some())
            .map(|track| {
                let frame = position.min(track.frames());
                (track.key().to_string(), frames_to_seconds(frame, rate))
            })
            .collect()
    }

    pub(crate) fn snapshot(&self) -> EngineSnapshot {
        let rate = self.transport.sample_rate();
        let tracks = match &self.batch {
            Some(batch) if !self.disposed => batch
                .tracks()
                .iter()
                .map(|track| TrackSnapshot {
                    key: track.key().to_string(),
                    name: track.descriptor.name.clone(),
                    status: track.status().clone(),
                    mixer: track.channel().state(),
                    audible: batch.is_audible(track),
                    duration: frames_to_seconds(track.frames(), rate),
                })
                .collect(),
            _ => Vec::new(),
        };
        let status = self.status();
        EngineSnapshot {
            batch_id: self
                .batch
                .as_ref()
                .filter(|_| !self.disposed)
                .map(|batch| batch.id.clone()),
            status,
            is_ready: status.is_ready(),
            is_playing: self.transport.is_playing(),
            transport: self.transport.state(),
            position: self.transport.position_seconds(),
            duration: self.duration(),
            progress_percent: self.progress_percent(),
            tracks,
        }
    }
}

/// What the mixing source should render next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockPlan {
    /// The transport is not running; emit silence.
    Silence,
    Span(Span),
    /// The engine is gone; the source should end.
    Disposed,
}

#[derive(Debug)]
pub(crate) struct Shared {
    session: Mutex<Session>,
    settled: Condvar,
    output_active: AtomicBool,
}

impl Shared {
    pub(crate) fn new(sample_rate: u32) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(Session::new(sample_rate)),
            settled: Condvar::new(),
            output_active: AtomicBool::new(false),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify(&self) {
        self.settled.notify_all();
    }

    pub(crate) fn set_output_active(&self, active: bool) {
        self.output_active.store(active, Ordering::SeqCst);
    }

    pub(crate) fn output_active(&self) -> bool {
        self.output_active.load(Ordering::SeqCst)
    }

    /// Block until the current batch settles, the engine is disposed or
    /// `timeout` elapses.
    pub(crate) fn wait_until_settled(&self, timeout: Duration) -> LoadOutcome {
        let session = self.lock();
        let (session, _) = self
            .settled
            .wait_timeout_while(session, timeout, |session| {
                !session.disposed
                    && session
                        .batch
                        .as_ref()
                        .map(|batch| !batch.is_settled())
                        .unwrap_or(false)
            })
            .unwrap_or_else(PoisonError::into_inner);
        session.outcome()
    }

    /// Record a finished load. Results from a superseded generation are
    /// dropped, which releases their decoded audio.
    pub(crate) fn apply_settled(&self, generation: u64, key: String, result: Result<TrackAudio>) {
        {
            let mut guard = self.lock();
            let Session {
                batch, transport, ..
            } = &mut *guard;
            let batch = match batch.as_mut() {
                Some(batch) if batch.generation == generation && !batch.is_disposed() => batch,
                _ => {
                    debug!(
                        "discarding stale load result: key={} generation={}",
                        key, generation
                    );
                    return;
                }
            };

            let Some(track) = batch.track_mut(&key) else {
                warn!("load result for unknown track: key={}", key);
                return;
            };
            match result {
                Ok(audio) => track.attach(audio),
                Err(err) => track.fail(err.to_string()),
            }

            if batch.is_settled() {
                let status = batch.status();
                let outcome = batch.outcome();
                info!(
                    "batch settled: id={} status={:?} ready={} failed={}",
                    batch.id,
                    status,
                    outcome.ready.len(),
                    outcome.failed.len()
                );
                if batch.autoplay && status.is_ready() && self.output_active() {
                    if transport.play() {
                        info!("autoplay started: id={}", batch.id);
                    }
                }
            }
        }
        self.notify();
    }

    /// Advance the clock by one block and collect the gain of every
    /// contributing track into `inputs`.
    pub(crate) fn plan_block(
        &self,
        frames: u64,
        inputs: &mut Vec<(Arc<TrackAudio>, f32)>,
    ) -> BlockPlan {
        inputs.clear();
        let mut guard = self.lock();
        if guard.disposed {
            return BlockPlan::Disposed;
        }
        let end = guard.end_frames();
        let Session {
            batch, transport, ..
        } = &mut *guard;
        let Some(span) = transport.advance(frames, end) else {
            return BlockPlan::Silence;
        };
        if span.finished {
            info!("end of content reached; transport stopped");
        }

        if let Some(batch) = batch.as_ref() {
            let solo = batch.solo_active();
            for track in batch.tracks() {
                let Some(audio) = track.audio() else {
                    continue;
                };
                let gain = mixer::effective_gain(&track.channel().state(), solo);
                if gain > 0.0 {
                    inputs.push((audio.clone(), gain));
                }
            }
        }
        BlockPlan::Span(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::track::TrackDescriptor;

    fn shared_with_batch(generation: u64, keys: &[&str]) -> Arc<Shared> {
        let shared = Shared::new(1_000);
        {
            let mut session = shared.lock();
            session.generation = generation;
            session.batch = Some(Batch::new(
                "b".to_string(),
                generation,
                keys.iter()
                    .map(|key| TrackDescriptor::new(*key, "x.wav", *key))
                    .collect(),
                false,
            ));
        }
        shared
    }

    #[test]
    fn stale_results_are_discarded() {
        let shared = shared_with_batch(2, &["a"]);
        shared.apply_settled(1, "a".to_string(), Ok(TrackAudio::from_stereo(vec![0.0; 20], 1_000)));
        assert_eq!(shared.lock().status(), EngineStatus::Loading);

        shared.apply_settled(2, "a".to_string(), Err(EngineError::Fetch("404".to_string())));
        assert_eq!(shared.lock().status(), EngineStatus::Failed);
        assert!(shared.lock().is_ready());
    }

    #[test]
    fn silent_while_stopped_and_spans_while_playing() {
        let shared = shared_with_batch(1, &["a"]);
        shared.apply_settled(1, "a".to_string(), Ok(TrackAudio::from_stereo(vec![0.5; 200], 1_000)));
        let mut inputs = Vec::new();

        assert_eq!(shared.plan_block(32, &mut inputs), BlockPlan::Silence);

        shared.lock().transport.play();
        match shared.plan_block(32, &mut inputs) {
            BlockPlan::Span(span) => {
                assert_eq!(span.start, 0);
                assert_eq!(span.frames, 32);
            }
            other => panic!("unexpected plan: {:?}", other),
        }
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].1, 1.0);
    }

    #[test]
    fn muted_tracks_are_left_out_of_the_block() {
        let shared = shared_with_batch(1, &["a", "b"]);
        for key in ["a", "b"] {
            shared.apply_settled(1, key.to_string(), Ok(TrackAudio::from_stereo(vec![0.5; 200], 1_000)));
        }
        {
            let mut session = shared.lock();
            session
                .batch
                .as_mut()
                .unwrap()
                .track_mut("b")
                .unwrap()
                .channel_mut()
                .set_muted(true);
            session.transport.play();
        }
        let mut inputs = Vec::new();
        shared.plan_block(16, &mut inputs);
        assert_eq!(inputs.len(), 1);
    }

    #[test]
    fn disposed_session_ends_the_source() {
        let shared = Shared::new(1_000);
        shared.lock().disposed = true;
        let mut inputs = Vec::new();
        assert_eq!(shared.plan_block(16, &mut inputs), BlockPlan::Disposed);
    }

    #[test]
    fn waiting_without_a_batch_returns_idle() {
        let shared = Shared::new(1_000);
        let outcome = shared.wait_until_settled(Duration::from_millis(10));
        assert_eq!(outcome.status, EngineStatus::Idle);
        assert!(outcome.batch_id.is_none());
    }
}
