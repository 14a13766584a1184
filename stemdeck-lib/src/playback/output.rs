//! Audio output backends.
//!
//! The engine hands its [`TransportSource`] to an [`AudioOutput`] the first
//! time playback is requested. [`RodioOutput`] plays it on the default
//! device; [`HeadlessOutput`] lets the caller pull samples directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::config::EngineSettings;
use crate::error::{EngineError, Result};

use super::source::TransportSource;

/// Something that can consume the engine's mixed output.
pub trait AudioOutput: Send {
    /// Start consuming `source`. Called at most once per successful
    /// activation; a failed activation may be retried with a new source.
    fn activate(&mut self, source: TransportSource) -> Result<()>;

    fn is_active(&self) -> bool;

    /// Stop consuming and release the device. Safe to call repeatedly.
    fn shutdown(&mut self);
}

/// Marks the output thread alive for as long as it runs.
struct AliveGuard {
    alive: Arc<AtomicBool>,
}

impl AliveGuard {
    fn new(alive: Arc<AtomicBool>) -> Self {
        alive.store(true, Ordering::SeqCst);
        Self { alive }
    }
}

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

struct OutputWorker {
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<()>,
    alive: Arc<AtomicBool>,
}

/// Plays through the default device.
///
/// The rodio stream is not `Send`, so it lives on a dedicated thread that
/// parks until shutdown.
pub struct RodioOutput {
    retries: usize,
    retry_delay: Duration,
    worker: Option<OutputWorker>,
}

impl RodioOutput {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            retries: settings.output_open_retries.max(1),
            retry_delay: Duration::from_millis(settings.output_open_retry_ms),
            worker: None,
        }
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown.send(());
            if worker.handle.join().is_err() {
                warn!("audio output thread panicked during join");
            }
        }
    }
}

impl AudioOutput for RodioOutput {
    fn activate(&mut self, source: TransportSource) -> Result<()> {
        if self.is_active() {
            return Ok(());
        }
        self.join_worker();

        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<(), String>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let alive = Arc::new(AtomicBool::new(false));
        let thread_alive = alive.clone();
        let retries = self.retries;
        let retry_delay = self.retry_delay;

        let handle = thread::Builder::new()
            .name("stem-output".to_string())
            .spawn(move || {
                let _guard = AliveGuard::new(thread_alive);
                let stream = match open_output_stream_with_retry(retries, retry_delay) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let sink = Sink::connect_new(stream.mixer());
                sink.append(source);
                sink.play();
                let _ = ready_tx.send(Ok(()));

                // Either an explicit shutdown or a dropped sender ends playback.
                let _ = shutdown_rx.recv();
                sink.stop();
                info!("audio output closed");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("audio output opened");
                self.worker = Some(OutputWorker {
                    shutdown: shutdown_tx,
                    handle,
                    alive,
                });
                Ok(())
            }
            Ok(Err(reason)) => {
                let _ = handle.join();
                Err(EngineError::Output(reason))
            }
            Err(_) => {
                let _ = handle.join();
                Err(EngineError::Output(
                    "audio output thread exited before opening a stream".to_string(),
                ))
            }
        }
    }

    fn is_active(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| worker.alive.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn shutdown(&mut self) {
        self.join_worker();
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.join_worker();
    }
}

fn open_output_stream_with_retry(
    retries: usize,
    delay: Duration,
) -> std::result::Result<OutputStream, String> {
    let mut last_error = String::from("no attempts made");
    for attempt in 1..=retries {
        match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                last_error = err.to_string();
                if attempt < retries {
                    warn!(
                        "open_default_stream attempt {}/{} failed: {}",
                        attempt, retries, err
                    );
                    thread::sleep(delay);
                }
            }
        }
    }
    error!(
        "failed to open default output stream after {} attempts: {}",
        retries, last_error
    );
    Err(last_error)
}

/// Caller-driven output. Each pull renders samples through the transport,
/// so the clock advances exactly as far as the caller reads.
#[derive(Clone, Default)]
pub struct HeadlessPump {
    source: Arc<Mutex<Option<TransportSource>>>,
}

impl HeadlessPump {
    pub fn is_attached(&self) -> bool {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Pull up to `count` interleaved samples. Returns fewer when the source
    /// has ended and nothing when no source is attached.
    pub fn pull(&self, count: usize) -> Vec<f32> {
        let mut slot = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(source) => source.by_ref().take(count).collect(),
            None => Vec::new(),
        }
    }

    /// Pull `frames` stereo frames.
    pub fn pull_frames(&self, frames: usize) -> Vec<f32> {
        self.pull(frames * 2)
    }
}

/// Output without a device, driven through its [`HeadlessPump`].
#[derive(Default)]
pub struct HeadlessOutput {
    pump: HeadlessPump,
}

impl HeadlessOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pump(&self) -> HeadlessPump {
        self.pump.clone()
    }
}

impl AudioOutput for HeadlessOutput {
    fn activate(&mut self, source: TransportSource) -> Result<()> {
        let mut slot = self.pump.source.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(source);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.pump.is_attached()
    }

    fn shutdown(&mut self) {
        self.pump
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
