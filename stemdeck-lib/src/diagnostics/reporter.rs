//! Periodic engine state reporter for UI updates.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::JoinHandle,
    time::Duration,
};

use crate::playback::engine::session::Shared;
use crate::playback::engine::EngineStatus;

/// Snapshot of engine state sent to UI consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub batch_id: Option<String>,
    pub status: EngineStatus,
    pub is_ready: bool,
    pub is_playing: bool,
    pub position: f64,
    pub duration: f64,
    pub progress_percent: f64,
}

pub type ReportCallback = Arc<Mutex<dyn Fn(Report) + Send>>;

/// Background reporter that polls the engine at a fixed interval and calls
/// back only when the report changed.
#[derive(Clone)]
pub struct Reporter {
    shared: Arc<Shared>,
    report: ReportCallback,
    interval: Duration,
    finish: Arc<AtomicBool>,
    thread_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Reporter {
    pub(crate) fn new(shared: Arc<Shared>, report: ReportCallback, interval: Duration) -> Self {
        Self {
            shared,
            report,
            interval,
            finish: Arc::new(AtomicBool::new(false)),
            thread_handle: Arc::new(Mutex::new(None)),
        }
    }

    fn current(&self) -> Report {
        let session = self.shared.lock();
        let snapshot = session.snapshot();
        Report {
            batch_id: snapshot.batch_id,
            status: snapshot.status,
            is_ready: snapshot.is_ready,
            is_playing: snapshot.is_playing,
            position: snapshot.position,
            duration: snapshot.duration,
            progress_percent: snapshot.progress_percent,
        }
    }

    fn run(&self) {
        let mut last_report: Option<Report> = None;

        loop {
            let report = self.current();
            if last_report.as_ref() != Some(&report) {
                let callback = self.report.lock().unwrap_or_else(PoisonError::into_inner);
                (*callback)(report.clone());
                last_report = Some(report);
            }

            if self.finish.load(Ordering::Relaxed) {
                break;
            }

            std::thread::sleep(self.interval);
        }
    }

    /// Start the background reporting thread.
    pub fn start(&self) {
        self.stop();
        self.finish.store(false, Ordering::Relaxed);
        let this = self.clone();
        let spawned = std::thread::Builder::new()
            .name("stem-reporter".to_string())
            .spawn(move || this.run());
        match spawned {
            Ok(handle) => {
                *self
                    .thread_handle
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(handle);
            }
            Err(err) => log::warn!("failed to start reporter thread: {}", err),
        }
    }

    /// Stop the background reporting thread.
    pub fn stop(&self) {
        self.finish.store(true, Ordering::Relaxed);
        let handle = self
            .thread_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == std::thread::current().id() {
                log::warn!("reporter stop called from reporter thread; skipping join");
            } else if handle.join().is_err() {
                log::warn!("reporter thread panicked during join");
            }
        }
    }
}
