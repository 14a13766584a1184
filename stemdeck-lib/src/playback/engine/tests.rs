use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::EngineSettings;
use crate::error::{EngineError, Result};
use crate::playback::mixer::MixerState;
use crate::playback::output::{AudioOutput, HeadlessOutput, HeadlessPump};
use crate::playback::source::TransportSource;
use crate::playback::transport::TransportState;
use crate::test_support::write_mono_wav;
use crate::track::{TrackDescriptor, TrackStatus};

use super::*;

const RATE: u32 = 8_000;
const BLOCK: usize = 512;
const SETTLE: Duration = Duration::from_secs(10);

fn settings() -> EngineSettings {
    EngineSettings::default()
        .with_sample_rate(RATE)
        .with_block_frames(BLOCK)
        .with_fetch_timeout_ms(400)
}

fn headless_engine() -> (StemEngine, HeadlessPump) {
    let output = HeadlessOutput::new();
    let pump = output.pump();
    (StemEngine::with_output(settings(), Box::new(output)), pump)
}

fn constant_track(dir: &Path, key: &str, value: f32, frames: usize) -> TrackDescriptor {
    let path = write_mono_wav(dir, &format!("{}.wav", key), RATE, frames, |_| value);
    TrackDescriptor::new(key, path.to_str().unwrap(), key)
}

fn impulse_track(dir: &Path, key: &str, at: usize, value: f32, frames: usize) -> TrackDescriptor {
    let path = write_mono_wav(dir, &format!("{}.wav", key), RATE, frames, |frame| {
        if frame == at {
            value
        } else {
            0.0
        }
    });
    TrackDescriptor::new(key, path.to_str().unwrap(), key)
}

fn missing_track(dir: &Path, key: &str) -> TrackDescriptor {
    let path = dir.join(format!("{}-missing.wav", key));
    TrackDescriptor::new(key, path.to_str().unwrap(), key)
}

/// A URL whose server accepts the connection and never answers, keeping the
/// track in the loading state until the fetch timeout.
fn stalled_track(listener: &TcpListener, key: &str) -> TrackDescriptor {
    let address = listener.local_addr().unwrap();
    TrackDescriptor::new(key, format!("http://{}/{}.wav", address, key), key)
}

fn left_channel(samples: &[f32]) -> Vec<f32> {
    samples.iter().step_by(2).copied().collect()
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {} got {}",
        expected,
        actual
    );
}

#[test]
fn batch_is_ready_once_every_track_settles() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _pump) = headless_engine();
    let tracks = vec![
        constant_track(dir.path(), "vocals", 0.5, 8_000),
        constant_track(dir.path(), "drums", 0.25, 4_000),
    ];

    let request = engine.load_tracks("song-1", tracks).unwrap();
    assert!(matches!(request, LoadRequest::Started { .. }));

    let outcome = engine.wait_until_settled(SETTLE);
    assert_eq!(outcome.status, EngineStatus::Ready);
    assert_eq!(outcome.ready.len(), 2);
    assert!(outcome.failed.is_empty());
    assert!(engine.is_ready());
    assert_eq!(engine.track_status("vocals"), Some(TrackStatus::Ready));
    assert!((engine.duration() - 1.0).abs() < 1e-9);
}

#[test]
fn partial_failure_still_allows_playback() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    engine
        .load_tracks(
            "song-1",
            vec![
                constant_track(dir.path(), "bass", 0.5, 2_000),
                missing_track(dir.path(), "keys"),
            ],
        )
        .unwrap();

    let outcome = engine.wait_until_settled(SETTLE);
    assert!(outcome.is_ready());
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].key, "keys");
    assert!(engine.track_status("keys").unwrap().is_failed());

    assert_eq!(engine.play(), CommandOutcome::Applied);
    let mixed = pump.pull_frames(BLOCK);
    assert_close(mixed[0], 0.5);
}

#[test]
fn all_failed_batch_is_ready_with_nothing_to_play() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    engine
        .load_tracks(
            "broken",
            vec![
                missing_track(dir.path(), "a"),
                TrackDescriptor::new("b", "", "b"),
            ],
        )
        .unwrap();

    let outcome = engine.wait_until_settled(SETTLE);
    assert_eq!(outcome.status, EngineStatus::Failed);
    assert!(outcome.is_ready());
    assert!(outcome.all_failed());
    assert_eq!(outcome.failed.len(), 2);
    assert!(engine.is_ready());
    assert!(engine.snapshot().is_ready);
    assert_eq!(engine.duration(), 0.0);

    assert_eq!(engine.play(), CommandOutcome::Applied);
    let mixed = pump.pull_frames(BLOCK);
    assert!(mixed.iter().all(|sample| *sample == 0.0));
    assert!(!engine.is_playing());
    assert_eq!(
        engine.set_muted("a", true),
        CommandOutcome::Ignored(IgnoreReason::TrackUnavailable)
    );
}

#[test]
fn empty_batch_is_ready_immediately() {
    let (engine, _pump) = headless_engine();
    engine.load_tracks("nothing", Vec::new()).unwrap();
    assert!(engine.is_ready());
    assert_eq!(engine.wait_until_settled(SETTLE).status, EngineStatus::Ready);
    assert_eq!(engine.duration(), 0.0);
}

#[test]
fn duplicate_keys_are_rejected_without_touching_the_current_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _pump) = headless_engine();
    engine
        .load_tracks("song-1", vec![constant_track(dir.path(), "a", 0.5, 800)])
        .unwrap();
    engine.wait_until_settled(SETTLE);

    let duplicate = vec![
        constant_track(dir.path(), "x", 0.5, 800),
        constant_track(dir.path(), "x", 0.5, 800),
    ];
    match engine.load_tracks("song-2", duplicate) {
        Err(EngineError::DuplicateKey(key)) => assert_eq!(key, "x"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(engine.snapshot().batch_id.as_deref(), Some("song-1"));
    assert!(engine.is_ready());
}

#[test]
fn commands_before_ready_are_ignored() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let (engine, pump) = headless_engine();

    assert_eq!(
        engine.play(),
        CommandOutcome::Ignored(IgnoreReason::NotReady)
    );

    engine
        .load_tracks("slow", vec![stalled_track(&listener, "pad")])
        .unwrap();
    assert_eq!(engine.status(), EngineStatus::Loading);
    assert_eq!(
        engine.play(),
        CommandOutcome::Ignored(IgnoreReason::NotReady)
    );
    assert_eq!(
        engine.seek(1.0),
        CommandOutcome::Ignored(IgnoreReason::NotReady)
    );
    assert!(!engine.is_playing());
    assert!(!pump.is_attached());

    // Mixer changes on a loading track are kept.
    assert_eq!(engine.set_volume("pad", 30.0), CommandOutcome::Applied);
    assert_eq!(engine.mixer_state("pad").unwrap().volume_percent, 30.0);

    let outcome = engine.wait_until_settled(SETTLE);
    assert_eq!(outcome.status, EngineStatus::Failed);
}

#[test]
fn same_batch_id_is_skipped_only_once_settled_and_healthy() {
    let dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let (engine, _pump) = headless_engine();
    let good = vec![constant_track(dir.path(), "a", 0.5, 800)];

    engine.load_tracks("song-1", good.clone()).unwrap();
    engine.wait_until_settled(SETTLE);
    assert_eq!(
        engine.load_tracks("song-1", good).unwrap(),
        LoadRequest::Skipped
    );

    let slow = vec![stalled_track(&listener, "pad")];
    let first = engine.load_tracks("slow", slow.clone()).unwrap();
    assert_eq!(engine.status(), EngineStatus::Loading);
    let again = engine.load_tracks("slow", slow).unwrap();
    match (first, again) {
        (LoadRequest::Started { generation: a }, LoadRequest::Started { generation: b }) => {
            assert!(b > a)
        }
        other => panic!("unexpected requests: {:?}", other),
    }

    engine
        .load_tracks("song-2", vec![missing_track(dir.path(), "b")])
        .unwrap();
    engine.wait_until_settled(SETTLE);
    let retry = engine
        .load_tracks("song-2", vec![missing_track(dir.path(), "b")])
        .unwrap();
    assert!(matches!(retry, LoadRequest::Started { .. }));
}

#[test]
fn superseded_batch_results_are_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let (engine, _pump) = headless_engine();

    engine
        .load_tracks("old", vec![stalled_track(&listener, "old-pad")])
        .unwrap();
    engine
        .load_tracks("new", vec![constant_track(dir.path(), "lead", 0.5, 800)])
        .unwrap();
    assert!(engine.wait_until_settled(SETTLE).is_ready());

    // Give the stalled fetch time to time out and report back.
    thread::sleep(Duration::from_millis(900));

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.batch_id.as_deref(), Some("new"));
    assert_eq!(snapshot.status, EngineStatus::Ready);
    assert_eq!(snapshot.tracks.len(), 1);
    assert_eq!(snapshot.tracks[0].key, "lead");
    assert_eq!(engine.track_status("old-pad"), None);
}

#[test]
fn superseded_batch_drops_its_download() {
    let dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let sent = Arc::new(AtomicUsize::new(0));
    let (closed_sender, closed) = mpsc::channel();

    // Serves an endless body a few KiB at a time until the client hangs up.
    let server_sent = sent.clone();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 2048];
        let _ = stream.read(&mut request);
        let header = "HTTP/1.1 200 OK\r\nContent-Type: audio/wav\r\nContent-Length: 536870912\r\n\r\n";
        if stream.write_all(header.as_bytes()).is_err() {
            return;
        }
        let chunk = [0u8; 4096];
        for _ in 0..6_000 {
            if stream.write_all(&chunk).is_err() {
                let _ = closed_sender.send(server_sent.load(Ordering::SeqCst));
                return;
            }
            server_sent.fetch_add(chunk.len(), Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
        }
    });

    let engine = StemEngine::with_output(
        settings().with_fetch_timeout_ms(60_000),
        Box::new(HeadlessOutput::new()),
    );
    engine
        .load_tracks(
            "old",
            vec![TrackDescriptor::new(
                "pad",
                format!("http://{}/pad.wav", address),
                "pad",
            )],
        )
        .unwrap();
    for _ in 0..500 {
        if sent.load(Ordering::SeqCst) >= 64 * 1024 {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(sent.load(Ordering::SeqCst) > 0);
    assert_eq!(engine.status(), EngineStatus::Loading);

    engine
        .load_tracks("new", vec![constant_track(dir.path(), "lead", 0.5, 800)])
        .unwrap();
    assert!(engine.wait_until_settled(SETTLE).is_ready());

    let at_close = closed
        .recv_timeout(Duration::from_secs(5))
        .expect("old download kept streaming");
    assert!(at_close < 536_870_912);
    assert_eq!(engine.snapshot().batch_id.as_deref(), Some("new"));
}

#[test]
fn tracks_stay_aligned_across_pause_and_resume() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    let impulse_at = 3_000;
    engine
        .load_tracks(
            "sync",
            vec![
                impulse_track(dir.path(), "a", impulse_at, 0.5, 8_000),
                impulse_track(dir.path(), "b", impulse_at, 0.25, 6_000),
            ],
        )
        .unwrap();
    engine.wait_until_settled(SETTLE);

    let mut heard = Vec::new();
    assert!(engine.play().is_applied());
    heard.extend(left_channel(&pump.pull_frames(BLOCK * 2)));

    assert!(engine.pause().is_applied());
    let positions = engine.track_positions();
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].1, positions[1].1);
    let paused = pump.pull_frames(BLOCK * 3);
    assert!(paused.iter().all(|sample| *sample == 0.0));
    assert_eq!(engine.track_positions(), positions);

    assert!(engine.play().is_applied());
    heard.extend(left_channel(&pump.pull_frames(BLOCK * 6)));

    let peaks: Vec<(usize, f32)> = heard
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, sample)| sample.abs() > 1e-4)
        .collect();
    assert_eq!(peaks.len(), 1, "impulses drifted apart: {:?}", peaks);
    assert_eq!(peaks[0].0, impulse_at);
    assert_close(peaks[0].1, 0.75);
}

#[test]
fn pause_freezes_the_clock_and_play_resumes_it() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    engine
        .load_tracks("song", vec![constant_track(dir.path(), "a", 0.5, 8_000)])
        .unwrap();
    engine.wait_until_settled(SETTLE);

    engine.play();
    pump.pull_frames(BLOCK * 2);
    engine.pause();
    let frozen = engine.position();
    assert!((frozen - (BLOCK * 2) as f64 / RATE as f64).abs() < 1e-9);
    assert_eq!(engine.transport_state(), TransportState::Paused);

    pump.pull_frames(BLOCK * 4);
    assert_eq!(engine.position(), frozen);
    assert_eq!(
        engine.pause(),
        CommandOutcome::Ignored(IgnoreReason::Unchanged)
    );

    engine.play();
    pump.pull_frames(BLOCK);
    assert!((engine.position() - (BLOCK * 3) as f64 / RATE as f64).abs() < 1e-9);
    assert!(engine.progress_percent() > 0.0);
}

#[test]
fn reaching_the_end_stops_and_rewinds() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    engine
        .load_tracks("short", vec![constant_track(dir.path(), "a", 0.5, 1_000)])
        .unwrap();
    engine.wait_until_settled(SETTLE);

    engine.play();
    pump.pull_frames(BLOCK);
    assert!(engine.is_playing());

    let tail = left_channel(&pump.pull_frames(BLOCK));
    assert!(!engine.is_playing());
    assert_eq!(engine.transport_state(), TransportState::Stopped);
    assert_eq!(engine.position(), 0.0);
    assert_close(tail[1_000 - BLOCK - 1], 0.5);
    assert_eq!(tail[1_000 - BLOCK], 0.0);
}

#[test]
fn stop_and_seek_move_the_shared_position() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    engine
        .load_tracks("song", vec![constant_track(dir.path(), "a", 0.5, 16_000)])
        .unwrap();
    engine.wait_until_settled(SETTLE);

    assert_eq!(engine.seek(0.5), CommandOutcome::Applied);
    assert_eq!(engine.transport_state(), TransportState::Paused);
    assert_eq!(engine.position(), 0.5);

    assert_eq!(engine.seek(60.0), CommandOutcome::Applied);
    assert_eq!(engine.position(), 2.0);
    assert_eq!(engine.progress_percent(), 100.0);

    engine.seek(1.0);
    engine.play();
    pump.pull_frames(BLOCK);
    assert!(engine.is_playing());

    assert_eq!(engine.stop(), CommandOutcome::Applied);
    assert_eq!(engine.position(), 0.0);
    assert_eq!(
        engine.stop(),
        CommandOutcome::Ignored(IgnoreReason::Unchanged)
    );
}

#[test]
fn mute_solo_and_volume_shape_the_mix() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    engine
        .load_tracks(
            "mix",
            vec![
                constant_track(dir.path(), "a", 0.5, 16_000),
                constant_track(dir.path(), "b", 0.25, 16_000),
            ],
        )
        .unwrap();
    engine.wait_until_settled(SETTLE);
    engine.play();

    let next_level = || left_channel(&pump.pull_frames(BLOCK))[0];
    assert_close(next_level(), 0.75);

    engine.set_muted("a", true);
    assert_close(next_level(), 0.25);

    // Solo on a muted track silences everything else.
    engine.set_soloed("a", true);
    assert_close(next_level(), 0.0);

    engine.set_muted("a", false);
    assert_close(next_level(), 0.5);

    engine.set_soloed("b", true);
    assert_close(next_level(), 0.75);

    engine.set_soloed("a", false);
    engine.set_soloed("b", false);
    engine.set_volume("a", 50.0);
    assert_close(next_level(), 0.5);

    engine.set_volume("b", 0.0);
    assert_close(next_level(), 0.25);
}

#[test]
fn mixer_commands_report_why_they_were_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _pump) = headless_engine();
    assert_eq!(
        engine.set_muted("a", true),
        CommandOutcome::Ignored(IgnoreReason::UnknownTrack)
    );

    engine
        .load_tracks(
            "song",
            vec![
                constant_track(dir.path(), "a", 0.5, 800),
                missing_track(dir.path(), "b"),
            ],
        )
        .unwrap();
    engine.wait_until_settled(SETTLE);

    assert_eq!(
        engine.set_muted("zzz", true),
        CommandOutcome::Ignored(IgnoreReason::UnknownTrack)
    );
    assert_eq!(
        engine.toggle_solo("b"),
        CommandOutcome::Ignored(IgnoreReason::TrackUnavailable)
    );
    assert_eq!(engine.mixer_state("b"), None);

    assert_eq!(engine.toggle_mute("a"), CommandOutcome::Applied);
    assert!(engine.mixer_state("a").unwrap().muted);
    assert_eq!(
        engine.set_muted("a", true),
        CommandOutcome::Ignored(IgnoreReason::Unchanged)
    );
    assert_eq!(engine.toggle_mute("a"), CommandOutcome::Applied);
    assert!(!engine.mixer_state("a").unwrap().muted);
}

#[test]
fn reload_resets_mixer_state() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _pump) = headless_engine();
    engine
        .load_tracks("one", vec![constant_track(dir.path(), "a", 0.5, 800)])
        .unwrap();
    engine.wait_until_settled(SETTLE);
    engine.set_volume("a", 10.0);
    engine.set_soloed("a", true);

    engine
        .load_tracks("two", vec![constant_track(dir.path(), "a", 0.5, 800)])
        .unwrap();
    engine.wait_until_settled(SETTLE);
    assert_eq!(engine.mixer_state("a"), Some(MixerState::default()));
}

#[test]
fn loading_a_new_batch_stops_playback() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    engine
        .load_tracks("one", vec![constant_track(dir.path(), "a", 0.5, 8_000)])
        .unwrap();
    engine.wait_until_settled(SETTLE);
    engine.play();
    pump.pull_frames(BLOCK);

    engine
        .load_tracks("two", vec![constant_track(dir.path(), "b", 0.25, 8_000)])
        .unwrap();
    assert!(!engine.is_playing());
    assert_eq!(engine.position(), 0.0);
    engine.wait_until_settled(SETTLE);
    assert!(!engine.is_playing());
}

#[test]
fn autoplay_starts_once_ready_when_output_is_active() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    engine.activate().unwrap();
    assert!(pump.is_attached());

    engine
        .load_tracks_with(
            "auto",
            vec![constant_track(dir.path(), "a", 0.5, 8_000)],
            LoadOptions { autoplay: true },
        )
        .unwrap();
    engine.wait_until_settled(SETTLE);
    assert!(engine.is_playing());
}

#[test]
fn autoplay_waits_for_an_active_output() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _pump) = headless_engine();
    engine
        .load_tracks_with(
            "auto",
            vec![constant_track(dir.path(), "a", 0.5, 800)],
            LoadOptions { autoplay: true },
        )
        .unwrap();
    engine.wait_until_settled(SETTLE);
    assert!(!engine.is_playing());
}

#[test]
fn dispose_releases_everything_and_rejects_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    engine
        .load_tracks("song", vec![constant_track(dir.path(), "a", 0.5, 8_000)])
        .unwrap();
    engine.wait_until_settled(SETTLE);
    engine.play();
    pump.pull_frames(BLOCK);

    engine.dispose();
    assert!(!pump.is_attached());
    assert_eq!(engine.status(), EngineStatus::Idle);
    assert!(!engine.is_playing());
    assert!(engine.snapshot().tracks.is_empty());
    assert_eq!(
        engine.play(),
        CommandOutcome::Ignored(IgnoreReason::Disposed)
    );
    assert_eq!(
        engine.set_muted("a", true),
        CommandOutcome::Ignored(IgnoreReason::Disposed)
    );
    assert!(matches!(
        engine.load_tracks("again", Vec::new()),
        Err(EngineError::Disposed)
    ));
    assert!(matches!(engine.activate(), Err(EngineError::Disposed)));

    engine.dispose();
}

/// Fails the first `failures` activations, then behaves like a headless
/// output.
struct FlakyOutput {
    remaining_failures: Arc<AtomicUsize>,
    inner: HeadlessOutput,
}

impl AudioOutput for FlakyOutput {
    fn activate(&mut self, source: TransportSource) -> Result<()> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::Output("device busy".to_string()));
        }
        self.inner.activate(source)
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn shutdown(&mut self) {
        self.inner.shutdown();
    }
}

#[test]
fn failed_activation_is_reported_and_retried_on_next_play() {
    let dir = tempfile::tempdir().unwrap();
    let inner = HeadlessOutput::new();
    let pump = inner.pump();
    let output = FlakyOutput {
        remaining_failures: Arc::new(AtomicUsize::new(1)),
        inner,
    };
    let engine = StemEngine::with_output(settings(), Box::new(output));
    engine
        .load_tracks("song", vec![constant_track(dir.path(), "a", 0.5, 8_000)])
        .unwrap();
    engine.wait_until_settled(SETTLE);

    match engine.play() {
        CommandOutcome::Ignored(IgnoreReason::ActivationFailed(reason)) => {
            assert!(reason.contains("device busy"))
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!engine.is_playing());
    assert!(!pump.is_attached());

    assert_eq!(engine.play(), CommandOutcome::Applied);
    assert!(pump.is_attached());
}

#[test]
fn toggle_play_alternates() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, pump) = headless_engine();
    assert_eq!(
        engine.toggle_play(),
        CommandOutcome::Ignored(IgnoreReason::NotReady)
    );
    engine
        .load_tracks("song", vec![constant_track(dir.path(), "a", 0.5, 800)])
        .unwrap();
    engine.wait_until_settled(SETTLE);

    assert!(engine.toggle_play().is_applied());
    assert!(engine.is_playing());
    assert!(pump.is_attached());
    pump.pull_frames(BLOCK);
    assert!(engine.toggle_play().is_applied());
    assert_eq!(engine.transport_state(), TransportState::Paused);
    let paused_at = engine.position();
    assert!(engine.toggle_play().is_applied());
    assert!(engine.is_playing());
    assert_eq!(engine.position(), paused_at);

    engine.dispose();
    assert!(engine.is_disposed());
    assert_eq!(
        engine.toggle_play(),
        CommandOutcome::Ignored(IgnoreReason::Disposed)
    );
}

#[test]
fn reporting_delivers_state_changes() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _pump) = headless_engine();
    let (sender, receiver) = mpsc::channel();
    let sender = Mutex::new(sender);
    engine.set_reporting(
        Arc::new(Mutex::new(move |report: crate::diagnostics::reporter::Report| {
            let _ = sender.lock().unwrap().send(report);
        })),
        Duration::from_millis(5),
    );

    engine
        .load_tracks("song", vec![constant_track(dir.path(), "a", 0.5, 800)])
        .unwrap();
    engine.wait_until_settled(SETTLE);

    let ready = receiver
        .iter()
        .take(20)
        .find(|report| report.is_ready)
        .expect("no ready report");
    assert_eq!(ready.batch_id.as_deref(), Some("song"));
    assert!((ready.duration - 0.1).abs() < 1e-9);
    engine.dispose();
}
