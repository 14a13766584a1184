use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::warn;
use stemdeck_lib::{
    CommandOutcome, EngineSnapshot, EngineStatus, IgnoreReason, StemEngine, TrackStatus,
    TransportState,
};

const SEEK_STEP_SECONDS: f64 = 5.0;
const VOLUME_STEP_PERCENT: f32 = 5.0;

pub struct StatusSnapshot {
    pub text: String,
}

/// Something a key press asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    TogglePlay,
    Stop,
    SeekBy(f64),
    SelectPrevious,
    SelectNext,
    ToggleMute,
    ToggleSolo,
    VolumeBy(f32),
    Quit,
}

pub fn action_for_key(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char(' ') => Some(Action::TogglePlay),
        KeyCode::Char('x') | KeyCode::Char('X') => Some(Action::Stop),
        KeyCode::Left => Some(Action::SeekBy(-SEEK_STEP_SECONDS)),
        KeyCode::Right => Some(Action::SeekBy(SEEK_STEP_SECONDS)),
        KeyCode::Up => Some(Action::SelectPrevious),
        KeyCode::Down => Some(Action::SelectNext),
        KeyCode::Char('m') | KeyCode::Char('M') => Some(Action::ToggleMute),
        KeyCode::Char('o') | KeyCode::Char('O') => Some(Action::ToggleSolo),
        KeyCode::Char('-') => Some(Action::VolumeBy(-VOLUME_STEP_PERCENT)),
        KeyCode::Char('=') | KeyCode::Char('+') => Some(Action::VolumeBy(VOLUME_STEP_PERCENT)),
        _ => None,
    }
}

/// Apply `action` to the engine. Returns `false` when the UI should exit.
pub fn apply(engine: &StemEngine, action: Action, keys: &[String], selected: &mut usize) -> bool {
    let key = keys.get(*selected).map(String::as_str);
    let outcome = match action {
        Action::Quit => {
            engine.stop();
            return false;
        }
        Action::TogglePlay => engine.toggle_play(),
        Action::Stop => engine.stop(),
        Action::SeekBy(delta) => {
            let target = (engine.position() + delta).clamp(0.0, engine.duration());
            engine.seek(target)
        }
        Action::SelectPrevious => {
            *selected = selected.saturating_sub(1);
            return true;
        }
        Action::SelectNext => {
            if *selected + 1 < keys.len() {
                *selected += 1;
            }
            return true;
        }
        Action::ToggleMute => match key {
            Some(key) => engine.toggle_mute(key),
            None => return true,
        },
        Action::ToggleSolo => match key {
            Some(key) => engine.toggle_solo(key),
            None => return true,
        },
        Action::VolumeBy(delta) => match key {
            Some(key) => {
                let current = engine
                    .mixer_state(key)
                    .map(|state| state.volume_percent)
                    .unwrap_or(100.0);
                engine.set_volume(key, current + delta)
            }
            None => return true,
        },
    };

    if let CommandOutcome::Ignored(reason) = outcome {
        match reason {
            IgnoreReason::Unchanged => {}
            IgnoreReason::ActivationFailed(err) => warn!("audio output unavailable: {}", err),
            other => warn!("{:?} ignored: {:?}", action, other),
        }
    }
    true
}

pub fn handle_key_event(engine: &StemEngine, keys: &[String], selected: &mut usize) -> bool {
    if event::poll(Duration::from_millis(100)).unwrap_or(false) {
        if let Ok(Event::Key(key)) = event::read() {
            if key.kind != KeyEventKind::Press {
                return true;
            }
            if let Some(action) = action_for_key(key.code) {
                return apply(engine, action, keys, selected);
            }
        }
    }

    true
}

pub fn status_text(snapshot: &EngineSnapshot) -> StatusSnapshot {
    let state = match (snapshot.status, snapshot.transport) {
        (EngineStatus::Idle, _) => "· Idle",
        (EngineStatus::Loading, _) => "… Loading",
        (EngineStatus::Failed, _) => "✖ All tracks failed",
        (EngineStatus::Ready, TransportState::Playing) => "▶ Playing",
        (EngineStatus::Ready, TransportState::Paused) => "⏸ Paused",
        (EngineStatus::Ready, TransportState::Stopped) => "■ Stopped",
    };
    let text = format!(
        "{}   {} / {}   ({:>5.1}%)\nBatch: {}",
        state,
        format_time(snapshot.position * 1000.0),
        format_time(snapshot.duration * 1000.0),
        snapshot.progress_percent,
        snapshot.batch_id.as_deref().unwrap_or("-"),
    );

    StatusSnapshot { text }
}

/// One line per track for the mixer panel.
pub fn track_lines(snapshot: &EngineSnapshot, selected: usize) -> Vec<String> {
    snapshot
        .tracks
        .iter()
        .enumerate()
        .map(|(index, track)| {
            let cursor = if index == selected { '>' } else { ' ' };
            let status = match &track.status {
                TrackStatus::Pending => "pending".to_string(),
                TrackStatus::Loading => "loading".to_string(),
                TrackStatus::Ready => format_time(track.duration * 1000.0),
                TrackStatus::Failed(reason) => format!("failed: {}", reason),
            };
            format!(
                "{} {:<16} vol {:>3.0}%  {}{}  {}  {}",
                cursor,
                track.name,
                track.mixer.volume_percent,
                if track.mixer.muted { 'M' } else { '-' },
                if track.mixer.soloed { 'S' } else { '-' },
                if track.audible { "♪" } else { " " },
                status
            )
        })
        .collect()
}

fn format_time(time: f64) -> String {
    let seconds = (time / 1000.0).floor() as u32;
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    let hours = minutes / 60;
    let minutes = minutes % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
