use std::{io, thread::sleep, time::Duration};

use clap::ArgMatches;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};
use stemdeck_lib::{
    CommandOutcome, EngineError, EngineSettings, LoadOutcome, Result, StemEngine,
};

use crate::cli::{self, manifest, probe};
use crate::logging::{self, LogBuffer};
use crate::{controls, ui};

pub fn run(args: &ArgMatches, log_buffer: LogBuffer) -> Result<i32> {
    info!("starting stemdeck");
    match args.subcommand() {
        Some(("probe", sub)) => {
            let settings = cli::args::engine_settings(sub)?;
            let url = sub
                .get_one::<String>("URL")
                .ok_or_else(|| EngineError::Config("missing URL".to_string()))?;
            Ok(probe::run_probe(url, &settings))
        }
        Some(("play", sub)) => {
            let settings = cli::args::engine_settings(sub)?;
            run_play(sub, settings, log_buffer)
        }
        _ => Ok(2),
    }
}

fn run_play(args: &ArgMatches, settings: EngineSettings, log_buffer: LogBuffer) -> Result<i32> {
    let manifest_path = args.get_one::<String>("manifest").map(String::as_str);
    let positional = args.get_many::<String>("TRACK").into_iter().flatten();
    let tracks = manifest::collect_tracks(manifest_path, positional)?;
    if tracks.is_empty() {
        eprintln!("no tracks given; pass key=url arguments or --manifest");
        return Ok(1);
    }
    let batch_id = args
        .get_one::<String>("batch-id")
        .cloned()
        .or_else(|| manifest_path.map(str::to_string))
        .unwrap_or_else(|| "cli".to_string());
    let keys: Vec<String> = tracks.iter().map(|track| track.key.clone()).collect();
    let quiet = args.get_flag("quiet");

    let engine = StemEngine::new(settings);
    engine.load_tracks(batch_id, tracks)?;

    if quiet {
        let outcome = engine.wait_until_settled_default();
        print_outcome(&outcome);
        if !outcome.is_ready() {
            return Ok(1);
        }
        if outcome.all_failed() {
            eprintln!("every track failed; nothing to play");
            return Ok(1);
        }
        return play_to_end(&engine);
    }

    run_tui(&engine, &keys, &log_buffer)
}

fn print_outcome(outcome: &LoadOutcome) {
    for key in &outcome.ready {
        println!("ready   {}", key);
    }
    for failure in &outcome.failed {
        println!("failed  {}: {}", failure.key, failure.reason);
    }
    for key in &outcome.pending {
        println!("pending {}", key);
    }
    println!("status: {:?}", outcome.status);
}

fn play_to_end(engine: &StemEngine) -> Result<i32> {
    match engine.play() {
        CommandOutcome::Applied => {}
        CommandOutcome::Ignored(reason) => {
            error!("playback did not start: {:?}", reason);
            eprintln!("playback did not start: {:?}", reason);
            return Ok(1);
        }
    }
    while engine.is_playing() {
        sleep(Duration::from_millis(50));
    }
    info!("playback finished");
    Ok(0)
}

fn run_tui(engine: &StemEngine, keys: &[String], log_buffer: &LogBuffer) -> Result<i32> {
    let _raw_mode = RawModeGuard::enable().ok();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, EnterAlternateScreen, cursor::Hide);
    let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => terminal,
        Err(err) => {
            warn!("terminal unavailable: {}", err);
            return Err(EngineError::Io(err));
        }
    };

    let mut selected = 0;
    loop {
        let snapshot = engine.snapshot();
        let status = controls::status_text(&snapshot);
        let track_lines = controls::track_lines(&snapshot, selected);
        let log_lines = logging::snapshot(log_buffer);
        ui::draw_status(&mut terminal, &status, &track_lines, &log_lines);

        if !controls::handle_key_event(engine, keys, &mut selected) {
            break;
        }

        sleep(Duration::from_millis(20));
    }

    engine.dispose();

    let _ = terminal.show_cursor();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show);

    Ok(0)
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
