//! Fetch and decode a single track without playing it.

use std::sync::atomic::AtomicBool;

use log::{error, info};
use stemdeck_lib::track::TrackLoader;
use stemdeck_lib::EngineSettings;

/// Load `url` and print its decoded shape. Returns the process exit code.
pub fn run_probe(url: &str, settings: &EngineSettings) -> i32 {
    let loader = TrackLoader::new(settings.clone());
    let abort = AtomicBool::new(false);

    let decoded = match loader.load(url, &abort) {
        Ok(decoded) => decoded,
        Err(err) => {
            error!("probe failed for {}: {}", url, err);
            eprintln!("probe failed: {}", err);
            return 1;
        }
    };

    info!(
        "probed {}: {} packet(s) with {} decode error(s)",
        url, decoded.packets, decoded.decode_errors
    );
    println!("url: {}", url);
    println!("frames: {}", decoded.audio.frames());
    println!("duration: {:.3}s", decoded.audio.duration().as_secs_f64());
    println!("sample_rate: {}", decoded.audio.sample_rate());
    println!(
        "source: {} Hz, {} channel(s)",
        decoded.source_sample_rate, decoded.source_channels
    );
    println!(
        "packets: {} (decode errors: {})",
        decoded.packets, decoded.decode_errors
    );
    0
}
