//! CLI argument definitions for `stemdeck`.

use clap::{Arg, ArgAction, ArgMatches, Command};
use stemdeck_lib::{EngineError, EngineSettings, Result};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("stemdeck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Audition and mix audio stems in sync")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .global(true)
                .help("JSON file with engine settings"),
        )
        .arg(
            Arg::new("sample-rate")
                .long("sample-rate")
                .value_name("HZ")
                .global(true)
                .value_parser(clap::value_parser!(u32))
                .help("Engine sample rate; every track is resampled to it"),
        )
        .arg(
            Arg::new("block-frames")
                .long("block-frames")
                .value_name("FRAMES")
                .global(true)
                .value_parser(clap::value_parser!(usize))
                .help("Frames rendered per mixer block"),
        )
        .arg(
            Arg::new("fetch-timeout-ms")
                .long("fetch-timeout-ms")
                .value_name("MS")
                .global(true)
                .value_parser(clap::value_parser!(u64))
                .help("Timeout for fetching a remote track"),
        )
        .subcommand(
            Command::new("play")
                .about("Load stems and play them on a shared transport")
                .arg(
                    Arg::new("TRACK")
                        .help("Track as key=url or key:name=url")
                        .num_args(0..)
                        .index(1),
                )
                .arg(
                    Arg::new("manifest")
                        .long("manifest")
                        .short('m')
                        .value_name("PATH")
                        .help("JSON array of {key, url, name} track descriptors"),
                )
                .arg(
                    Arg::new("batch-id")
                        .long("batch-id")
                        .value_name("ID")
                        .help("Identity of the batch (defaults to the manifest path or \"cli\")"),
                )
                .arg(
                    Arg::new("quiet")
                        .long("quiet")
                        .short('q')
                        .action(ArgAction::SetTrue)
                        .help("Play to the end without the terminal UI"),
                ),
        )
        .subcommand(
            Command::new("probe")
                .about("Fetch and decode one track, then print what was found")
                .arg(
                    Arg::new("URL")
                        .help("http(s) URL, file:// URL or local path")
                        .required(true)
                        .index(1),
                ),
        )
}

/// Resolve engine settings from `--config` plus individual overrides.
pub fn engine_settings(args: &ArgMatches) -> Result<EngineSettings> {
    let mut settings = match args.get_one::<String>("config") {
        Some(path) => EngineSettings::from_file(path)
            .map_err(|err| EngineError::Config(format!("{}: {}", path, err)))?,
        None => EngineSettings::default(),
    };

    if let Some(sample_rate) = args.get_one::<u32>("sample-rate") {
        settings = settings.with_sample_rate(*sample_rate);
    }
    if let Some(block_frames) = args.get_one::<usize>("block-frames") {
        settings = settings.with_block_frames(*block_frames);
    }
    if let Some(timeout) = args.get_one::<u64>("fetch-timeout-ms") {
        settings = settings.with_fetch_timeout_ms(*timeout);
    }

    Ok(settings.sanitized())
}
