//! Track lists from the command line and from JSON manifests.

use std::path::Path;

use stemdeck_lib::{EngineError, Result, TrackDescriptor};

/// Parse `key=url` or `key:name=url`. The name defaults to the key.
pub fn parse_track_arg(arg: &str) -> Result<TrackDescriptor> {
    let (label, url) = arg
        .split_once('=')
        .ok_or_else(|| EngineError::Config(format!("expected key=url, got {:?}", arg)))?;
    let (key, name) = match label.split_once(':') {
        Some((key, name)) => (key.trim(), name.trim()),
        None => (label.trim(), label.trim()),
    };
    if key.is_empty() {
        return Err(EngineError::Config(format!("missing track key in {:?}", arg)));
    }
    let name = if name.is_empty() { key } else { name };
    Ok(TrackDescriptor::new(key, url.trim(), name))
}

pub fn parse_manifest(json: &str) -> Result<Vec<TrackDescriptor>> {
    Ok(serde_json::from_str(json)?)
}

pub fn read_manifest(path: impl AsRef<Path>) -> Result<Vec<TrackDescriptor>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|err| EngineError::Config(format!("{}: {}", path.display(), err)))?;
    parse_manifest(&json)
}

/// Manifest tracks first, then positional tracks.
pub fn collect_tracks<'a>(
    manifest: Option<&str>,
    args: impl IntoIterator<Item = &'a String>,
) -> Result<Vec<TrackDescriptor>> {
    let mut tracks = match manifest {
        Some(path) => read_manifest(path)?,
        None => Vec::new(),
    };
    for arg in args {
        tracks.push(parse_track_arg(arg)?);
    }
    Ok(tracks)
}
