//! Resolve a track URL into raw encoded bytes.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::debug;

use crate::config::EngineSettings;
use crate::error::{EngineError, Result};

/// Where a track URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackLocation<'a> {
    Remote(&'a str),
    Local(&'a Path),
}

/// Classify a URL. `http(s)` goes over the network, `file://` URLs and bare
/// paths are read from disk.
pub fn locate(url: &str) -> Result<TrackLocation<'_>> {
    let url = url.trim();
    if url.is_empty() {
        return Err(EngineError::EmptyUrl);
    }

    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Ok(TrackLocation::Remote(url));
    }

    let path = url.strip_prefix("file://").unwrap_or(url);
    if path.is_empty() {
        return Err(EngineError::EmptyUrl);
    }
    Ok(TrackLocation::Local(Path::new(path)))
}

/// File extension of the URL path, ignoring query string and fragment.
///
/// Used as a probe hint; presigned storage URLs carry long query strings.
pub fn extension_hint(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let (_, extension) = file_name.rsplit_once('.')?;
    if extension.is_empty() || extension.len() > 5 {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

const READ_CHUNK: usize = 16 * 1024;

/// Fetch the encoded bytes behind `url`.
///
/// The body is read in chunks and `abort` is checked between them, so a
/// superseded batch drops its connection instead of draining it.
pub fn fetch(url: &str, settings: &EngineSettings, abort: &AtomicBool) -> Result<Vec<u8>> {
    match locate(url)? {
        TrackLocation::Remote(url) => fetch_remote(url, settings, abort),
        TrackLocation::Local(path) => read_local(path, settings.max_fetch_bytes, abort),
    }
}

fn fetch_remote(url: &str, settings: &EngineSettings, abort: &AtomicBool) -> Result<Vec<u8>> {
    debug!("fetching {}", url);
    let agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_millis(settings.fetch_timeout_ms))
        .build();
    let response = agent
        .get(url)
        .call()
        .map_err(|err| EngineError::Fetch(err.to_string()))?;

    read_limited(response.into_reader(), settings.max_fetch_bytes, abort)
}

fn read_local(path: &Path, limit: u64, abort: &AtomicBool) -> Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    read_limited(file, limit, abort)
}

fn read_limited(mut reader: impl Read, limit: u64, abort: &AtomicBool) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        if abort.load(Ordering::Relaxed) {
            return Err(EngineError::Aborted);
        }
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if bytes.len() as u64 + read as u64 > limit {
            return Err(EngineError::Fetch(format!(
                "resource exceeds {} byte limit",
                limit
            )));
        }
        bytes.extend_from_slice(&chunk[..read]);
    }
    if bytes.is_empty() {
        return Err(EngineError::Fetch("resource is empty".to_string()));
    }
    Ok(bytes)
}
