//! Engine settings and their JSON representation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

const MIN_SAMPLE_RATE: u32 = 8_000;
const MAX_SAMPLE_RATE: u32 = 192_000;
const MIN_BLOCK_FRAMES: usize = 16;
const MAX_BLOCK_FRAMES: usize = 8_192;

/// Tunables for a [`crate::playback::engine::StemEngine`].
///
/// Every field has a default, so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Output sample rate; every track is resampled to it at load time.
    pub sample_rate: u32,
    /// Frames rendered per engine lock. Mixer and transport commands take
    /// effect at the next block boundary.
    pub block_frames: usize,
    pub fetch_timeout_ms: u64,
    /// Upper bound on a single fetched resource.
    pub max_fetch_bytes: u64,
    pub output_open_retries: usize,
    pub output_open_retry_ms: u64,
    /// Default wait used by blocking helpers such as the single-track player.
    pub settle_timeout_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_frames: 512,
            fetch_timeout_ms: 30_000,
            max_fetch_bytes: 512 * 1024 * 1024,
            output_open_retries: 20,
            output_open_retry_ms: 100,
            settle_timeout_ms: 60_000,
        }
    }
}

impl EngineSettings {
    /// Parse settings from a JSON document and clamp them.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    /// Read settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Return a copy with every value inside its supported range.
    pub fn sanitized(mut self) -> Self {
        self.sample_rate = self.sample_rate.clamp(MIN_SAMPLE_RATE, MAX_SAMPLE_RATE);
        self.block_frames = self.block_frames.clamp(MIN_BLOCK_FRAMES, MAX_BLOCK_FRAMES);
        self.fetch_timeout_ms = self.fetch_timeout_ms.max(1);
        self.max_fetch_bytes = self.max_fetch_bytes.max(1);
        self.output_open_retries = self.output_open_retries.max(1);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self.sanitized()
    }

    pub fn with_block_frames(mut self, block_frames: usize) -> Self {
        self.block_frames = block_frames;
        self.sanitized()
    }

    pub fn with_fetch_timeout_ms(mut self, fetch_timeout_ms: u64) -> Self {
        self.fetch_timeout_ms = fetch_timeout_ms;
        self.sanitized()
    }
}
