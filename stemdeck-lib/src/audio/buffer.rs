//! Fully decoded, engine-format track audio.

use std::time::Duration;

/// Channel count of every buffer the engine mixes.
pub const OUTPUT_CHANNELS: u16 = 2;

/// Decoded audio for one track: interleaved stereo `f32` at the engine rate.
///
/// Instances are immutable once built and shared with the mixing source via
/// `Arc`; the owning `LoadedTrack` drops its handle on disposal.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackAudio {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl TrackAudio {
    /// Wrap interleaved stereo samples. A trailing partial frame is dropped.
    pub fn from_stereo(mut samples: Vec<f32>, sample_rate: u32) -> Self {
        let channels = OUTPUT_CHANNELS as usize;
        samples.truncate(samples.len() - samples.len() % channels);
        Self {
            samples,
            sample_rate,
        }
    }

    /// Build from interleaved samples with an arbitrary channel count,
    /// converting to stereo and resampling to `target_rate`.
    pub fn from_interleaved(
        samples: &[f32],
        channels: usize,
        source_rate: u32,
        target_rate: u32,
    ) -> Self {
        let stereo = to_stereo(samples, channels);
        let stereo = if source_rate == target_rate {
            stereo
        } else {
            resample_linear(&stereo, source_rate, target_rate)
        };
        Self::from_stereo(stereo, target_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> u64 {
        (self.samples.len() / OUTPUT_CHANNELS as usize) as u64
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Stereo pair at `frame`, or silence past the end.
    pub fn frame(&self, frame: u64) -> (f32, f32) {
        let index = frame as usize * OUTPUT_CHANNELS as usize;
        match self.samples.get(index..index + 2) {
            Some(pair) => (pair[0], pair[1]),
            None => (0.0, 0.0),
        }
    }
}

/// Convert interleaved audio to stereo.
///
/// Mono is duplicated to both sides; wider layouts keep their first two
/// channels.
pub fn to_stereo(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        2 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Linearly resample interleaved stereo audio.
pub fn resample_linear(stereo: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    let source_frames = stereo.len() / 2;
    if source_frames == 0 || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }

    let target_frames =
        ((source_frames as u64 * target_rate as u64) / source_rate as u64).max(1) as usize;
    let step = source_rate as f64 / target_rate as f64;
    let mut out = Vec::with_capacity(target_frames * 2);

    for frame in 0..target_frames {
        let position = frame as f64 * step;
        let index = position.floor() as usize;
        let fraction = (position - index as f64) as f32;
        let next = (index + 1).min(source_frames - 1);
        let index = index.min(source_frames - 1);
        for channel in 0..2 {
            let a = stereo[index * 2 + channel];
            let b = stereo[next * 2 + channel];
            out.push(a + (b - a) * fraction);
        }
    }

    out
}
