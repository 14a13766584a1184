//! WAV fixtures for unit tests.

use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Encode a 16-bit PCM WAV in memory. `sample(frame, channel)` supplies values.
pub fn wav_bytes(
    channels: u16,
    sample_rate: u32,
    frames: usize,
    sample: impl Fn(usize, u16) -> f32,
) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for frame in 0..frames {
            for channel in 0..channels {
                let value = (sample(frame, channel).clamp(-1.0, 1.0) * 32_768.0)
                    .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                writer.write_sample(value).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Write a mono WAV file into `dir` and return its path.
pub fn write_mono_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    frames: usize,
    sample: impl Fn(usize) -> f32,
) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, wav_bytes(1, sample_rate, frames, |frame, _| sample(frame))).unwrap();
    path
}
