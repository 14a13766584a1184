//! Symphonia decoding of fetched bytes into engine-format audio.

use std::io::{self, Cursor};
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::TrackAudio;
use crate::error::{EngineError, Result};

/// Decoded audio plus what the source stream looked like.
#[derive(Debug, Clone)]
pub struct DecodedTrack {
    pub audio: TrackAudio,
    pub source_sample_rate: u32,
    pub source_channels: usize,
    pub packets: u64,
    pub decode_errors: u64,
}

/// Decode an entire encoded stream held in memory.
///
/// Packet-level decode errors are logged and skipped. `abort` is polled
/// between packets so superseded loads stop early.
pub fn decode(
    bytes: Vec<u8>,
    hint_extension: Option<&str>,
    target_rate: u32,
    abort: &AtomicBool,
) -> Result<DecodedTrack> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = hint_extension {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format = probed.format;

    let (track_id, codec_params) = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .map(|track| (track.id, track.codec_params.clone()))
        .ok_or_else(|| EngineError::Decode("no supported audio tracks".to_string()))?;

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs().make(&codec_params, &dec_opts)?;

    let mut source_rate = codec_params.sample_rate;
    let mut source_channels = codec_params.channels.map(|channels| channels.count());
    let mut interleaved: Vec<f32> = Vec::new();
    let mut packets = 0_u64;
    let mut decode_errors = 0_u64;

    loop {
        if abort.load(Ordering::Relaxed) {
            return Err(EngineError::Aborted);
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(Error::ResetRequired) => break,
            Err(err) => return Err(err.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        packets = packets.saturating_add(1);
        match decoder.decode(&packet) {
            Ok(decoded) => {
                if decoded.frames() == 0 {
                    continue;
                }
                let spec = *decoded.spec();
                source_rate = Some(spec.rate);
                source_channels = Some(spec.channels.count());

                let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                samples.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(samples.samples());
            }
            Err(Error::DecodeError(err)) => {
                decode_errors = decode_errors.saturating_add(1);
                warn!("decode error: {}", err);
            }
            Err(Error::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        }
    }

    let source_sample_rate =
        source_rate.ok_or_else(|| EngineError::Decode("unknown sample rate".to_string()))?;
    let source_channels = source_channels.unwrap_or(0);
    if interleaved.is_empty() || source_channels == 0 {
        return Err(EngineError::Decode("stream contains no audio".to_string()));
    }

    let audio = TrackAudio::from_interleaved(
        &interleaved,
        source_channels,
        source_sample_rate,
        target_rate,
    );

    Ok(DecodedTrack {
        audio,
        source_sample_rate,
        source_channels,
        packets,
        decode_errors,
    })
}
