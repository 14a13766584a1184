//! In-memory audio buffers shared between the loader and the mixer.

pub mod buffer;

pub use buffer::{TrackAudio, OUTPUT_CHANNELS};
