//! Shared transport, mixing and output for synchronized stem playback.

pub mod engine;
pub mod mixer;
pub mod output;
pub mod single;
pub mod source;
pub mod transport;
