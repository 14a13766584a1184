//! Track descriptors plus fetching, decoding and background loading.

mod decode;
mod descriptor;
mod fetch;
mod loader;

pub use decode::{decode, DecodedTrack};
pub use descriptor::{validate_batch, TrackDescriptor, TrackStatus};
pub use fetch::{extension_hint, fetch, locate, TrackLocation};
pub use loader::{LoadJob, TrackLoader};
