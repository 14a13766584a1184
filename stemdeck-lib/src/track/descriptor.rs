//! Track descriptors supplied by callers and per-track load status.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{EngineError, Result};

/// One stem to load: a stable key, a fetchable URL and a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub key: String,
    pub url: String,
    pub name: String,
}

impl TrackDescriptor {
    pub fn new(key: impl Into<String>, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
            name: name.into(),
        }
    }
}

/// Load lifecycle of a single track within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackStatus {
    Pending,
    Loading,
    Ready,
    Failed(String),
}

impl TrackStatus {
    /// True once the track can no longer change state within its batch.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Reject batches whose keys are not unique.
pub fn validate_batch(descriptors: &[TrackDescriptor]) -> Result<()> {
    let mut seen = HashSet::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if !seen.insert(descriptor.key.as_str()) {
            return Err(EngineError::DuplicateKey(descriptor.key.clone()));
        }
    }
    Ok(())
}
