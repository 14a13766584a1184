use std::fmt::{Display, Formatter};

/// Error type for loading, decoding and driving stem playback.
#[derive(Debug)]
pub enum EngineError {
    Io(std::io::Error),
    Fetch(String),
    Decode(String),
    EmptyUrl,
    DuplicateKey(String),
    Output(String),
    Config(String),
    Aborted,
    Disposed,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Fetch(err) => write!(f, "fetch error: {}", err),
            Self::Decode(err) => write!(f, "decode error: {}", err),
            Self::EmptyUrl => write!(f, "track url is empty"),
            Self::DuplicateKey(key) => write!(f, "duplicate track key in batch: {}", key),
            Self::Output(err) => write!(f, "audio output error: {}", err),
            Self::Config(err) => write!(f, "invalid settings: {}", err),
            Self::Aborted => write!(f, "load aborted"),
            Self::Disposed => write!(f, "engine disposed"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<symphonia::core::errors::Error> for EngineError {
    fn from(value: symphonia::core::errors::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
