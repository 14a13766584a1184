pub mod args;
pub mod manifest;
pub mod probe;
