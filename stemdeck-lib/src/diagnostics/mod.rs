//! Runtime observation helpers.

pub mod reporter;
