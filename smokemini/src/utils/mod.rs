//! Utilities shared across the smoke-mini crates

pub mod helpers;
#[cfg(feature = "trace")]
pub mod trace;
