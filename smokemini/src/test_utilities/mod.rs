//! Utilities for testing smoke-mini

#[macro_use]
pub mod helpers;
