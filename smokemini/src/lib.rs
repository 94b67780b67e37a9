//! The shared models, config, and errors for the smoke-mini rescheduler

#[macro_use]
extern crate serde_derive;

pub mod conf;
pub mod error;
pub mod models;
pub mod utils;

// expose test utilities if that feature is enabled
#[cfg(feature = "test-utilities")]
pub mod test_utilities;

pub use conf::Conf;
pub use error::Error;
