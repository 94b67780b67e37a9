//! The rescheduler that keeps the smoke-mini probes spread across nodes and zones

pub mod args;
pub mod libs;

pub use libs::{Cluster, K8s, Rescheduler};

// expose test utilities if that feature is enabled
#[cfg(feature = "test-utilities")]
pub mod test_utilities;
