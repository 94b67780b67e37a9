pub mod cluster;
pub mod collector;
pub mod k8s;
pub mod migrate;
pub mod patches;
pub mod populate;
pub mod pvc;
pub mod reschedule;
mod rescheduler;
pub mod scheduler;
pub mod snapshot;
pub mod tasks;

pub use cluster::Cluster;
pub use k8s::K8s;
pub use patches::{Delete, PatchCollector, Patches};
pub use rescheduler::Rescheduler;
pub use tasks::Tasks;
