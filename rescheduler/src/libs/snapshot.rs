//! Immutable views of the cluster objects the rescheduler reads
//!
//! Every snapshot is built from a raw k8s object by a pure function so that the scheduling
//! pipelines never touch the k8s api themselves.

use chrono::prelude::*;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use smokemini::Error;

pub mod nodes;
pub mod pdbs;
pub mod pods;
pub mod pvcs;
pub mod statefulsets;
pub mod storage_classes;
pub mod volumes;

pub use nodes::Node;
pub use pdbs::{Pdb, disruption_allowed};
pub use pods::{Pod, PodPhase};
pub use pvcs::PvcTermination;
pub use statefulsets::StatefulSet;
pub use storage_classes::{StorageClass, default_storage_class};
pub use volumes::Volume;

/// Convert a k8s timestamp to a chrono timestamp
///
/// # Arguments
///
/// * `time` - The k8s timestamp to convert
pub fn timestamp(time: &Time) -> Result<DateTime<Utc>, Error> {
    // cast our timestamp to its rfc3339 string form
    let raw: String = serde_json::from_value(serde_json::json!(time))?;
    // parse that string back into a chrono timestamp
    Ok(DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc))
}

/// Every snapshot a single tick consumes
#[derive(Debug, Clone, Default)]
pub struct Snapshots {
    /// All nodes in the cluster
    pub nodes: Vec<Node>,
    /// The probe statefulsets
    pub statefulsets: Vec<StatefulSet>,
    /// The probe pods
    pub pods: Vec<Pod>,
    /// The probe pods phases
    pub pod_phases: Vec<PodPhase>,
    /// The probe persistent volume claims
    pub pvcs: Vec<PvcTermination>,
    /// All storage classes in the cluster
    pub storage_classes: Vec<StorageClass>,
    /// The probe disruption budgets
    pub pdbs: Vec<Pdb>,
}
