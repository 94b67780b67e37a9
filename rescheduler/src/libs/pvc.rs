//! Deletes probe pods that are stuck on their storage

use std::collections::HashMap;
use tracing::{Level, event, instrument};

use smokemini::models::Index;

use crate::libs::patches::{Delete, PatchCollector};
use crate::libs::snapshot::{PodPhase, PvcTermination};

/// Queue deletes for every observed probe pod stuck on its claim
///
/// A pod is stuck when it is pending, when its claim is terminating, or when it mounts a claim
/// that does not exist. Each pod is deleted at most once.
///
/// # Arguments
///
/// * `pods` - The observed probe pod phases
/// * `pvcs` - The observed probe claims
/// * `namespace` - The namespace our probes are in
/// * `patches` - The collector to queue deletes in
#[instrument(name = "pvc::run", skip_all)]
pub fn run(
    pods: &[PodPhase],
    pvcs: &[PvcTermination],
    namespace: &str,
    patches: &mut dyn PatchCollector,
) -> Vec<String> {
    let claims: HashMap<Index, bool> = pvcs
        .iter()
        .map(|pvc| (pvc.index, pvc.is_terminating))
        .collect();
    let mut deleted: Vec<String> = Vec::default();
    for pod in pods {
        let reason = match claims.get(&pod.index).copied() {
            _ if pod.is_pending => "pending",
            Some(true) => "pvc terminating",
            None if pod.claims_volume => "pvc missing",
            _ => continue,
        };
        if deleted.contains(&pod.name) {
            continue;
        }
        event!(Level::INFO, msg = "Deleting stuck pod", pod = pod.name, reason);
        patches.delete(Delete::pod(namespace, pod.name.as_str()));
        deleted.push(pod.name.clone());
    }
    deleted
}
