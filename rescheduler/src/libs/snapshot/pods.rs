//! Pod snapshots

use chrono::prelude::*;
use k8s_openapi::api::core::v1::Pod as RawPod;
use smokemini::Error;
use smokemini::models::Index;

use super::timestamp;

/// The phase k8s reports for pods that have not started yet
const PENDING_PHASE: &str = "Pending";

/// Get the probe index for a pod
///
/// # Arguments
///
/// * `pod` - The pod to get an index for
fn pod_index(pod: &RawPod) -> Result<(String, Index), Error> {
    match &pod.metadata.name {
        Some(name) => {
            let index = Index::from_name(name)
                .map_err(|err| Error::snapshot("Pod", Some(name), err.to_string()))?;
            Ok((name.clone(), index))
        }
        None => Err(Error::snapshot("Pod", None, "pod has no name")),
    }
}

/// A probe pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pod {
    /// The probe this pod is for
    pub index: Index,
    /// The node this pod was bound to if any
    pub node: String,
    /// Whether this pod is ready
    pub ready: bool,
    /// When this pod was created
    pub created: DateTime<Utc>,
}

impl TryFrom<&RawPod> for Pod {
    type Error = Error;

    /// Build a pod snapshot from a raw pod
    ///
    /// # Arguments
    ///
    /// * `pod` - The raw pod to parse
    fn try_from(pod: &RawPod) -> Result<Self, Self::Error> {
        let (name, index) = pod_index(pod)?;
        // get the node this pod was bound to
        let node = pod
            .spec
            .as_ref()
            .and_then(|spec| spec.node_name.clone())
            .unwrap_or_default();
        // check if our ready condition is true
        let ready = pod
            .status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .map(|conds| {
                conds
                    .iter()
                    .any(|cond| cond.type_ == "Ready" && cond.status == "True")
            })
            .unwrap_or(false);
        // every pod that exists has a creation time
        let created = match &pod.metadata.creation_timestamp {
            Some(created) => timestamp(created)?,
            None => return Err(Error::snapshot("Pod", Some(&name), "pod has no creation timestamp")),
        };
        Ok(Pod {
            index,
            node,
            ready,
            created,
        })
    }
}

/// The phase of a probe pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodPhase {
    /// The name of this pod
    pub name: String,
    /// The probe this pod is for
    pub index: Index,
    /// Whether this pod is pending
    pub is_pending: bool,
    /// Whether this pod mounts a persistent volume claim
    pub claims_volume: bool,
}

impl TryFrom<&RawPod> for PodPhase {
    type Error = Error;

    /// Build a pod phase snapshot from a raw pod
    ///
    /// # Arguments
    ///
    /// * `pod` - The raw pod to parse
    fn try_from(pod: &RawPod) -> Result<Self, Self::Error> {
        let (name, index) = pod_index(pod)?;
        let is_pending = pod
            .status
            .as_ref()
            .and_then(|status| status.phase.as_deref())
            == Some(PENDING_PHASE);
        // check if any of our volumes are backed by a claim
        let claims_volume = pod
            .spec
            .as_ref()
            .and_then(|spec| spec.volumes.as_ref())
            .map(|volumes| volumes.iter().any(|vol| vol.persistent_volume_claim.is_some()))
            .unwrap_or(false);
        Ok(PodPhase {
            name,
            index,
            is_pending,
            claims_volume,
        })
    }
}
