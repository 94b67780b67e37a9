//! Persistent volume snapshots

use k8s_openapi::api::core::v1::PersistentVolume;
use smokemini::Error;

/// A persistent volume anywhere in the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// The name of this volume
    pub name: String,
    /// The name of the claim bound to this volume if any
    pub claim: Option<String>,
    /// Whether this volume has a deletion timestamp
    pub is_terminating: bool,
}

impl TryFrom<&PersistentVolume> for Volume {
    type Error = Error;

    /// Build a volume snapshot from a raw volume
    ///
    /// # Arguments
    ///
    /// * `pv` - The raw volume to parse
    fn try_from(pv: &PersistentVolume) -> Result<Self, Self::Error> {
        let name = match &pv.metadata.name {
            Some(name) => name.clone(),
            None => return Err(Error::snapshot("PersistentVolume", None, "volume has no name")),
        };
        let claim = pv
            .spec
            .as_ref()
            .and_then(|spec| spec.claim_ref.as_ref())
            .and_then(|claim| claim.name.clone());
        Ok(Volume {
            name,
            claim,
            is_terminating: pv.metadata.deletion_timestamp.is_some(),
        })
    }
}
