//! Persistent volume claim snapshots

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use smokemini::Error;
use smokemini::models::Index;

/// Whether a probe claim is being torn down
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvcTermination {
    /// The name of this claim
    pub name: String,
    /// The probe this claim is for
    pub index: Index,
    /// Whether this claim has a deletion timestamp
    pub is_terminating: bool,
}

impl TryFrom<&PersistentVolumeClaim> for PvcTermination {
    type Error = Error;

    /// Build a claim snapshot from a raw claim
    ///
    /// # Arguments
    ///
    /// * `pvc` - The raw claim to parse
    fn try_from(pvc: &PersistentVolumeClaim) -> Result<Self, Self::Error> {
        let name = match &pvc.metadata.name {
            Some(name) => name.clone(),
            None => return Err(Error::snapshot("PersistentVolumeClaim", None, "claim has no name")),
        };
        let index = Index::from_name(&name)
            .map_err(|err| Error::snapshot("PersistentVolumeClaim", Some(&name), err.to_string()))?;
        Ok(PvcTermination {
            name,
            index,
            is_terminating: pvc.metadata.deletion_timestamp.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    use super::*;

    #[test]
    fn parse_claims() {
        let mut pvc = PersistentVolumeClaim::default();
        pvc.metadata.name = Some("disk-smoke-mini-d-0".to_owned());
        let parsed = PvcTermination::try_from(&pvc).unwrap();
        assert_eq!(parsed.index, Index::D);
        assert!(!parsed.is_terminating);
        let deleted: Time = serde_json::from_value(serde_json::json!("2024-03-01T12:00:00Z")).unwrap();
        pvc.metadata.deletion_timestamp = Some(deleted);
        assert!(PvcTermination::try_from(&pvc).unwrap().is_terminating);
    }
}
