//! StatefulSet snapshots

use k8s_openapi::api::apps::v1::StatefulSet as RawStatefulSet;
use smokemini::Error;
use smokemini::models::index::DISK;
use smokemini::models::{EPHEMERAL_STORAGE_CLASS, Index, NO_ZONE, XState};

/// A probe statefulset as it exists in the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatefulSet {
    /// The probe this statefulset is for
    pub index: Index,
    /// The image of the first container
    pub image: String,
    /// The node this statefulset was placed on
    pub node: String,
    /// The zone this statefulset was placed in
    pub zone: String,
    /// The storage class of the disk claim template
    pub storage_class: String,
}

impl StatefulSet {
    /// Get the desired state record this statefulset describes
    pub fn record(&self) -> XState {
        XState::new(&self.image, &self.node, &self.zone, &self.storage_class)
    }
}

impl TryFrom<&RawStatefulSet> for StatefulSet {
    type Error = Error;

    /// Build a statefulset snapshot from a raw statefulset
    ///
    /// # Arguments
    ///
    /// * `sts` - The raw statefulset to parse
    fn try_from(sts: &RawStatefulSet) -> Result<Self, Self::Error> {
        let name = sts.metadata.name.as_ref();
        // get the probe index from our name
        let index = match name {
            Some(name) => Index::from_name(name)
                .map_err(|err| Error::snapshot("StatefulSet", Some(name), err.to_string()))?,
            None => return Err(Error::snapshot("StatefulSet", None, "statefulset has no name")),
        };
        // our placement is stored in annotations
        let annotation = |key: &str| {
            sts.metadata
                .annotations
                .as_ref()
                .and_then(|annotations| annotations.get(key))
                .cloned()
                .unwrap_or_default()
        };
        let node = annotation("node");
        let zone = match annotation("zone") {
            zone if zone.is_empty() => NO_ZONE.to_owned(),
            zone => zone,
        };
        let spec = match &sts.spec {
            Some(spec) => spec,
            None => return Err(Error::snapshot("StatefulSet", name, "statefulset has no spec")),
        };
        // get the image of our first container
        let image = spec
            .template
            .spec
            .as_ref()
            .and_then(|pod| pod.containers.first())
            .and_then(|container| container.image.clone())
            .ok_or_else(|| Error::snapshot("StatefulSet", name, "statefulset has no container image"))?;
        // get the storage class from the disk claim template
        let storage_class = spec
            .volume_claim_templates
            .iter()
            .flatten()
            .find(|template| template.metadata.name.as_deref() == Some(DISK))
            .and_then(|template| template.spec.as_ref())
            .and_then(|claim| claim.storage_class_name.clone())
            .unwrap_or_else(|| EPHEMERAL_STORAGE_CLASS.to_owned());
        Ok(StatefulSet {
            index,
            image,
            node,
            zone,
            storage_class,
        })
    }
}
