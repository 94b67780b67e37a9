//! Storage class snapshots

use k8s_openapi::api::storage::v1::StorageClass as RawStorageClass;
use smokemini::Error;

/// The annotations that mark a storage class as the cluster default
const DEFAULT_ANNOTATIONS: [&str; 2] = [
    "storageclass.kubernetes.io/is-default-class",
    "storageclass.beta.kubernetes.io/is-default-class",
];

/// A storage class in the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageClass {
    /// The name of this storage class
    pub name: String,
    /// Whether this is the default storage class
    pub default: bool,
}

impl TryFrom<&RawStorageClass> for StorageClass {
    type Error = Error;

    /// Build a storage class snapshot from a raw storage class
    ///
    /// # Arguments
    ///
    /// * `class` - The raw storage class to parse
    fn try_from(class: &RawStorageClass) -> Result<Self, Self::Error> {
        let name = match &class.metadata.name {
            Some(name) => name.clone(),
            None => return Err(Error::snapshot("StorageClass", None, "storage class has no name")),
        };
        let default = class
            .metadata
            .annotations
            .as_ref()
            .map(|annotations| {
                DEFAULT_ANNOTATIONS
                    .iter()
                    .any(|key| annotations.get(*key).map(String::as_str) == Some("true"))
            })
            .unwrap_or(false);
        Ok(StorageClass { name, default })
    }
}

/// Get the name of the first default storage class
///
/// # Arguments
///
/// * `classes` - The storage classes to search
pub fn default_storage_class(classes: &[StorageClass]) -> Option<&str> {
    classes
        .iter()
        .find(|class| class.default)
        .map(|class| class.name.as_str())
}
