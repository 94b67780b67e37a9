//! Collects the deletes decided on during a tick so they can be flushed at its end

use smokemini::models::Index;

/// The coordinates of an object to delete
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Delete {
    /// The api version of this object
    pub api_version: &'static str,
    /// The kind of this object
    pub kind: &'static str,
    /// The namespace of this object, cluster scoped objects have none
    pub namespace: Option<String>,
    /// The name of this object
    pub name: String,
}

impl Delete {
    /// Build a delete for a probe statefulset
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace our probes are in
    /// * `index` - The probe whose statefulset to delete
    pub fn statefulset(namespace: &str, index: Index) -> Self {
        Delete {
            api_version: "apps/v1",
            kind: "StatefulSet",
            namespace: Some(namespace.to_owned()),
            name: index.statefulset_name(),
        }
    }

    /// Build a delete for a probe claim
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace our probes are in
    /// * `index` - The probe whose claim to delete
    pub fn pvc(namespace: &str, index: Index) -> Self {
        Delete {
            api_version: "v1",
            kind: "PersistentVolumeClaim",
            namespace: Some(namespace.to_owned()),
            name: index.pvc_name(),
        }
    }

    /// Build a delete for a probe pod
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace our probes are in
    /// * `name` - The name of the pod to delete
    pub fn pod<T: Into<String>>(namespace: &str, name: T) -> Self {
        Delete {
            api_version: "v1",
            kind: "Pod",
            namespace: Some(namespace.to_owned()),
            name: name.into(),
        }
    }

    /// Build a delete for a cluster scoped persistent volume
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the volume to delete
    pub fn volume<T: Into<String>>(name: T) -> Self {
        Delete {
            api_version: "v1",
            kind: "PersistentVolume",
            namespace: None,
            name: name.into(),
        }
    }
}

/// Something that accepts delete requests to apply later
pub trait PatchCollector {
    /// Queue an object to be deleted
    ///
    /// # Arguments
    ///
    /// * `delete` - The object to delete
    fn delete(&mut self, delete: Delete);
}

/// A buffer of deletes that is flushed after a tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patches {
    /// The deletes in the order they were requested
    pub deletes: Vec<Delete>,
}

impl Patches {
    /// Whether no deletes were requested
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty()
    }

    /// The names of every requested delete of a kind
    ///
    /// # Arguments
    ///
    /// * `kind` - The kind of object to get deletes for
    pub fn names(&self, kind: &str) -> Vec<&str> {
        self.deletes
            .iter()
            .filter(|delete| delete.kind == kind)
            .map(|delete| delete.name.as_str())
            .collect()
    }
}

impl PatchCollector for Patches {
    /// Queue an object to be deleted ignoring duplicates
    ///
    /// # Arguments
    ///
    /// * `delete` - The object to delete
    fn delete(&mut self, delete: Delete) {
        if !self.deletes.contains(&delete) {
            self.deletes.push(delete);
        }
    }
}
