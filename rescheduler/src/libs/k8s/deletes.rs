//! Applies queued deletes to the cluster

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod};
use kube::api::{Api, DeleteParams};
use serde::de::DeserializeOwned;
use smokemini::Error;
use std::fmt::Debug;
use tracing::{Level, event};

use crate::libs::patches::{Delete, Patches};

/// Delete a single object treating a missing object as already deleted
///
/// # Arguments
///
/// * `api` - The api to delete this object with
/// * `name` - The name of the object to delete
async fn remove<K>(api: Api<K>, name: &str) -> Result<bool, Error>
where
    K: Clone + DeserializeOwned + Debug,
{
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(true),
        Err(error) => {
            let error = Error::from(error);
            if error.is_not_found() {
                event!(Level::DEBUG, msg = "Already deleted", name);
                Ok(false)
            } else {
                Err(error)
            }
        }
    }
}

/// Apply a single delete
///
/// # Arguments
///
/// * `client` - Kubernetes client
/// * `delete` - The object to delete
async fn apply(client: &kube::Client, delete: &Delete) -> Result<bool, Error> {
    let name = delete.name.as_str();
    match (delete.kind, delete.namespace.as_deref()) {
        ("StatefulSet", Some(ns)) => {
            remove(Api::<StatefulSet>::namespaced(client.clone(), ns), name).await
        }
        ("PersistentVolumeClaim", Some(ns)) => {
            remove(Api::<PersistentVolumeClaim>::namespaced(client.clone(), ns), name).await
        }
        ("Pod", Some(ns)) => remove(Api::<Pod>::namespaced(client.clone(), ns), name).await,
        ("PersistentVolume", None) => {
            remove(Api::<PersistentVolume>::all(client.clone()), name).await
        }
        (kind, ns) => Err(Error::new(format!(
            "Cannot delete {kind} {name} in namespace {ns:?}"
        ))),
    }
}

/// Apply every queued delete in order
///
/// # Arguments
///
/// * `client` - Kubernetes client
/// * `patches` - The deletes to apply
pub async fn flush(client: &kube::Client, patches: &Patches) -> Result<usize, Error> {
    let mut deleted = 0;
    for delete in &patches.deletes {
        if apply(client, delete).await? {
            event!(
                Level::INFO,
                msg = "Deleted",
                kind = delete.kind,
                namespace = ?delete.namespace,
                name = delete.name
            );
            deleted += 1;
        }
    }
    Ok(deleted)
}
