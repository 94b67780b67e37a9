//! Lists the raw objects our snapshots are built from

use k8s_openapi::api::apps::v1::StatefulSet as RawStatefulSet;
use k8s_openapi::api::core::v1::{
    Node as RawNode, PersistentVolume, PersistentVolumeClaim, Pod as RawPod,
};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::api::storage::v1::StorageClass as RawStorageClass;
use kube::api::{Api, ListParams};
use serde::de::DeserializeOwned;
use smokemini::Error;
use std::fmt::Debug;

use crate::libs::snapshot::{
    Node, Pdb, Pod, PodPhase, PvcTermination, Snapshots, StatefulSet, StorageClass, Volume,
};

/// List objects and convert them to snapshots
///
/// # Arguments
///
/// * `api` - The api to list objects with
/// * `params` - The params to list with
async fn list_as<K, S>(api: &Api<K>, params: &ListParams) -> Result<Vec<S>, Error>
where
    K: Clone + DeserializeOwned + Debug,
    S: for<'a> TryFrom<&'a K, Error = Error>,
{
    let list = api.list(params).await?;
    list.items.iter().map(|raw| S::try_from(raw)).collect()
}

/// List every object a reschedule tick needs
///
/// # Arguments
///
/// * `client` - Kubernetes client
/// * `namespace` - The namespace our probes live in
/// * `selector` - The label selector matching our probe objects
pub async fn list(client: &kube::Client, namespace: &str, selector: &str) -> Result<Snapshots, Error> {
    // cluster scoped objects are listed in full
    let all = ListParams::default();
    let probes = ListParams::default().labels(selector);
    let nodes: Vec<Node> = list_as(&Api::<RawNode>::all(client.clone()), &all).await?;
    let storage_classes: Vec<StorageClass> = list_as(&Api::<RawStorageClass>::all(client.clone()), &all).await?;
    let statefulsets: Vec<StatefulSet> = list_as(
        &Api::<RawStatefulSet>::namespaced(client.clone(), namespace),
        &probes,
    )
    .await?;
    let pvcs: Vec<PvcTermination> = list_as(
        &Api::<PersistentVolumeClaim>::namespaced(client.clone(), namespace),
        &probes,
    )
    .await?;
    let pdbs: Vec<Pdb> = list_as(
        &Api::<PodDisruptionBudget>::namespaced(client.clone(), namespace),
        &probes,
    )
    .await?;
    // pods feed both the health and phase snapshots
    let raw_pods = Api::<RawPod>::namespaced(client.clone(), namespace)
        .list(&probes)
        .await?;
    let pods = raw_pods
        .items
        .iter()
        .map(Pod::try_from)
        .collect::<Result<Vec<Pod>, Error>>()?;
    let pod_phases = raw_pods
        .items
        .iter()
        .map(PodPhase::try_from)
        .collect::<Result<Vec<PodPhase>, Error>>()?;
    Ok(Snapshots {
        nodes,
        statefulsets,
        pods,
        pod_phases,
        pvcs,
        storage_classes,
        pdbs,
    })
}

/// List every persistent volume in the cluster
///
/// # Arguments
///
/// * `client` - Kubernetes client
pub async fn volumes(client: &kube::Client) -> Result<Vec<Volume>, Error> {
    list_as(
        &Api::<PersistentVolume>::all(client.clone()),
        &ListParams::default(),
    )
    .await
}
