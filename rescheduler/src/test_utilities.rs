//! The utilities for tests involving the rescheduler

use chrono::prelude::*;
use serde_json::json;
use smokemini::Error;
use smokemini::models::{FleetState, Index, Values, XState};

use crate::libs::Cluster;
use crate::libs::patches::{Delete, Patches};
use crate::libs::snapshot::{Node, Pod, PodPhase, PvcTermination, Snapshots, StatefulSet, Volume};

/// The image every test probe runs
pub const IMAGE: &str = "registry.example.com/smoke-mini@sha256:abc";

/// The fixed time our tests run at
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Build values with an image and optionally a fleet state and storage class
///
/// # Arguments
///
/// * `state` - The fleet state to persist
/// * `storage_class` - The smoke-mini storage class override
pub fn values(state: Option<&FleetState>, storage_class: Option<&str>) -> Values {
    let mut values = Values::new(json!({
        "global": {"modulesImages": {
            "registry": {"base": "registry.example.com/smoke-mini"},
            "digests": {"upmeter": {"smokeMini": "sha256:abc"}}
        }}
    }));
    if let Some(state) = state {
        values.set_fleet_state(state).unwrap();
    }
    if let Some(storage_class) = storage_class {
        values.set("upmeter.smokeMini.storageClass", json!(storage_class));
    }
    values
}

/// Build schedulable nodes named `n1`, `n2`, and so on within zones
///
/// # Arguments
///
/// * `zones` - The zone of each node in order
pub fn nodes(zones: &[&str]) -> Vec<Node> {
    zones
        .iter()
        .enumerate()
        .map(|(i, zone)| Node::new(format!("n{}", i + 1), *zone, true))
        .collect()
}

/// Build a fleet state with every probe scheduled
///
/// # Arguments
///
/// * `placements` - The node and zone of each probe in index order
/// * `storage_class` - The storage class every probe uses
pub fn scheduled(placements: &[(&str, &str)], storage_class: &str) -> FleetState {
    let mut state = FleetState::default();
    for (index, (node, zone)) in Index::ALL.iter().zip(placements) {
        state.set(*index, XState::new(IMAGE, *node, *zone, storage_class));
    }
    state
}

/// Build a pod for a probe
///
/// # Arguments
///
/// * `index` - The probe this pod belongs to
/// * `node` - The node this pod runs on
/// * `ready` - Whether this pod is ready
/// * `age_secs` - How old this pod is
pub fn pod(index: Index, node: &str, ready: bool, age_secs: i64) -> Pod {
    Pod {
        index,
        node: node.to_owned(),
        ready,
        created: now() - chrono::Duration::seconds(age_secs),
    }
}

/// Build a ready pod for every probe in a fleet state
///
/// # Arguments
///
/// * `state` - The fleet state to build pods for
/// * `age_secs` - How old every pod is
pub fn pods_for(state: &FleetState, age_secs: i64) -> Vec<Pod> {
    state
        .iter()
        .map(|(index, record)| pod(index, &record.node, true, age_secs))
        .collect()
}

/// Build a probe claim
///
/// # Arguments
///
/// * `index` - The probe this claim belongs to
/// * `is_terminating` - Whether this claim is being deleted
pub fn pvc(index: Index, is_terminating: bool) -> PvcTermination {
    PvcTermination {
        name: index.pvc_name(),
        index,
        is_terminating,
    }
}

/// Build the phase of a probe pod
///
/// # Arguments
///
/// * `index` - The probe this pod belongs to
/// * `is_pending` - Whether this pod is pending
pub fn phase(index: Index, is_pending: bool) -> PodPhase {
    PodPhase {
        name: index.pod_name(),
        index,
        is_pending,
        claims_volume: true,
    }
}

/// Build a statefulset snapshot
///
/// # Arguments
///
/// * `index` - The probe this statefulset belongs to
/// * `node` - The node annotation of this statefulset
/// * `zone` - The zone annotation of this statefulset
pub fn statefulset(index: Index, node: &str, zone: &str) -> StatefulSet {
    StatefulSet {
        index,
        image: IMAGE.to_owned(),
        node: node.to_owned(),
        zone: zone.to_owned(),
        storage_class: "sc".to_owned(),
    }
}

/// A cluster kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryCluster {
    /// The objects every tick observes
    pub snapshots: Snapshots,
    /// The persistent volumes in this cluster
    pub volumes: Vec<Volume>,
    /// The persisted values
    pub values: Values,
    /// How many times values were persisted
    pub saves: usize,
    /// Every delete applied in order
    pub deleted: Vec<Delete>,
    /// How many deletes had been applied at each save
    pub deletes_at_save: Vec<usize>,
}

impl MemoryCluster {
    /// Create an in memory cluster
    ///
    /// # Arguments
    ///
    /// * `snapshots` - The objects every tick observes
    /// * `values` - The persisted values
    pub fn new(snapshots: Snapshots, values: Values) -> Self {
        MemoryCluster {
            snapshots,
            values,
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl Cluster for MemoryCluster {
    async fn snapshots(&self) -> Result<Snapshots, Error> {
        Ok(self.snapshots.clone())
    }

    async fn volumes(&self) -> Result<Vec<Volume>, Error> {
        Ok(self.volumes.clone())
    }

    async fn load_values(&mut self) -> Result<Values, Error> {
        Ok(self.values.clone())
    }

    async fn save_values(&mut self, values: &Values) -> Result<(), Error> {
        self.values = values.clone();
        self.saves += 1;
        self.deletes_at_save.push(self.deleted.len());
        Ok(())
    }

    async fn flush(&mut self, patches: &Patches) -> Result<usize, Error> {
        self.deleted.extend(patches.deletes.iter().cloned());
        Ok(patches.deletes.len())
    }
}
