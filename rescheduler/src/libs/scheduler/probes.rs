//! Selects which probe should be rescheduled this tick
//!
//! Selectors run in order and the first one that either picks a probe or aborts the tick wins.
//! Each selector is a pure function of the fleet state and the snapshots it was built with.

use chrono::prelude::*;
use std::collections::HashSet;

use smokemini::models::{FleetState, Index};

use crate::libs::snapshot::{Node, Pod, PvcTermination};

/// What a single selector decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Reschedule this probe
    Chosen(Index),
    /// Let the next selector decide
    Next,
    /// Do not reschedule anything this tick
    Skip,
}

/// A selection and the selector that made it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// What was selected
    pub selection: Selection,
    /// The name of the selector that decided
    pub by: &'static str,
}

/// Picks a probe to reschedule
pub trait ProbeSelector {
    /// The name of this selector for logging
    fn name(&self) -> &'static str;

    /// Select a probe to reschedule
    ///
    /// # Arguments
    ///
    /// * `state` - The current fleet state
    fn select(&self, state: &FleetState) -> Selection;
}

/// An ordered list of selectors
pub struct ProbePipe<'a> {
    /// The selectors to try in order
    selectors: Vec<Box<dyn ProbeSelector + 'a>>,
}

impl<'a> ProbePipe<'a> {
    /// Build a new selector pipeline
    ///
    /// # Arguments
    ///
    /// * `selectors` - The selectors to try in order
    pub fn new(selectors: Vec<Box<dyn ProbeSelector + 'a>>) -> Self {
        ProbePipe { selectors }
    }

    /// Get the first selection that is not a deferral
    ///
    /// If every selector defers then nothing is selected.
    ///
    /// # Arguments
    ///
    /// * `state` - The current fleet state
    pub fn select(&self, state: &FleetState) -> Verdict {
        for selector in &self.selectors {
            match selector.select(state) {
                Selection::Next => continue,
                selection => {
                    return Verdict {
                        selection,
                        by: selector.name(),
                    };
                }
            }
        }
        Verdict {
            selection: Selection::Skip,
            by: "exhausted",
        }
    }
}

/// Picks probes whose claims are being deleted
pub struct TerminatingPvc<'a> {
    /// The probe claims
    pvcs: &'a [PvcTermination],
}

impl<'a> TerminatingPvc<'a> {
    /// Build a terminating claim selector
    ///
    /// # Arguments
    ///
    /// * `pvcs` - The probe claims
    pub fn new(pvcs: &'a [PvcTermination]) -> Self {
        TerminatingPvc { pvcs }
    }
}

impl ProbeSelector for TerminatingPvc<'_> {
    fn name(&self) -> &'static str {
        "terminating-pvc"
    }

    fn select(&self, _state: &FleetState) -> Selection {
        match self.pvcs.iter().find(|pvc| pvc.is_terminating) {
            Some(pvc) => Selection::Chosen(pvc.index),
            None => Selection::Next,
        }
    }
}

/// Picks probes that are undeployed or whose node is gone or unschedulable
pub struct NodeHealth<'a> {
    /// Every node in the cluster
    nodes: &'a [Node],
}

impl<'a> NodeHealth<'a> {
    /// Build a node health selector
    ///
    /// # Arguments
    ///
    /// * `nodes` - Every node in the cluster
    pub fn new(nodes: &'a [Node]) -> Self {
        NodeHealth { nodes }
    }
}

impl ProbeSelector for NodeHealth<'_> {
    fn name(&self) -> &'static str {
        "node-health"
    }

    fn select(&self, state: &FleetState) -> Selection {
        // place any probes that were never deployed first
        if let Some((index, _)) = state.iter().find(|(_, record)| record.node.is_empty()) {
            return Selection::Chosen(index);
        }
        let all: HashSet<&str> = self.nodes.iter().map(|node| node.name.as_str()).collect();
        let unschedulable: HashSet<&str> = self
            .nodes
            .iter()
            .filter(|node| !node.schedulable)
            .map(|node| node.name.as_str())
            .collect();
        // move probes off of nodes that have vanished
        if let Some((index, _)) = state
            .iter()
            .find(|(_, record)| !all.contains(record.node.as_str()))
        {
            return Selection::Chosen(index);
        }
        // move probes off of nodes that can no longer host them
        if let Some((index, _)) = state
            .iter()
            .find(|(_, record)| unschedulable.contains(record.node.as_str()))
        {
            return Selection::Chosen(index);
        }
        Selection::Next
    }
}

/// Picks probes whose storage class differs from the one we want
pub struct StorageClassDrift<'a> {
    /// The storage class every probe should use
    storage_class: &'a str,
}

impl<'a> StorageClassDrift<'a> {
    /// Build a storage class drift selector
    ///
    /// # Arguments
    ///
    /// * `storage_class` - The storage class every probe should use
    pub fn new(storage_class: &'a str) -> Self {
        StorageClassDrift { storage_class }
    }
}

impl ProbeSelector for StorageClassDrift<'_> {
    fn name(&self) -> &'static str {
        "storage-class-drift"
    }

    fn select(&self, state: &FleetState) -> Selection {
        match state
            .iter()
            .find(|(_, record)| record.storage_class != self.storage_class)
        {
            Some((index, _)) => Selection::Chosen(index),
            None => Selection::Next,
        }
    }
}

/// How long a pod may stay unready before it is rescheduled despite the disruption budget
const STUCK_AFTER_SECS: i64 = 60;

/// The age the oldest pod of a fully rotating fleet of five reaches with a one minute cadence
const ROTATE_AFTER_SECS: i64 = 4 * 60;

/// Picks probes with missing or stuck pods and otherwise rotates the oldest pod
pub struct PodHealth<'a> {
    /// The probe pods
    pods: &'a [Pod],
    /// Whether our disruption budget allows a voluntary disruption
    disruption_allowed: bool,
    /// The time this tick started at
    now: DateTime<Utc>,
}

impl<'a> PodHealth<'a> {
    /// Build a pod health selector
    ///
    /// # Arguments
    ///
    /// * `pods` - The probe pods
    /// * `disruption_allowed` - Whether our disruption budget allows a disruption
    /// * `now` - The time this tick started at
    pub fn new(pods: &'a [Pod], disruption_allowed: bool, now: DateTime<Utc>) -> Self {
        PodHealth {
            pods,
            disruption_allowed,
            now,
        }
    }
}

impl ProbeSelector for PodHealth<'_> {
    fn name(&self) -> &'static str {
        "pod-health"
    }

    fn select(&self, state: &FleetState) -> Selection {
        // scheduled probes without a pod need to be placed again
        let live: HashSet<Index> = self.pods.iter().map(|pod| pod.index).collect();
        if let Some((index, _)) = state
            .iter()
            .find(|(index, record)| record.is_scheduled() && !live.contains(index))
        {
            return Selection::Chosen(index);
        }
        // pods that have been unready for too long are not protected by the budget
        let stuck_before = self.now - chrono::Duration::seconds(STUCK_AFTER_SECS);
        if let Some(pod) = self
            .pods
            .iter()
            .filter(|pod| !pod.ready && pod.created < stuck_before)
            .min_by_key(|pod| pod.index)
        {
            return Selection::Chosen(pod.index);
        }
        // never voluntarily break a healthy fleet
        if !self.disruption_allowed {
            return Selection::Skip;
        }
        // rotate the oldest pod once it is old enough
        let rotate_before = self.now - chrono::Duration::seconds(ROTATE_AFTER_SECS);
        match self
            .pods
            .iter()
            .filter(|pod| pod.created < rotate_before)
            .min_by_key(|pod| (pod.created, pod.index))
        {
            Some(pod) => Selection::Chosen(pod.index),
            None => Selection::Next,
        }
    }
}

#[cfg(test)]
mod tests {
    use smokemini::models::XState;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn scheduled() -> FleetState {
        let mut state = FleetState::default();
        for (i, index) in Index::ALL.iter().enumerate() {
            state.set(*index, XState::new("img", format!("n{}", i + 1), "A", "sc"));
        }
        state
    }

    fn nodes() -> Vec<Node> {
        (1..=5).map(|i| Node::new(format!("n{i}"), "A", true)).collect()
    }

    fn pod(index: Index, ready: bool, age_secs: i64) -> Pod {
        Pod {
            index,
            node: String::new(),
            ready,
            created: now() - chrono::Duration::seconds(age_secs),
        }
    }

    fn healthy_pods(age_secs: i64) -> Vec<Pod> {
        Index::ALL.iter().map(|index| pod(*index, true, age_secs)).collect()
    }

    struct Fixed(Selection);

    impl ProbeSelector for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn select(&self, _state: &FleetState) -> Selection {
            self.0
        }
    }

    #[test]
    fn pipe_returns_first_decision() {
        let state = FleetState::default();
        let pipe = ProbePipe::new(vec![
            Box::new(Fixed(Selection::Next)),
            Box::new(Fixed(Selection::Chosen(Index::D))),
            Box::new(Fixed(Selection::Chosen(Index::A))),
        ]);
        assert_eq!(pipe.select(&state).selection, Selection::Chosen(Index::D));
        let pipe = ProbePipe::new(vec![
            Box::new(Fixed(Selection::Skip)),
            Box::new(Fixed(Selection::Chosen(Index::A))),
        ]);
        assert_eq!(pipe.select(&state).selection, Selection::Skip);
        let pipe = ProbePipe::new(vec![Box::new(Fixed(Selection::Next))]);
        assert_eq!(pipe.select(&state).selection, Selection::Skip);
        assert_eq!(pipe.select(&state).by, "exhausted");
    }

    #[test]
    fn terminating_pvc() {
        let pvcs = vec![
            PvcTermination {
                name: Index::A.pvc_name(),
                index: Index::A,
                is_terminating: false,
            },
            PvcTermination {
                name: Index::D.pvc_name(),
                index: Index::D,
                is_terminating: true,
            },
        ];
        let state = scheduled();
        assert_eq!(TerminatingPvc::new(&pvcs).select(&state), Selection::Chosen(Index::D));
        assert_eq!(TerminatingPvc::new(&pvcs[..1]).select(&state), Selection::Next);
    }

    #[test]
    fn node_health_undeployed_first() {
        let nodes = nodes();
        let selector = NodeHealth::new(&nodes);
        assert_eq!(selector.select(&FleetState::default()), Selection::Chosen(Index::A));
        assert_eq!(selector.select(&scheduled()), Selection::Next);
    }

    #[test]
    fn node_health_vanished_and_unschedulable() {
        let mut nodes = nodes();
        // n3 is cordoned
        nodes[2].schedulable = false;
        assert_eq!(NodeHealth::new(&nodes).select(&scheduled()), Selection::Chosen(Index::C));
        // n5 is gone which outranks the cordoned node
        nodes.pop();
        assert_eq!(NodeHealth::new(&nodes).select(&scheduled()), Selection::Chosen(Index::E));
    }

    #[test]
    fn storage_class_drift() {
        let state = scheduled();
        assert_eq!(StorageClassDrift::new("sc").select(&state), Selection::Next);
        assert!(matches!(StorageClassDrift::new("new").select(&state), Selection::Chosen(_)));
    }

    #[test]
    fn pod_health_missing_pod() {
        let mut pods = healthy_pods(600);
        pods.retain(|pod| pod.index != Index::B);
        let selector = PodHealth::new(&pods, false, now());
        assert_eq!(selector.select(&scheduled()), Selection::Chosen(Index::B));
    }

    #[test]
    fn pod_health_stuck_pod_ignores_budget() {
        let mut pods = healthy_pods(30);
        pods[3] = pod(Index::D, false, 61);
        assert_eq!(PodHealth::new(&pods, false, now()).select(&scheduled()), Selection::Chosen(Index::D));
        // an unready pod younger than a minute is given time to start
        pods[3] = pod(Index::D, false, 30);
        assert_eq!(PodHealth::new(&pods, false, now()).select(&scheduled()), Selection::Skip);
    }

    #[test]
    fn pod_health_budget_blocks_rotation() {
        let pods = healthy_pods(600);
        assert_eq!(PodHealth::new(&pods, false, now()).select(&scheduled()), Selection::Skip);
    }

    #[test]
    fn pod_health_rotates_oldest() {
        let pods = vec![
            pod(Index::A, true, 60),
            pod(Index::B, true, 5 * 60),
            pod(Index::C, true, 7 * 60),
            pod(Index::D, true, 6 * 60),
            pod(Index::E, true, 30),
        ];
        assert_eq!(PodHealth::new(&pods, true, now()).select(&scheduled()), Selection::Chosen(Index::C));
    }

    #[test]
    fn pod_health_four_minutes_is_not_old_enough() {
        let pods = healthy_pods(ROTATE_AFTER_SECS);
        assert_eq!(PodHealth::new(&pods, true, now()).select(&scheduled()), Selection::Next);
        let pods = healthy_pods(ROTATE_AFTER_SECS + 1);
        assert_eq!(PodHealth::new(&pods, true, now()).select(&scheduled()), Selection::Chosen(Index::A));
    }
}
