//! Picks one probe and the node it should move to

use chrono::prelude::*;
use rand::Rng;
use tracing::{Level, event, instrument};

use smokemini::models::{FleetState, Index, XState};

mod cleaner;
mod nodes;
mod probes;

pub use cleaner::{Cleaner, Cleanup};
pub use nodes::{Available, BestZone, MinStatefulSets, NodeFilter, NodePipe, Shuffle, spread};
pub use probes::{
    NodeHealth, PodHealth, ProbePipe, ProbeSelector, Selection, StorageClassDrift, TerminatingPvc,
    Verdict,
};

use crate::libs::patches::PatchCollector;
use crate::libs::snapshot::Snapshots;

/// The outcome of one scheduling pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Move a probe to a new record
    Place {
        /// The probe to move
        index: Index,
        /// The record it should have
        record: XState,
        /// The selector that picked this probe
        reason: &'static str,
    },
    /// Leave the fleet alone this tick
    Skip(String),
}

/// Everything one scheduling pass is decided on
pub struct Scheduler<'a> {
    /// The cluster objects observed this tick
    snapshots: &'a Snapshots,
    /// The image every probe should run
    image: &'a str,
    /// The storage class every probe should use
    storage_class: &'a str,
    /// Whether our disruption budget allows a voluntary disruption
    disruption_allowed: bool,
    /// The namespace our probes are in
    namespace: &'a str,
    /// The time this tick started at
    now: DateTime<Utc>,
}

impl<'a> Scheduler<'a> {
    /// Build a scheduler for one tick
    ///
    /// # Arguments
    ///
    /// * `snapshots` - The cluster objects observed this tick
    /// * `image` - The image every probe should run
    /// * `storage_class` - The storage class every probe should use
    /// * `disruption_allowed` - Whether our disruption budget allows a disruption
    /// * `namespace` - The namespace our probes are in
    /// * `now` - The time this tick started at
    pub fn new(
        snapshots: &'a Snapshots,
        image: &'a str,
        storage_class: &'a str,
        disruption_allowed: bool,
        namespace: &'a str,
        now: DateTime<Utc>,
    ) -> Self {
        Scheduler {
            snapshots,
            image,
            storage_class,
            disruption_allowed,
            namespace,
            now,
        }
    }

    /// Pick the probe to move this tick
    ///
    /// # Arguments
    ///
    /// * `state` - The current fleet state
    pub fn select(&self, state: &FleetState) -> Verdict {
        let pipe = ProbePipe::new(vec![
            Box::new(TerminatingPvc::new(&self.snapshots.pvcs)),
            Box::new(NodeHealth::new(&self.snapshots.nodes)),
            Box::new(StorageClassDrift::new(self.storage_class)),
            Box::new(PodHealth::new(
                &self.snapshots.pods,
                self.disruption_allowed,
                self.now,
            )),
        ]);
        pipe.select(state)
    }

    /// Decide which probe moves where and queue the deletes that move needs
    ///
    /// # Arguments
    ///
    /// * `state` - The current fleet state
    /// * `rng` - The random source for this tick
    /// * `patches` - The collector to queue deletes in
    #[instrument(name = "Scheduler::schedule", skip_all)]
    pub fn schedule<R: Rng>(
        &self,
        state: &FleetState,
        rng: &mut R,
        patches: &mut dyn PatchCollector,
    ) -> Decision {
        // pick a probe to move
        let verdict = self.select(state);
        let x = match verdict.selection {
            Selection::Chosen(x) => x,
            _ => return Decision::Skip(format!("no probe selected by {}", verdict.by)),
        };
        event!(Level::INFO, probe = x.as_str(), selected_by = verdict.by);
        // narrow the cluster down to the nodes this probe could land on
        let mut pipe = NodePipe::new(vec![
            Box::new(Available),
            Box::new(BestZone::new(state)),
            Box::new(MinStatefulSets::new(state)),
            Box::new(Shuffle::new(rng)),
        ]);
        let candidates = pipe.filter(&self.snapshots.nodes, x);
        let Some(node) = candidates.first() else {
            return Decision::Skip(format!("no node available for probe {x}"));
        };
        let record = XState::new(
            self.image,
            node.name.as_str(),
            node.zone.as_str(),
            self.storage_class,
        );
        // clear out anything pinning this probe to its old placement
        Cleaner::new(self.namespace, &self.snapshots.pods).clean(
            x,
            state.get(x),
            &record,
            patches,
        );
        Decision::Place {
            index: x,
            record,
            reason: verdict.by,
        }
    }
}
