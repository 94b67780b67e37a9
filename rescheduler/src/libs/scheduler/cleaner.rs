//! Decides which objects must be deleted before a probe moves

use tracing::{Level, event};

use smokemini::models::{Index, XState, is_ephemeral};

use crate::libs::patches::{Delete, PatchCollector};
use crate::libs::snapshot::Pod;

/// What the cleaner asked to delete for a move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cleanup {
    /// Whether the probe statefulset is deleted
    pub statefulset: bool,
    /// Whether the probe claim is deleted
    pub pvc: bool,
}

/// Deletes the objects that would pin a probe to its old placement
pub struct Cleaner<'a> {
    /// The namespace our probes are in
    namespace: &'a str,
    /// The probe pods
    pods: &'a [Pod],
}

impl<'a> Cleaner<'a> {
    /// Build a new cleaner
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace our probes are in
    /// * `pods` - The probe pods
    pub fn new(namespace: &'a str, pods: &'a [Pod]) -> Self {
        Cleaner { namespace, pods }
    }

    /// Queue deletes for a probe moving from one record to another
    ///
    /// # Arguments
    ///
    /// * `x` - The probe being moved
    /// * `old` - The record the probe had
    /// * `new` - The record the probe will have
    /// * `patches` - The collector to queue deletes in
    pub fn clean(
        &self,
        x: Index,
        old: &XState,
        new: &XState,
        patches: &mut dyn PatchCollector,
    ) -> Cleanup {
        // nothing was deployed for a probe that was never scheduled
        if !old.is_scheduled() {
            return Cleanup::default();
        }
        let zone_changed = old.zone != new.zone;
        let storage_changed = old.storage_class != new.storage_class;
        // claims are zone bound so they cannot follow a probe to a new zone
        let pvc = (storage_changed || zone_changed) && !is_ephemeral(&new.storage_class);
        let stuck = self.pods.iter().any(|pod| pod.index == x && !pod.ready);
        // claim templates are immutable so the statefulset goes with its claim
        let statefulset = storage_changed || pvc || stuck;
        if statefulset {
            patches.delete(Delete::statefulset(self.namespace, x));
        }
        if pvc {
            patches.delete(Delete::pvc(self.namespace, x));
        }
        event!(
            Level::INFO,
            probe = x.as_str(),
            zone_changed,
            storage_changed,
            stuck,
            delete_statefulset = statefulset,
            delete_pvc = pvc
        );
        Cleanup { statefulset, pvc }
    }
}
