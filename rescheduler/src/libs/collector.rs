//! Collects persistent volumes left behind by probe claims

use tracing::{Level, event, instrument};

use crate::libs::patches::{Delete, PatchCollector};
use crate::libs::snapshot::Volume;

/// The prefix every probe claim name starts with
pub const PROBE_CLAIM_PREFIX: &str = "disk-smoke-mini-";

/// Get the probe volumes that should be deleted
///
/// # Arguments
///
/// * `volumes` - Every volume in the cluster
/// * `batch` - The most volumes to select
pub fn select(volumes: &[Volume], batch: usize) -> Vec<&Volume> {
    volumes
        .iter()
        .filter(|volume| !volume.is_terminating)
        .filter(|volume| {
            volume
                .claim
                .as_deref()
                .is_some_and(|claim| claim.starts_with(PROBE_CLAIM_PREFIX))
        })
        .take(batch)
        .collect()
}

/// Queue deletes for a batch of probe volumes
///
/// Returns the number of volumes queued for deletion.
///
/// # Arguments
///
/// * `volumes` - Every volume in the cluster
/// * `batch` - The most volumes to delete
/// * `patches` - The collector to queue deletes in
#[instrument(name = "collector::run", skip_all)]
pub fn run(volumes: &[Volume], batch: usize, patches: &mut dyn PatchCollector) -> usize {
    let selected = select(volumes, batch);
    for volume in &selected {
        event!(
            Level::INFO,
            msg = "Deleting probe volume",
            volume = volume.name,
            claim = ?volume.claim
        );
        patches.delete(Delete::volume(volume.name.as_str()));
    }
    selected.len()
}
