//! The reconcile driver that makes at most one placement decision per tick

use chrono::prelude::*;
use rand::Rng;
use tracing::{Level, event, instrument};

use smokemini::Error;
use smokemini::models::{EPHEMERAL_STORAGE_CLASS, Index, Values, XState};

use crate::libs::patches::PatchCollector;
use crate::libs::scheduler::{Decision, Scheduler};
use crate::libs::snapshot::{Snapshots, StorageClass, default_storage_class, disruption_allowed};

/// What a reschedule tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Smoke-mini is disabled so nothing was looked at
    Disabled,
    /// The fleet state is empty but statefulsets exist so populate has to run first
    AwaitingPopulate,
    /// No probe was moved
    Skipped(String),
    /// A probe was moved and the values were updated
    Placed {
        /// The probe that moved
        index: Index,
        /// Its new record
        record: XState,
    },
}

impl Outcome {
    /// Whether this tick changed the values
    pub fn changed(&self) -> bool {
        matches!(self, Outcome::Placed { .. })
    }
}

/// Get the storage class probes should use
///
/// # Arguments
///
/// * `values` - The smoke-mini values
/// * `classes` - The storage classes in the cluster
pub fn effective_storage_class(values: &Values, classes: &[StorageClass]) -> String {
    values
        .smoke_mini_storage_class()
        .or_else(|| values.modules_storage_class())
        .or_else(|| {
            default_storage_class(classes)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| EPHEMERAL_STORAGE_CLASS.to_owned())
}

/// Run one reschedule tick against a frozen set of snapshots
///
/// # Arguments
///
/// * `snapshots` - The cluster objects observed this tick
/// * `values` - The smoke-mini values to read and update
/// * `patches` - The collector to queue deletes in
/// * `rng` - The random source for this tick
/// * `namespace` - The namespace our probes are in
/// * `now` - The time this tick started at
#[instrument(name = "reschedule::run", skip_all, err(Debug))]
pub fn run<R: Rng>(
    snapshots: &Snapshots,
    values: &mut Values,
    patches: &mut dyn PatchCollector,
    rng: &mut R,
    namespace: &str,
    now: DateTime<Utc>,
) -> Result<Outcome, Error> {
    if values.smoke_mini_disabled() {
        event!(Level::INFO, msg = "smoke-mini is disabled");
        return Ok(Outcome::Disabled);
    }
    let mut state = values.fleet_state()?;
    // the fleet state is seeded from observed statefulsets at boot and never here
    if state.empty() && !snapshots.statefulsets.is_empty() {
        event!(
            Level::INFO,
            msg = "Fleet state is empty, waiting for populate",
            statefulsets = snapshots.statefulsets.len()
        );
        return Ok(Outcome::AwaitingPopulate);
    }
    let storage_class = effective_storage_class(values, &snapshots.storage_classes);
    let image = values.image()?;
    let disruption = disruption_allowed(&snapshots.pdbs);
    let scheduler = Scheduler::new(
        snapshots,
        &image,
        &storage_class,
        disruption,
        namespace,
        now,
    );
    match scheduler.schedule(&state, rng, patches) {
        Decision::Skip(reason) => {
            event!(Level::INFO, msg = "Skipping reschedule", reason);
            Ok(Outcome::Skipped(reason))
        }
        Decision::Place {
            index,
            record,
            reason,
        } => {
            event!(
                Level::INFO,
                msg = "Placing probe",
                probe = index.as_str(),
                reason,
                node = record.node,
                zone = record.zone,
                storage_class = record.storage_class
            );
            state.set(index, record.clone());
            values.set_fleet_state(&state)?;
            Ok(Outcome::Placed { index, record })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn class(name: &str, default: bool) -> StorageClass {
        StorageClass {
            name: name.to_owned(),
            default,
        }
    }

    #[test]
    fn storage_class_precedence() {
        let classes = vec![class("slow", false), class("default", true)];
        let mut values = Values::new(json!({}));
        assert_eq!(effective_storage_class(&values, &[]), "false");
        assert_eq!(effective_storage_class(&values, &classes), "default");
        values.set("global.modules.storageClass", json!("modules"));
        assert_eq!(effective_storage_class(&values, &classes), "modules");
        values.set("upmeter.smokeMini.storageClass", json!("mine"));
        assert_eq!(effective_storage_class(&values, &classes), "mine");
    }

    #[test]
    fn storage_class_boolean_false() {
        let values = Values::new(json!({"upmeter": {"smokeMini": {"storageClass": false}}}));
        assert_eq!(effective_storage_class(&values, &[class("default", true)]), "false");
    }
}
