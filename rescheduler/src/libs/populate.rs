//! Seeds an empty fleet state from the statefulsets already in the cluster

use tracing::{Level, event, instrument};

use smokemini::Error;
use smokemini::models::Values;

use crate::libs::snapshot::StatefulSet;

/// Copy complete statefulset records into an empty fleet state
///
/// Returns whether the values changed.
///
/// # Arguments
///
/// * `statefulsets` - The observed probe statefulsets
/// * `values` - The smoke-mini values to seed
#[instrument(name = "populate::run", skip_all, err(Debug))]
pub fn run(statefulsets: &[StatefulSet], values: &mut Values) -> Result<bool, Error> {
    let mut state = values.fleet_state()?;
    // an existing state is the source of truth
    if !state.empty() {
        return Ok(false);
    }
    let mut complete = Vec::with_capacity(statefulsets.len());
    for sts in statefulsets {
        let record = sts.record();
        if record.is_scheduled() {
            complete.push((sts.index, record));
        } else {
            event!(
                Level::WARN,
                msg = "Not populating incomplete statefulset",
                probe = sts.index.as_str(),
                node = record.node,
                zone = record.zone
            );
        }
    }
    if complete.is_empty() || !state.populate(complete) {
        return Ok(false);
    }
    values.set_fleet_state(&state)?;
    event!(Level::INFO, msg = "Populated fleet state", state = ?state);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use smokemini::models::{Index, XState};

    use super::*;

    fn sts(index: Index, node: &str) -> StatefulSet {
        StatefulSet {
            index,
            image: "img".to_owned(),
            node: node.to_owned(),
            zone: "A".to_owned(),
            storage_class: "sc".to_owned(),
        }
    }

    #[test]
    fn populates_empty_state() {
        let mut values = Values::new(json!({}));
        let changed = run(&[sts(Index::A, "n1"), sts(Index::B, "")], &mut values).unwrap();
        assert!(changed);
        let state = values.fleet_state().unwrap();
        assert_eq!(state.get(Index::A), &XState::new("img", "n1", "A", "sc"));
        assert!(state.get(Index::B).is_empty());
    }

    #[test]
    fn keeps_existing_state() {
        let mut values = Values::new(json!({}));
        run(&[sts(Index::A, "n1")], &mut values).unwrap();
        let changed = run(&[sts(Index::A, "n2")], &mut values).unwrap();
        assert!(!changed);
        assert_eq!(values.fleet_state().unwrap().get(Index::A).node, "n1");
    }

    #[test]
    fn nothing_complete_changes_nothing() {
        let mut values = Values::new(json!({}));
        assert!(!run(&[sts(Index::C, "")], &mut values).unwrap());
        assert!(values.get("upmeter").is_none());
    }
}
