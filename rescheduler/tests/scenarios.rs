//! Tests whole reschedule ticks against frozen snapshots

use chrono::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeMap, HashMap, HashSet};
use smokemini::models::{FleetState, Index, Values, XState};
use smokemini::{Error, is, is_in};
use smokemini_rescheduler::libs::patches::Patches;
use smokemini_rescheduler::libs::reschedule::{self, Outcome};
use smokemini_rescheduler::libs::snapshot::{Pdb, Pod, Snapshots};
use smokemini_rescheduler::test_utilities::{
    self, IMAGE, nodes, pod, pods_for, pvc, scheduled, statefulset,
};

/// A single distinct node per probe in one zone
const SPREAD: [(&str, &str); 5] = [("n1", "A"), ("n2", "A"), ("n3", "A"), ("n4", "A"), ("n5", "A")];

/// Run one tick with a fixed seed and time
fn tick(snapshots: &Snapshots, values: &mut Values) -> Result<(Outcome, Patches), Error> {
    let mut patches = Patches::default();
    let mut rng = StdRng::seed_from_u64(42);
    let outcome = reschedule::run(
        snapshots,
        values,
        &mut patches,
        &mut rng,
        "d8-upmeter",
        test_utilities::now(),
    )?;
    Ok((outcome, patches))
}

/// Get the probes whose records differ between two states
fn changed(before: &FleetState, after: &FleetState) -> Vec<Index> {
    Index::ALL
        .iter()
        .copied()
        .filter(|index| before.get(*index) != after.get(*index))
        .collect()
}

/// Build a budget allowing some number of disruptions
fn pdb(disruptions_allowed: i32) -> Pdb {
    Pdb {
        name: "smoke-mini".to_owned(),
        disruptions_allowed,
    }
}

#[test]
fn first_placement_from_empty_state() -> Result<(), Error> {
    let snapshots = Snapshots {
        nodes: nodes(&["A", "A", "A", "A", "A"]),
        ..Default::default()
    };
    let mut values = test_utilities::values(None, Some("sc"));
    let (outcome, patches) = tick(&snapshots, &mut values)?;
    let state = values.fleet_state()?;
    // the first undeployed probe is placed
    let record = state.get(Index::A);
    is_in!(["n1", "n2", "n3", "n4", "n5"], record.node.as_str());
    is!(record.zone.as_str(), "A");
    is!(record.image.as_str(), IMAGE);
    is!(record.storage_class.as_str(), "sc");
    is!(outcome, Outcome::Placed { index: Index::A, record: record.clone() });
    // nothing was deployed so nothing is deleted
    is!(patches.is_empty(), true);
    is!(changed(&FleetState::default(), &state), vec![Index::A]);
    Ok(())
}

#[test]
fn unschedulable_node_moves_probe() -> Result<(), Error> {
    let before = scheduled(&SPREAD, "sc");
    let mut snapshots = Snapshots {
        nodes: nodes(&["A", "A", "A", "A", "A"]),
        pods: pods_for(&before, 600),
        ..Default::default()
    };
    snapshots.nodes[2].schedulable = false;
    let mut values = test_utilities::values(Some(&before), Some("sc"));
    let (outcome, patches) = tick(&snapshots, &mut values)?;
    let after = values.fleet_state()?;
    is!(outcome.changed(), true);
    is!(changed(&before, &after), vec![Index::C]);
    is_in!(["n1", "n2", "n4", "n5"], after.get(Index::C).node.as_str());
    is!(after.get(Index::C).zone.as_str(), "A");
    // the pod is healthy and the zone is unchanged so the next pod observation drives cleanup
    is!(patches.is_empty(), true);
    Ok(())
}

#[test]
fn storage_class_change_migrates_one_probe_per_tick() -> Result<(), Error> {
    let original = scheduled(&SPREAD, "old");
    let snapshots = Snapshots {
        nodes: nodes(&["A", "A", "A", "A", "A"]),
        pods: pods_for(&original, 600),
        ..Default::default()
    };
    let mut values = test_utilities::values(Some(&original), Some("new"));
    let mut before = original.clone();
    for expected in Index::ALL {
        let (outcome, patches) = tick(&snapshots, &mut values)?;
        let after = values.fleet_state()?;
        is!(outcome.changed(), true);
        is!(changed(&before, &after), vec![expected]);
        is!(after.get(expected).storage_class.as_str(), "new");
        // a new storage class needs a new claim and so a new statefulset
        is!(patches.names("StatefulSet"), vec![expected.statefulset_name().as_str()]);
        is!(patches.names("PersistentVolumeClaim"), vec![expected.pvc_name().as_str()]);
        before = after;
    }
    // every probe is migrated so the fleet is left alone by the drift check
    is!(before.iter().all(|(_, record)| record.storage_class == "new"), true);
    Ok(())
}

#[test]
fn terminating_claim_outranks_balance() -> Result<(), Error> {
    let placements = [("n1", "A"), ("n2", "A"), ("n3", "B"), ("n4", "B"), ("n5", "C")];
    let before = scheduled(&placements, "sc");
    let snapshots = Snapshots {
        nodes: nodes(&["A", "A", "B", "B", "C"]),
        pods: pods_for(&before, 600),
        pvcs: Index::ALL
            .iter()
            .map(|index| pvc(*index, *index == Index::D))
            .collect(),
        ..Default::default()
    };
    let mut values = test_utilities::values(Some(&before), Some("sc"));
    let (outcome, patches) = tick(&snapshots, &mut values)?;
    let after = values.fleet_state()?;
    is!(changed(&before, &after), vec![Index::D]);
    // the zones are balanced so d stays in its zone on the emptiest other node
    is!(
        outcome,
        Outcome::Placed {
            index: Index::D,
            record: XState::new(IMAGE, "n3", "B", "sc"),
        }
    );
    is!(patches.is_empty(), true);
    Ok(())
}

#[test]
fn disruption_budget_blocks_healthy_churn() -> Result<(), Error> {
    let before = scheduled(&SPREAD, "sc");
    let snapshots = Snapshots {
        nodes: nodes(&["A", "A", "A", "A", "A"]),
        pods: pods_for(&before, 4 * 60),
        pdbs: vec![pdb(0)],
        ..Default::default()
    };
    let mut values = test_utilities::values(Some(&before), Some("sc"));
    let original = values.clone();
    let (outcome, patches) = tick(&snapshots, &mut values)?;
    is!(outcome.changed(), false);
    is!(matches!(outcome, Outcome::Skipped(_)), true);
    is!(values, original);
    is!(patches.is_empty(), true);
    Ok(())
}

#[test]
fn oldest_pod_rotates() -> Result<(), Error> {
    let before = scheduled(&SPREAD, "sc");
    let snapshots = Snapshots {
        nodes: nodes(&["A", "A", "A", "A", "A"]),
        pods: vec![
            pod(Index::A, "n1", true, 60),
            pod(Index::B, "n2", true, 5 * 60),
            pod(Index::C, "n3", true, 7 * 60),
            pod(Index::D, "n4", true, 6 * 60),
            pod(Index::E, "n5", true, 30),
        ],
        pdbs: vec![pdb(1)],
        ..Default::default()
    };
    let mut values = test_utilities::values(Some(&before), Some("sc"));
    let (_, patches) = tick(&snapshots, &mut values)?;
    let after = values.fleet_state()?;
    is!(changed(&before, &after), vec![Index::C]);
    is_in!(["n1", "n2", "n4", "n5"], after.get(Index::C).node.as_str());
    is!(patches.is_empty(), true);
    Ok(())
}

#[test]
fn young_fleet_is_left_alone() -> Result<(), Error> {
    let before = scheduled(&SPREAD, "sc");
    let snapshots = Snapshots {
        nodes: nodes(&["A", "A", "A", "A", "A"]),
        pods: pods_for(&before, 4 * 60),
        ..Default::default()
    };
    let mut values = test_utilities::values(Some(&before), Some("sc"));
    let (outcome, patches) = tick(&snapshots, &mut values)?;
    is!(matches!(outcome, Outcome::Skipped(_)), true);
    is!(values.fleet_state()?, before);
    is!(patches.is_empty(), true);
    Ok(())
}

#[test]
fn stuck_pod_is_replaced() -> Result<(), Error> {
    let before = scheduled(&SPREAD, "sc");
    let mut pods = pods_for(&before, 30);
    pods[1] = pod(Index::B, "n2", false, 120);
    let snapshots = Snapshots {
        nodes: nodes(&["A", "A", "A", "A", "A"]),
        pods,
        pdbs: vec![pdb(0)],
        ..Default::default()
    };
    let mut values = test_utilities::values(Some(&before), Some("sc"));
    let (_, patches) = tick(&snapshots, &mut values)?;
    is!(changed(&before, &values.fleet_state()?), vec![Index::B]);
    // the unready pod pins its statefulset but the claim can stay in its zone
    is!(patches.names("StatefulSet"), vec!["smoke-mini-b"]);
    is!(patches.names("PersistentVolumeClaim").is_empty(), true);
    Ok(())
}

#[test]
fn no_schedulable_node_skips() -> Result<(), Error> {
    let mut snapshots = Snapshots {
        nodes: nodes(&["A"]),
        ..Default::default()
    };
    snapshots.nodes[0].schedulable = false;
    let mut values = test_utilities::values(None, Some("sc"));
    let (outcome, patches) = tick(&snapshots, &mut values)?;
    is!(matches!(outcome, Outcome::Skipped(_)), true);
    is!(values.fleet_state()?.empty(), true);
    is!(patches.is_empty(), true);
    Ok(())
}

#[test]
fn disabled_does_nothing() -> Result<(), Error> {
    let snapshots = Snapshots {
        nodes: nodes(&["A"]),
        ..Default::default()
    };
    let mut values = test_utilities::values(None, Some("sc"));
    values.set("upmeter.smokeMiniDisabled", serde_json::json!(true));
    let original = values.clone();
    let (outcome, _) = tick(&snapshots, &mut values)?;
    is!(outcome, Outcome::Disabled);
    is!(values, original);
    Ok(())
}

#[test]
fn empty_state_waits_for_populate() -> Result<(), Error> {
    let snapshots = Snapshots {
        nodes: nodes(&["A"]),
        statefulsets: vec![statefulset(Index::A, "n1", "A")],
        ..Default::default()
    };
    let mut values = test_utilities::values(None, Some("sc"));
    let (outcome, patches) = tick(&snapshots, &mut values)?;
    is!(outcome, Outcome::AwaitingPopulate);
    is!(values.fleet_state()?.empty(), true);
    is!(patches.is_empty(), true);
    Ok(())
}

#[test]
fn missing_image_fails_the_tick() -> Result<(), Error> {
    let snapshots = Snapshots {
        nodes: nodes(&["A"]),
        ..Default::default()
    };
    let mut values = Values::default();
    let mut patches = Patches::default();
    let mut rng = StdRng::seed_from_u64(42);
    let result = reschedule::run(
        &snapshots,
        &mut values,
        &mut patches,
        &mut rng,
        "d8-upmeter",
        test_utilities::now(),
    );
    is!(result.is_err(), true);
    is!(values, Values::default());
    Ok(())
}

#[test]
fn invalid_state_fails_the_tick() -> Result<(), Error> {
    let snapshots = Snapshots::default();
    let mut values = test_utilities::values(None, Some("sc"));
    values.set("upmeter.internal.smokeMini.sts", serde_json::json!({"a": {"node": "n1"}}));
    let mut patches = Patches::default();
    let mut rng = StdRng::seed_from_u64(42);
    let result = reschedule::run(
        &snapshots,
        &mut values,
        &mut patches,
        &mut rng,
        "d8-upmeter",
        test_utilities::now(),
    );
    is!(matches!(result, Err(Error::InvalidState(_))), true);
    Ok(())
}

/// Tick until the fleet is left alone, recreating the pod of every moved probe
///
/// Returns how many placements were made.
///
/// # Arguments
///
/// * `snapshots` - The cluster objects, whose pods are rebuilt every tick
/// * `values` - The values to reschedule
/// * `created` - When the pod of each probe was created
/// * `clock` - The time of the next tick
/// * `rng` - The random source shared by every tick
fn settle(
    snapshots: &mut Snapshots,
    values: &mut Values,
    created: &mut HashMap<Index, DateTime<Utc>>,
    clock: &mut DateTime<Utc>,
    rng: &mut StdRng,
) -> Result<usize, Error> {
    for placements in 0..20 {
        let state = values.fleet_state()?;
        snapshots.pods = state
            .iter()
            .filter_map(|(index, record)| {
                created.get(&index).map(|created| Pod {
                    index,
                    node: record.node.clone(),
                    ready: true,
                    created: *created,
                })
            })
            .collect();
        let mut patches = Patches::default();
        let outcome = reschedule::run(snapshots, values, &mut patches, rng, "d8-upmeter", *clock)?;
        match outcome {
            Outcome::Placed { index, .. } => {
                created.insert(index, *clock);
            }
            Outcome::Skipped(_) => return Ok(placements),
            other => return Err(Error::new(format!("unexpected outcome {other:?}"))),
        }
        *clock += chrono::Duration::seconds(10);
    }
    Err(Error::new("fleet never settled"))
}

/// Count the probes in each zone
fn zones(state: &FleetState) -> BTreeMap<String, usize> {
    let mut zones = BTreeMap::default();
    for (_, record) in state.iter() {
        *zones.entry(record.zone.clone()).or_default() += 1;
    }
    zones
}

/// Get every distinct node hosting a probe
fn hosts(state: &FleetState) -> HashSet<String> {
    state.iter().map(|(_, record)| record.node.clone()).collect()
}

#[test]
fn fleet_converges_and_follows_image() -> Result<(), Error> {
    let mut snapshots = Snapshots {
        nodes: nodes(&["A", "A", "B", "B", "C"]),
        ..Default::default()
    };
    let mut values = test_utilities::values(None, Some("sc"));
    let mut created = HashMap::default();
    let mut clock = test_utilities::now();
    let mut rng = StdRng::seed_from_u64(42);
    // an empty fleet is placed one probe per tick and then left alone
    is!(settle(&mut snapshots, &mut values, &mut created, &mut clock, &mut rng)?, 5);
    let state = values.fleet_state()?;
    let expected: BTreeMap<String, usize> =
        [("A".to_owned(), 2), ("B".to_owned(), 2), ("C".to_owned(), 1)].into();
    is!(zones(&state), expected);
    is!(hosts(&state).len(), 5);
    // a new digest is picked up as the aged pods rotate
    values.set(
        "global.modulesImages.digests.upmeter.smokeMini",
        serde_json::json!("sha256:def"),
    );
    clock += chrono::Duration::seconds(10 * 60);
    is!(settle(&mut snapshots, &mut values, &mut created, &mut clock, &mut rng)?, 5);
    let state = values.fleet_state()?;
    is!(zones(&state), expected);
    is!(hosts(&state).len(), 5);
    let image = "registry.example.com/smoke-mini@sha256:def";
    is!(state.iter().all(|(_, record)| record.image == image), true);
    Ok(())
}

#[test]
fn moved_probe_avoids_occupied_nodes() -> Result<(), Error> {
    let placements = [("n1", "A"), ("n1", "A"), ("n2", "A"), ("n3", "A"), ("n4", "A")];
    let before = scheduled(&placements, "sc");
    let mut snapshots = Snapshots {
        nodes: nodes(&["A", "A", "A", "A", "A", "A"]),
        pods: pods_for(&before, 30),
        ..Default::default()
    };
    snapshots.nodes[0].schedulable = false;
    let mut values = test_utilities::values(Some(&before), Some("sc"));
    let (outcome, _) = tick(&snapshots, &mut values)?;
    let after = values.fleet_state()?;
    is!(outcome.changed(), true);
    is!(changed(&before, &after), vec![Index::A]);
    // only the empty nodes are left once occupied ones are filtered out
    is_in!(["n5", "n6"], after.get(Index::A).node.as_str());
    Ok(())
}
