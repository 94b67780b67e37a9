//! Filters candidate nodes down to the one a probe should be placed on

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashMap};

use smokemini::models::{FleetState, Index};

use crate::libs::snapshot::Node;

/// Narrows a list of candidate nodes for a probe
pub trait NodeFilter {
    /// Filter the candidate nodes for a probe
    ///
    /// # Arguments
    ///
    /// * `nodes` - The remaining candidate nodes
    /// * `x` - The probe being placed
    fn filter(&mut self, nodes: Vec<Node>, x: Index) -> Vec<Node>;
}

/// An ordered list of node filters
pub struct NodePipe<'a> {
    /// The filters to apply in order
    filters: Vec<Box<dyn NodeFilter + 'a>>,
}

impl<'a> NodePipe<'a> {
    /// Build a new node filter pipeline
    ///
    /// # Arguments
    ///
    /// * `filters` - The filters to apply in order
    pub fn new(filters: Vec<Box<dyn NodeFilter + 'a>>) -> Self {
        NodePipe { filters }
    }

    /// Apply every filter in order
    ///
    /// # Arguments
    ///
    /// * `nodes` - The nodes to start from
    /// * `x` - The probe being placed
    pub fn filter(&mut self, nodes: &[Node], x: Index) -> Vec<Node> {
        let mut nodes = nodes.to_vec();
        for filter in self.filters.iter_mut() {
            // once we are out of candidates there is nothing left to narrow
            if nodes.is_empty() {
                break;
            }
            nodes = filter.filter(nodes, x);
        }
        nodes
    }
}

/// Drops nodes that cannot accept new probes
pub struct Available;

impl NodeFilter for Available {
    fn filter(&mut self, mut nodes: Vec<Node>, _x: Index) -> Vec<Node> {
        nodes.retain(|node| node.schedulable);
        nodes
    }
}

/// Split a number of probes across zones proportionally to their node counts
///
/// Zones fill in layers. Each layer hands one probe to every zone with capacity left and then
/// consumes the smallest remaining capacity from all of them. Once capacities even out every zone
/// takes probes round robin in order. The input is not modified.
///
/// # Arguments
///
/// * `total` - The number of probes to split
/// * `counts` - The node count of each zone
pub fn spread(total: usize, counts: &[usize]) -> Vec<usize> {
    let mut want = vec![0; counts.len()];
    if counts.is_empty() || total == 0 {
        return want;
    }
    let mut demand: Vec<i64> = counts.iter().map(|count| *count as i64).collect();
    let mut left = total;
    while left > 0 {
        let uniform = demand.windows(2).all(|pair| pair[0] == pair[1]);
        let mut accepting: Vec<usize> = (0..demand.len())
            .filter(|i| uniform || demand[*i] > 0)
            .collect();
        // every zone accepts if none would
        if accepting.is_empty() {
            accepting = (0..demand.len()).collect();
        }
        for i in &accepting {
            if left == 0 {
                break;
            }
            want[*i] += 1;
            left -= 1;
        }
        let layer = accepting
            .iter()
            .map(|i| demand[*i])
            .min()
            .unwrap_or(0)
            .max(0);
        for i in &accepting {
            demand[*i] -= layer;
        }
    }
    want
}

/// Keeps only the nodes in the zone that most needs another probe
pub struct BestZone<'a> {
    /// The current fleet state
    state: &'a FleetState,
}

impl<'a> BestZone<'a> {
    /// Build a zone filter
    ///
    /// # Arguments
    ///
    /// * `state` - The current fleet state
    pub fn new(state: &'a FleetState) -> Self {
        BestZone { state }
    }

    /// Pick the zone a probe should land in
    ///
    /// A probe stays in its zone while that zone is not over its fair share. Otherwise the first
    /// zone by name that is under its fair share is used.
    ///
    /// # Arguments
    ///
    /// * `nodes` - The candidate nodes
    /// * `x` - The probe being placed
    pub fn select_zone(&self, nodes: &[Node], x: Index) -> String {
        // count the candidate nodes in each zone
        let mut capacity: BTreeMap<&str, usize> = BTreeMap::default();
        for node in nodes {
            *capacity.entry(node.zone.as_str()).or_default() += 1;
        }
        let counts: Vec<usize> = capacity.values().copied().collect();
        let want = spread(Index::FLEET_SIZE, &counts);
        // count the probes currently in each zone
        let mut assigned: HashMap<&str, i64> = HashMap::default();
        for (_, record) in self.state.iter() {
            *assigned.entry(record.zone.as_str()).or_default() += 1;
        }
        let demand: BTreeMap<&str, i64> = capacity
            .keys()
            .zip(want.iter())
            .map(|(zone, want)| {
                let current = assigned.get(zone).copied().unwrap_or(0);
                (*zone, *want as i64 - current)
            })
            .collect();
        let current = self.state.get(x).zone.as_str();
        // stay put unless our zone is overcrowded
        if demand.get(current).is_some_and(|demand| *demand >= 0) {
            return current.to_owned();
        }
        match demand.iter().find(|(_, demand)| **demand > 0) {
            Some((zone, _)) => (*zone).to_owned(),
            None => current.to_owned(),
        }
    }
}

impl NodeFilter for BestZone<'_> {
    fn filter(&mut self, mut nodes: Vec<Node>, x: Index) -> Vec<Node> {
        let zone = self.select_zone(&nodes, x);
        nodes.retain(|node| node.zone == zone);
        nodes
    }
}

/// Keeps the nodes hosting the fewest other probes
pub struct MinStatefulSets<'a> {
    /// The current fleet state
    state: &'a FleetState,
}

impl<'a> MinStatefulSets<'a> {
    /// Build a probe density filter
    ///
    /// # Arguments
    ///
    /// * `state` - The current fleet state
    pub fn new(state: &'a FleetState) -> Self {
        MinStatefulSets { state }
    }
}

impl NodeFilter for MinStatefulSets<'_> {
    fn filter(&mut self, nodes: Vec<Node>, x: Index) -> Vec<Node> {
        let current = self.state.get(x).node.as_str();
        // a probe is only left on its node when there is nowhere else to go
        let elsewhere = nodes.iter().any(|node| node.name != current);
        let mut table: HashMap<&str, usize> = nodes
            .iter()
            .map(|node| node.name.as_str())
            .filter(|name| !elsewhere || *name != current)
            .map(|name| (name, 0))
            .collect();
        if table.is_empty() {
            return nodes
                .into_iter()
                .filter(|node| node.name == current)
                .collect();
        }
        // count the other probes on each candidate
        for (index, record) in self.state.iter() {
            if index == x {
                continue;
            }
            if let Some(count) = table.get_mut(record.node.as_str()) {
                *count += 1;
            }
        }
        let min = table.values().copied().min().unwrap_or(0);
        let keep: Vec<String> = table
            .iter()
            .filter(|(_, count)| **count == min)
            .map(|(name, _)| (*name).to_owned())
            .collect();
        nodes
            .into_iter()
            .filter(|node| keep.contains(&node.name))
            .collect()
    }
}

/// Randomizes the order of the remaining candidates
pub struct Shuffle<'r, R: Rng> {
    /// The random source for this tick
    rng: &'r mut R,
}

impl<'r, R: Rng> Shuffle<'r, R> {
    /// Build a shuffling filter
    ///
    /// # Arguments
    ///
    /// * `rng` - The random source for this tick
    pub fn new(rng: &'r mut R) -> Self {
        Shuffle { rng }
    }
}

impl<R: Rng> NodeFilter for Shuffle<'_, R> {
    fn filter(&mut self, mut nodes: Vec<Node>, _x: Index) -> Vec<Node> {
        nodes.shuffle(&mut *self.rng);
        nodes
    }
}
