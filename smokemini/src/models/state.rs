//! The persisted desired state of every probe
//!
//! This state is the source of truth across reconciliation ticks. Observed cluster objects only
//! ever seed it once while it is completely empty.

use std::collections::BTreeMap;

use super::Index;
use crate::Error;

/// The storage class meaning "no storage class, use an ephemeral volume"
pub const EPHEMERAL_STORAGE_CLASS: &str = "false";

/// The zone used for nodes and statefulsets without a zone label
pub const NO_ZONE: &str = "NONE";

/// Check if a storage class is the ephemeral volume sentinel
///
/// # Arguments
///
/// * `storage_class` - The storage class to check
pub fn is_ephemeral(storage_class: &str) -> bool {
    storage_class == EPHEMERAL_STORAGE_CLASS
}

/// The desired state of a single probe
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct XState {
    /// The container image to run
    #[serde(default)]
    pub image: String,
    /// The node this probe is placed on
    #[serde(default)]
    pub node: String,
    /// The zone of that node
    #[serde(default)]
    pub zone: String,
    /// The storage class for this probes disk
    #[serde(default, rename = "storageClass")]
    pub storage_class: String,
}

impl XState {
    /// Create a new scheduled record
    ///
    /// # Arguments
    ///
    /// * `image` - The image to run
    /// * `node` - The node to run on
    /// * `zone` - The zone of that node
    /// * `storage_class` - The storage class to use
    pub fn new<I, N, Z, S>(image: I, node: N, zone: Z, storage_class: S) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        Z: Into<String>,
        S: Into<String>,
    {
        XState {
            image: image.into(),
            node: node.into(),
            zone: zone.into(),
            storage_class: storage_class.into(),
        }
    }

    /// Get the four fields of this record
    fn fields(&self) -> [&str; 4] {
        [&self.image, &self.node, &self.zone, &self.storage_class]
    }

    /// Whether every field is blank
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|field| field.is_empty())
    }

    /// Whether every field is set
    pub fn is_scheduled(&self) -> bool {
        self.fields().iter().all(|field| !field.is_empty())
    }
}

/// The desired state of all five probes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetState {
    /// The record for each probe index
    records: BTreeMap<Index, XState>,
}

impl Default for FleetState {
    /// Create a state where every probe is undeployed
    fn default() -> Self {
        let records = Index::ALL
            .iter()
            .map(|index| (*index, XState::default()))
            .collect();
        FleetState { records }
    }
}

impl FleetState {
    /// Build a fleet state from a serialized value
    ///
    /// Missing indexes are treated as undeployed probes, while unknown indexes and partially
    /// filled records are rejected.
    ///
    /// # Arguments
    ///
    /// * `value` - The serialized state to parse
    pub fn parse(value: serde_json::Value) -> Result<Self, Error> {
        // a null value means nothing was ever persisted
        if value.is_null() {
            return Ok(FleetState::default());
        }
        // deserialize the raw records
        let raw: BTreeMap<Index, XState> = serde_json::from_value(value)
            .map_err(|err| Error::invalid_state(format!("failed to parse fleet state: {err}")))?;
        // start from an empty state so every index always exists
        let mut state = FleetState::default();
        for (index, record) in raw {
            // reject any records that are only partially filled
            if !record.is_empty() && !record.is_scheduled() {
                return Err(Error::invalid_state(format!(
                    "record {index} is partially filled: {record:?}"
                )));
            }
            state.records.insert(index, record);
        }
        Ok(state)
    }

    /// Serialize this state into a value
    pub fn to_value(&self) -> Result<serde_json::Value, Error> {
        Ok(serde_json::to_value(&self.records)?)
    }

    /// Whether every record is empty
    pub fn empty(&self) -> bool {
        self.records.values().all(XState::is_empty)
    }

    /// Get the record for a specific probe
    ///
    /// # Arguments
    ///
    /// * `index` - The probe to get
    pub fn get(&self, index: Index) -> &XState {
        // every index is always present so this lookup can never miss
        &self.records[&index]
    }

    /// Replace the record for a specific probe
    ///
    /// # Arguments
    ///
    /// * `index` - The probe to update
    /// * `record` - The new record for this probe
    pub fn set(&mut self, index: Index, record: XState) {
        self.records.insert(index, record);
    }

    /// Iterate over every probe and its record in index order
    pub fn iter(&self) -> impl Iterator<Item = (Index, &XState)> {
        self.records.iter().map(|(index, record)| (*index, record))
    }

    /// Overwrite records with observed state if this state is completely empty
    ///
    /// Returns whether any record was written.
    ///
    /// # Arguments
    ///
    /// * `observed` - The observed records by index
    pub fn populate<I>(&mut self, observed: I) -> bool
    where
        I: IntoIterator<Item = (Index, XState)>,
    {
        // never overwrite a state that has already been decided on
        if !self.empty() {
            return false;
        }
        let mut populated = false;
        for (index, record) in observed {
            self.records.insert(index, record);
            populated = true;
        }
        populated
    }
}
