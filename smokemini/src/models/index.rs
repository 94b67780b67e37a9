//! The stable identity of a probe and the names derived from it

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The default namespace our probes live in
pub const NAMESPACE: &str = "d8-upmeter";

/// The prefix shared by every probe statefulset
const STATEFULSET_PREFIX: &str = "smoke-mini";

/// The volume claim template name used by the probe statefulsets
pub const DISK: &str = "disk";

/// One of the five probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Index {
    A,
    B,
    C,
    D,
    E,
}

impl Index {
    /// Every probe index in order
    pub const ALL: [Index; 5] = [Index::A, Index::B, Index::C, Index::D, Index::E];

    /// The number of probes we always keep
    pub const FLEET_SIZE: usize = 5;

    /// Get this index as a str
    pub fn as_str(&self) -> &'static str {
        match self {
            Index::A => "a",
            Index::B => "b",
            Index::C => "c",
            Index::D => "d",
            Index::E => "e",
        }
    }

    /// The name of the statefulset for this probe
    pub fn statefulset_name(&self) -> String {
        format!("{STATEFULSET_PREFIX}-{}", self.as_str())
    }

    /// The name of the only pod of this probe
    pub fn pod_name(&self) -> String {
        format!("{}-0", self.statefulset_name())
    }

    /// The name of the persistent volume claim of this probe
    pub fn pvc_name(&self) -> String {
        format!("{DISK}-{}", self.pod_name())
    }

    /// Get the index from a statefulset, pod, or pvc name
    ///
    /// The index is the third dash separated token once any pvc prefix is stripped.
    ///
    /// # Arguments
    ///
    /// * `name` - The object name to parse
    pub fn from_name(name: &str) -> Result<Self, Error> {
        // pvc names are the pod name behind the claim template name
        let trimmed = name
            .strip_prefix(DISK)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(name);
        match trimmed.split('-').nth(2) {
            Some(token) => token.parse(),
            None => Err(Error::new(format!("{name} is not a smoke-mini object name"))),
        }
    }
}

impl FromStr for Index {
    type Err = Error;

    /// Parse a single letter index
    ///
    /// # Arguments
    ///
    /// * `raw` - The string to parse
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "a" => Ok(Index::A),
            "b" => Ok(Index::B),
            "c" => Ok(Index::C),
            "d" => Ok(Index::D),
            "e" => Ok(Index::E),
            _ => Err(Error::new(format!("{raw} is not a smoke-mini index"))),
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Index {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Index {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|_| serde::de::Error::custom(format!("unknown smoke-mini index {raw}")))
    }
}
