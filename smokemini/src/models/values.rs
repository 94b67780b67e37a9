//! The typed configuration container shared with the templating layer
//!
//! Values are a nested document addressed by dotted paths such as `upmeter.smokeMini.storageClass`.
//! The rescheduler reads its settings from this document and persists the fleet state back into it.

use serde_json::{Map, Value};

use super::FleetState;
use crate::Error;

/// Disables the rescheduler entirely
pub const SMOKE_MINI_DISABLED: &str = "upmeter.smokeMiniDisabled";
/// The smoke-mini settings submap
pub const SMOKE_MINI: &str = "upmeter.smokeMini";
/// The smoke-mini storage class override
pub const SMOKE_MINI_STORAGE_CLASS: &str = "upmeter.smokeMini.storageClass";
/// The cluster wide module storage class
pub const MODULES_STORAGE_CLASS: &str = "global.modules.storageClass";
/// The base of the image registry
pub const REGISTRY_BASE: &str = "global.modulesImages.registry.base";
/// The digest of the smoke-mini image
pub const SMOKE_MINI_DIGEST: &str = "global.modulesImages.digests.upmeter.smokeMini";
/// The persisted fleet state
pub const FLEET_STATE: &str = "upmeter.internal.smokeMini.sts";

/// A values document
#[derive(Debug, Clone, PartialEq)]
pub struct Values {
    /// The raw document
    doc: Value,
}

impl Default for Values {
    fn default() -> Self {
        Values {
            doc: Value::Object(Map::default()),
        }
    }
}

impl Values {
    /// Wrap a raw document
    ///
    /// # Arguments
    ///
    /// * `doc` - The document to wrap
    pub fn new(doc: Value) -> Self {
        // an empty document is just an empty map
        match doc {
            Value::Null => Values::default(),
            doc => Values { doc },
        }
    }

    /// Load values from a yaml string
    ///
    /// # Arguments
    ///
    /// * `raw` - The yaml to parse
    pub fn from_yaml(raw: &str) -> Result<Self, Error> {
        let doc: Value = serde_yaml::from_str(raw)?;
        Ok(Values::new(doc))
    }

    /// Serialize these values to yaml
    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(serde_yaml::to_string(&self.doc)?)
    }

    /// Get the raw document
    pub fn doc(&self) -> &Value {
        &self.doc
    }

    /// Get a value at a dotted path
    ///
    /// # Arguments
    ///
    /// * `path` - The dotted path to get
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.doc, |current, key| current.as_object()?.get(key))
    }

    /// Get a boolean at a dotted path defaulting to false
    ///
    /// # Arguments
    ///
    /// * `path` - The dotted path to get
    pub fn get_bool(&self, path: &str) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Get a non empty string at a dotted path
    ///
    /// Booleans are read as their string form so `storageClass: false` reads as `"false"`.
    ///
    /// # Arguments
    ///
    /// * `path` - The dotted path to get
    pub fn get_string(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(raw) if !raw.is_empty() => Some(raw.clone()),
            Value::Bool(raw) => Some(raw.to_string()),
            _ => None,
        }
    }

    /// Set a value at a dotted path creating any missing maps along the way
    ///
    /// # Arguments
    ///
    /// * `path` - The dotted path to set
    /// * `value` - The value to set
    pub fn set(&mut self, path: &str, value: Value) {
        let mut keys: Vec<&str> = path.split('.').collect();
        // an empty path has nothing to set
        let Some(last) = keys.pop() else {
            return;
        };
        let mut current = &mut self.doc;
        for key in keys {
            // replace anything that is not a map with a map
            if !current.is_object() {
                *current = Value::Object(Map::default());
            }
            let Value::Object(map) = current else {
                return;
            };
            current = map
                .entry(key.to_owned())
                .or_insert_with(|| Value::Object(Map::default()));
        }
        if !current.is_object() {
            *current = Value::Object(Map::default());
        }
        if let Value::Object(map) = current {
            map.insert(last.to_owned(), value);
        }
    }

    /// Remove a value at a dotted path
    ///
    /// # Arguments
    ///
    /// * `path` - The dotted path to remove
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let (parent, last) = match path.rsplit_once('.') {
            Some((parent, last)) => (Some(parent), last),
            None => (None, path),
        };
        // walk to the parent map of this path
        let mut current = &mut self.doc;
        if let Some(parent) = parent {
            for key in parent.split('.') {
                current = current.as_object_mut()?.get_mut(key)?;
            }
        }
        current.as_object_mut()?.remove(last)
    }

    /// Whether smoke-mini is disabled
    pub fn smoke_mini_disabled(&self) -> bool {
        self.get_bool(SMOKE_MINI_DISABLED)
    }

    /// The smoke-mini specific storage class override
    pub fn smoke_mini_storage_class(&self) -> Option<String> {
        self.get_string(SMOKE_MINI_STORAGE_CLASS)
    }

    /// The cluster wide module storage class override
    pub fn modules_storage_class(&self) -> Option<String> {
        self.get_string(MODULES_STORAGE_CLASS)
    }

    /// Build the smoke-mini image reference from the registry and digest
    pub fn image(&self) -> Result<String, Error> {
        let registry = self
            .get_string(REGISTRY_BASE)
            .ok_or_else(|| Error::new(format!("{REGISTRY_BASE} is not set")))?;
        let digest = self
            .get_string(SMOKE_MINI_DIGEST)
            .ok_or_else(|| Error::new(format!("{SMOKE_MINI_DIGEST} is not set")))?;
        Ok(format!("{registry}@{digest}"))
    }

    /// Get the persisted fleet state
    pub fn fleet_state(&self) -> Result<FleetState, Error> {
        FleetState::parse(self.get(FLEET_STATE).cloned().unwrap_or(Value::Null))
    }

    /// Overwrite the persisted fleet state
    ///
    /// # Arguments
    ///
    /// * `state` - The state to persist
    pub fn set_fleet_state(&mut self, state: &FleetState) -> Result<(), Error> {
        let value = state.to_value()?;
        self.set(FLEET_STATE, value);
        Ok(())
    }
}
