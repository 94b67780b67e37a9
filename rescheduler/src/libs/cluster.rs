//! The cluster operations a rescheduler needs

use smokemini::Error;
use smokemini::models::Values;

use crate::libs::patches::Patches;
use crate::libs::snapshot::{Snapshots, Volume};

/// The methods required to back a rescheduler
#[async_trait::async_trait]
pub trait Cluster: Send + Sync {
    /// Observe every object a reschedule tick reads
    async fn snapshots(&self) -> Result<Snapshots, Error>;

    /// Observe every persistent volume in the cluster
    async fn volumes(&self) -> Result<Vec<Volume>, Error>;

    /// Load the persisted smoke-mini values
    async fn load_values(&mut self) -> Result<Values, Error>;

    /// Persist the smoke-mini values in a single atomic write
    ///
    /// # Arguments
    ///
    /// * `values` - The values to persist
    async fn save_values(&mut self, values: &Values) -> Result<(), Error>;

    /// Apply queued deletes ignoring objects that are already gone
    ///
    /// Returns the number of objects that were deleted.
    ///
    /// # Arguments
    ///
    /// * `patches` - The deletes to apply
    async fn flush(&mut self, patches: &Patches) -> Result<usize, Error>;
}
