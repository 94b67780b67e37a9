//! The objects the smoke-mini rescheduler reasons about

pub mod index;
pub mod state;
pub mod values;

pub use index::{Index, NAMESPACE};
pub use state::{FleetState, XState, EPHEMERAL_STORAGE_CLASS, NO_ZONE, is_ephemeral};
pub use values::Values;
