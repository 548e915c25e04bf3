//! Versioned snapshot store for cluster state.
//!
//! One current [`Snapshot`] per entity collection, replaced atomically
//! by [`Collection::publish`]. Readers never observe a collection
//! mid-update; the previous snapshot is retained only for diffing.

pub mod snapshot;
pub mod store;

pub use snapshot::{Keyed, Snapshot, SnapshotDiff};
pub use store::{Collection, StateStore};
