//! Real-time bed board: denormalized snapshots pushed to subscribed listeners.

pub mod snapshot;
pub mod subscription;
pub mod synchronizer;

pub use snapshot::{build_snapshot, occupancy_summary};
pub use subscription::{SnapshotCallback, SubscriptionHandle};
pub use synchronizer::BedSynchronizer;
