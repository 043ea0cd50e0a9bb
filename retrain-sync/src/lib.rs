//! # retrain-sync
//!
//! Working-copy and environment synchronization.
//!
//! Call [`repo::synchronize`] to land the managed repository's working copy
//! on the tracked branch, and [`env::sync_if_changed`] to rebuild the
//! declared environment when its declaration file changed since a revision.

pub mod env;
pub mod error;
pub mod repo;

pub use error::SyncError;
