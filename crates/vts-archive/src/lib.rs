//! # vts-archive
//!
//! Append-only snapshot archives for the Sardonyx versioned dataset store.
//!
//! This crate provides:
//! - Immutable full-state snapshots with commit metadata
//! - The `Archive`: one dataset's version history with commit and checkout
//! - Archive managers (volatile and on-disk) that own archive lifecycles

pub mod archive;
pub mod error;
pub mod manager;
pub mod persist;
pub mod snapshot;

pub use archive::Archive;
pub use error::{ArchiveError, Result};
pub use manager::{ArchiveDescriptor, ArchiveId, ArchiveManager, VolatileArchiveManager};
pub use persist::PersistentArchiveManager;
pub use snapshot::{timestamp_ms, Snapshot, SnapshotDescriptor};
