//! The append-only snapshot archive for one dataset.
//!
//! An `Archive` is a cheap-to-clone handle sharing its state through an
//! `Arc`; every clone sees the same history. Writers serialize on a
//! per-archive mutex while readers proceed concurrently under a read lock.
//! A snapshot is assembled completely off to the side (and persisted first,
//! for on-disk archives) before it is published, so a checkout racing a
//! commit observes either the pre-commit or the post-commit state.

use crate::error::{ArchiveError, Result};
use crate::persist::ArchiveDir;
use crate::snapshot::{timestamp_ms, Snapshot, SnapshotDescriptor};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::debug;
use vts_core::diff::{diff, ChangeSet};
use vts_core::table::{RowIdAllocator, Table};

#[derive(Debug)]
pub(crate) struct ArchiveState {
    pub(crate) snapshots: Vec<Snapshot>,
    pub(crate) ids: RowIdAllocator,
}

/// Append-only ordered sequence of snapshots for one dataset.
#[derive(Clone, Debug)]
pub struct Archive {
    /// Primary key declaration; set at creation, immutable thereafter.
    primary_key: Option<Vec<String>>,
    state: Arc<RwLock<ArchiveState>>,
    /// At most one writer per archive at a time.
    commit_lock: Arc<Mutex<()>>,
    /// Backing directory for persistent archives.
    disk: Option<ArchiveDir>,
}

impl Archive {
    /// A fresh, empty in-memory archive.
    pub fn volatile(primary_key: Option<Vec<String>>) -> Self {
        Self::from_parts(primary_key, Vec::new(), RowIdAllocator::new(), None)
    }

    pub(crate) fn from_parts(
        primary_key: Option<Vec<String>>,
        snapshots: Vec<Snapshot>,
        ids: RowIdAllocator,
        disk: Option<ArchiveDir>,
    ) -> Self {
        Self {
            primary_key,
            state: Arc::new(RwLock::new(ArchiveState { snapshots, ids })),
            commit_lock: Arc::new(Mutex::new(())),
            disk,
        }
    }

    pub fn primary_key(&self) -> Option<&[String]> {
        self.primary_key.as_deref()
    }

    pub fn latest_version(&self) -> Option<u64> {
        let state = self.state.read();
        state.snapshots.last().map(|s| s.version)
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().snapshots.is_empty()
    }

    /// Append a new snapshot derived from `table`, returning its version.
    ///
    /// The differ runs against the latest snapshot; an empty archive treats
    /// every row as inserted. On any failure (schema mismatch, storage
    /// fault) the archive stays at its last published version and the
    /// row-identifier allocator is not advanced.
    pub fn commit(&self, table: &Table, action: Option<serde_json::Value>) -> Result<u64> {
        let _writer = self.commit_lock.lock();

        // Diff against a clone of the allocator; it only replaces the real
        // one once the snapshot is fully durable.
        let (version, snapshot, ids) = {
            let state = self.state.read();
            let mut ids = state.ids.clone();
            let previous = state.snapshots.last().map(|s| s.data());
            let diffed = diff(previous, table, self.primary_key.as_deref(), &mut ids)?;
            let version = state.snapshots.len() as u64;
            let snapshot = Snapshot {
                version,
                created_at: timestamp_ms(),
                action,
                schema: table.schema().clone(),
                rows: diffed.rows,
            };
            log_changes(version, &diffed.changes);
            (version, snapshot, ids)
        };

        if let Some(dir) = &self.disk {
            dir.write_snapshot(&snapshot, ids.next_id())?;
        }

        let mut state = self.state.write();
        state.snapshots.push(snapshot);
        state.ids = ids;
        Ok(version)
    }

    /// Materialize a version; `None` means latest.
    pub fn checkout(&self, version: Option<u64>) -> Result<Table> {
        let state = self.state.read();
        let snapshot = match version {
            None => state.snapshots.last(),
            Some(v) => state.snapshots.get(v as usize),
        };
        let snapshot = snapshot.ok_or_else(|| ArchiveError::UnknownVersion {
            version: version.unwrap_or(0),
            latest: state.snapshots.last().map(|s| s.version),
        })?;
        debug!(version = snapshot.version, rows = snapshot.rows.len(), "checkout");
        Ok(snapshot.to_table())
    }

    /// Descriptors for every version, oldest first.
    pub fn snapshots(&self) -> Vec<SnapshotDescriptor> {
        let state = self.state.read();
        state.snapshots.iter().map(|s| s.descriptor()).collect()
    }
}

fn log_changes(version: u64, changes: &ChangeSet) {
    debug!(
        version,
        unchanged = changes.unchanged.len(),
        updated = changes.updated.len(),
        inserted = changes.inserted.len(),
        deleted = changes.deleted.len(),
        "computed snapshot diff"
    );
}
