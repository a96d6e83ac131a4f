//! Archive lifecycle management.
//!
//! An archive manager owns the registry of named archives and hands out
//! `Archive` handles. Persistence mode is a property of the manager and
//! invisible to everything above it.

use crate::archive::Archive;
use crate::error::{ArchiveError, Result};
use crate::snapshot::timestamp_ms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;
use ulid::Ulid;

/// Unique identifier for an archive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchiveId(pub String);

impl ArchiveId {
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for ArchiveId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptor of one managed archive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDescriptor {
    pub id: ArchiveId,
    pub name: String,
    pub primary_key: Option<Vec<String>>,
    /// Creation timestamp, milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// Registry of archives: list, resolve, create and delete.
pub trait ArchiveManager {
    /// Descriptors for every managed archive, in identifier order.
    fn list(&self) -> Vec<ArchiveDescriptor>;

    /// Resolve an archive handle.
    fn get(&self, id: &ArchiveId) -> Result<Archive>;

    /// Allocate a fresh, empty archive.
    fn create(&mut self, name: &str, primary_key: Option<Vec<String>>)
        -> Result<ArchiveDescriptor>;

    /// Release every resource of an archive. Irreversible.
    fn delete(&mut self, id: &ArchiveId) -> Result<()>;
}

/// In-memory archive manager; nothing survives the process.
#[derive(Debug, Default)]
pub struct VolatileArchiveManager {
    archives: BTreeMap<ArchiveId, (ArchiveDescriptor, Archive)>,
}

impl VolatileArchiveManager {
    pub fn new() -> Self {
        Self {
            archives: BTreeMap::new(),
        }
    }
}

impl ArchiveManager for VolatileArchiveManager {
    fn list(&self) -> Vec<ArchiveDescriptor> {
        self.archives.values().map(|(d, _)| d.clone()).collect()
    }

    fn get(&self, id: &ArchiveId) -> Result<Archive> {
        self.archives
            .get(id)
            .map(|(_, archive)| archive.clone())
            .ok_or_else(|| ArchiveError::UnknownArchive(id.clone()))
    }

    fn create(
        &mut self,
        name: &str,
        primary_key: Option<Vec<String>>,
    ) -> Result<ArchiveDescriptor> {
        let descriptor = ArchiveDescriptor {
            id: ArchiveId::new(),
            name: name.to_string(),
            primary_key: primary_key.clone(),
            created_at: timestamp_ms(),
        };
        let archive = Archive::volatile(primary_key);
        info!(archive = %descriptor.id, name, "created volatile archive");
        self.archives
            .insert(descriptor.id.clone(), (descriptor.clone(), archive));
        Ok(descriptor)
    }

    fn delete(&mut self, id: &ArchiveId) -> Result<()> {
        self.archives
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ArchiveError::UnknownArchive(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vts_core::schema::Schema;
    use vts_core::table::Table;
    use vts_core::value::Value;

    #[test]
    fn create_get_delete_cycle() {
        let mut manager = VolatileArchiveManager::new();
        let descriptor = manager
            .create("people", Some(vec!["id".to_string()]))
            .unwrap();
        assert_eq!(manager.list().len(), 1);

        let archive = manager.get(&descriptor.id).unwrap();
        assert_eq!(archive.primary_key(), Some(&["id".to_string()][..]));

        manager.delete(&descriptor.id).unwrap();
        assert!(manager.list().is_empty());
        assert!(matches!(
            manager.get(&descriptor.id),
            Err(ArchiveError::UnknownArchive(_))
        ));
    }

    #[test]
    fn handles_resolve_to_shared_state() {
        let mut manager = VolatileArchiveManager::new();
        let descriptor = manager.create("data", None).unwrap();

        let first = manager.get(&descriptor.id).unwrap();
        let mut table = Table::new(Schema::of(["x"]));
        table.push_row([Value::Int(1)]);
        first.commit(&table, None).unwrap();

        let second = manager.get(&descriptor.id).unwrap();
        assert_eq!(second.latest_version(), Some(0));
    }

    #[test]
    fn deleting_unknown_archive_is_an_error() {
        let mut manager = VolatileArchiveManager::new();
        let missing = ArchiveId::new();
        assert!(matches!(
            manager.delete(&missing),
            Err(ArchiveError::UnknownArchive(_))
        ));
    }
}
