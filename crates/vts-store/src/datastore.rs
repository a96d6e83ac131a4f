//! The dataset-facing datastore contract.
//!
//! A datastore binds one archive to one metadata store and speaks in
//! tables: commits return the materialized result so callers never juggle
//! version numbers unless they want to. The direct implementation and the
//! caching decorator are independent implementations of the same trait,
//! composed by construction.

use crate::metadata::{AnnotationDoc, MetadataStore, MetadataStoreFactory};
use std::sync::Arc;
use vts_archive::error::{ArchiveError, Result};
use vts_archive::{Archive, SnapshotDescriptor};
use vts_core::table::{RowId, Table};

/// Maintains the snapshot history of one dataset.
///
/// This layer adds no failure modes of its own; unknown versions and
/// storage faults surface as `ArchiveError`.
pub trait Datastore: Send + Sync {
    /// Append a new version and return its materialized table.
    fn commit(&self, table: &Table, action: Option<serde_json::Value>) -> Result<Table>;

    /// Materialize a version; `None` means latest.
    fn checkout(&self, version: Option<u64>) -> Result<Table>;

    /// History listing, oldest first.
    fn snapshots(&self) -> Vec<SnapshotDescriptor>;

    /// Annotations of a version; `None` binds to the latest.
    fn metadata(&self, version: Option<u64>) -> Result<SnapshotMetadata>;

    /// Version of the most recent snapshot, if any.
    fn latest_version(&self) -> Option<u64>;
}

/// Annotation handle bound to one validated snapshot version.
pub struct SnapshotMetadata {
    version: u64,
    store: Box<dyn MetadataStore>,
}

impl SnapshotMetadata {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn read(&self, column: Option<usize>, row: Option<RowId>) -> Result<AnnotationDoc> {
        self.store.read(column, row)
    }

    pub fn write(
        &self,
        doc: AnnotationDoc,
        column: Option<usize>,
        row: Option<RowId>,
    ) -> Result<AnnotationDoc> {
        self.store.write(doc, column, row)
    }
}

/// Datastore backed directly by an archive.
#[derive(Clone)]
pub struct ArchiveDatastore {
    archive: Archive,
    metadata: Arc<dyn MetadataStoreFactory>,
}

impl ArchiveDatastore {
    pub fn new(archive: Archive, metadata: Arc<dyn MetadataStoreFactory>) -> Self {
        Self { archive, metadata }
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    fn resolve_version(&self, version: Option<u64>) -> Result<u64> {
        let latest = self.archive.latest_version();
        match version {
            None => latest.ok_or(ArchiveError::UnknownVersion {
                version: 0,
                latest: None,
            }),
            Some(v) if Some(v) <= latest => Ok(v),
            Some(v) => Err(ArchiveError::UnknownVersion { version: v, latest }),
        }
    }
}

impl Datastore for ArchiveDatastore {
    fn commit(&self, table: &Table, action: Option<serde_json::Value>) -> Result<Table> {
        let version = self.archive.commit(table, action)?;
        self.archive.checkout(Some(version))
    }

    fn checkout(&self, version: Option<u64>) -> Result<Table> {
        self.archive.checkout(version)
    }

    fn snapshots(&self) -> Vec<SnapshotDescriptor> {
        self.archive.snapshots()
    }

    fn metadata(&self, version: Option<u64>) -> Result<SnapshotMetadata> {
        let version = self.resolve_version(version)?;
        Ok(SnapshotMetadata {
            version,
            store: self.metadata.store(version),
        })
    }

    fn latest_version(&self) -> Option<u64> {
        self.archive.latest_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::VolatileMetadataStoreFactory;
    use vts_core::schema::Schema;
    use vts_core::value::Value;

    fn store() -> ArchiveDatastore {
        ArchiveDatastore::new(
            Archive::volatile(Some(vec!["id".to_string()])),
            Arc::new(VolatileMetadataStoreFactory::new()),
        )
    }

    fn people() -> Table {
        let mut t = Table::new(Schema::of(["id", "name"]));
        t.push_row([Value::Int(1), Value::from("ann")]);
        t.push_row([Value::Int(2), Value::from("bob")]);
        t
    }

    #[test]
    fn commit_returns_the_materialized_table() {
        let store = store();
        let committed = store.commit(&people(), None).unwrap();
        assert!(committed.data_eq(&people()));
        // Materialized, so identifiers are present.
        assert!(committed.rows().iter().all(|r| r.id.is_some()));
    }

    #[test]
    fn metadata_binds_to_latest_by_default() {
        let store = store();
        store.commit(&people(), None).unwrap();
        store.commit(&people(), None).unwrap();

        let metadata = store.metadata(None).unwrap();
        assert_eq!(metadata.version(), 1);

        let mut doc = AnnotationDoc::new();
        doc.insert("checked".into(), serde_json::json!(true));
        metadata.write(doc.clone(), None, None).unwrap();
        assert_eq!(
            store.metadata(Some(1)).unwrap().read(None, None).unwrap(),
            doc
        );
        assert!(store
            .metadata(Some(0))
            .unwrap()
            .read(None, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn metadata_validates_the_version() {
        let store = store();
        store.commit(&people(), None).unwrap();
        assert!(matches!(
            store.metadata(Some(5)),
            Err(ArchiveError::UnknownVersion {
                version: 5,
                latest: Some(0)
            })
        ));
        let empty = ArchiveDatastore::new(
            Archive::volatile(None),
            Arc::new(VolatileMetadataStoreFactory::new()),
        );
        assert!(matches!(
            empty.metadata(None),
            Err(ArchiveError::UnknownVersion { latest: None, .. })
        ));
    }
}
