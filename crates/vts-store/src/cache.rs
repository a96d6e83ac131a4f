//! Checkout caching decorator.
//!
//! Wraps any datastore and memoizes the most recently materialized latest
//! version. The dominant access pattern of an interactive session is "read
//! the current version repeatedly between edits", so the cache holds exactly
//! one entry per archive and nothing else; it is deliberately not an LRU.

use crate::datastore::{Datastore, SnapshotMetadata};
use parking_lot::RwLock;
use tracing::debug;
use vts_archive::error::Result;
use vts_archive::SnapshotDescriptor;
use vts_core::table::Table;

/// The memoized pair. Version and table only ever move together, so a
/// reader can never observe a version number paired with the wrong table.
struct CacheEntry {
    version: u64,
    table: Table,
}

/// Datastore decorator memoizing the latest checked-out snapshot.
pub struct CachedDatastore<D: Datastore> {
    inner: D,
    entry: RwLock<Option<CacheEntry>>,
}

impl<D: Datastore> CachedDatastore<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            entry: RwLock::new(None),
        }
    }

    /// The cached version, if an entry is held. Test hook.
    pub fn cached_version(&self) -> Option<u64> {
        self.entry.read().as_ref().map(|e| e.version)
    }

    fn refresh(&self, version: u64, table: &Table) {
        *self.entry.write() = Some(CacheEntry {
            version,
            table: table.clone(),
        });
    }
}

impl<D: Datastore> Datastore for CachedDatastore<D> {
    fn commit(&self, table: &Table, action: Option<serde_json::Value>) -> Result<Table> {
        let committed = self.inner.commit(table, action)?;
        // The wrapped commit already materialized the new version; store it
        // rather than paying a redundant checkout on the next read.
        if let Some(version) = self.inner.latest_version() {
            self.refresh(version, &committed);
        }
        Ok(committed)
    }

    fn checkout(&self, version: Option<u64>) -> Result<Table> {
        let latest = self.inner.latest_version();
        // Pin "latest" to a concrete version so the entry we store is the
        // version we actually materialized.
        let requested = match version {
            Some(v) => v,
            None => match latest {
                Some(v) => v,
                None => return self.inner.checkout(None),
            },
        };

        if let Some(entry) = self.entry.read().as_ref() {
            if entry.version == requested {
                debug!(version = requested, "checkout served from cache");
                return Ok(entry.table.clone());
            }
        }

        let table = self.inner.checkout(Some(requested))?;
        if latest == Some(requested) {
            self.refresh(requested, &table);
        } else {
            // A historical read displaces the entry; the next latest read
            // re-materializes.
            *self.entry.write() = None;
        }
        Ok(table)
    }

    fn snapshots(&self) -> Vec<SnapshotDescriptor> {
        self.inner.snapshots()
    }

    fn metadata(&self, version: Option<u64>) -> Result<SnapshotMetadata> {
        self.inner.metadata(version)
    }

    fn latest_version(&self) -> Option<u64> {
        self.inner.latest_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::ArchiveDatastore;
    use crate::metadata::VolatileMetadataStoreFactory;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use vts_archive::Archive;
    use vts_core::schema::Schema;
    use vts_core::value::Value;

    /// Counts how often the wrapped store materializes a table.
    struct CountingDatastore<D: Datastore> {
        inner: D,
        materializations: Arc<AtomicUsize>,
    }

    impl<D: Datastore> Datastore for CountingDatastore<D> {
        fn commit(&self, table: &Table, action: Option<serde_json::Value>) -> Result<Table> {
            self.materializations.fetch_add(1, Ordering::SeqCst);
            self.inner.commit(table, action)
        }

        fn checkout(&self, version: Option<u64>) -> Result<Table> {
            self.materializations.fetch_add(1, Ordering::SeqCst);
            self.inner.checkout(version)
        }

        fn snapshots(&self) -> Vec<SnapshotDescriptor> {
            self.inner.snapshots()
        }

        fn metadata(&self, version: Option<u64>) -> Result<SnapshotMetadata> {
            self.inner.metadata(version)
        }

        fn latest_version(&self) -> Option<u64> {
            self.inner.latest_version()
        }
    }

    fn cached() -> (CachedDatastore<CountingDatastore<ArchiveDatastore>>, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let store = ArchiveDatastore::new(
            Archive::volatile(Some(vec!["id".to_string()])),
            Arc::new(VolatileMetadataStoreFactory::new()),
        );
        let counting = CountingDatastore {
            inner: store,
            materializations: counter.clone(),
        };
        (CachedDatastore::new(counting), counter)
    }

    fn people(name: &str) -> Table {
        let mut t = Table::new(Schema::of(["id", "name"]));
        t.push_row([Value::Int(1), Value::from(name)]);
        t
    }

    #[test]
    fn repeated_latest_checkout_hits_the_cache() {
        let (store, counter) = cached();
        let committed = store.commit(&people("ann"), None).unwrap();
        let after_commit = counter.load(Ordering::SeqCst);

        for _ in 0..3 {
            let table = store.checkout(None).unwrap();
            assert_eq!(table, committed);
        }
        // No further materialization beyond the commit itself.
        assert_eq!(counter.load(Ordering::SeqCst), after_commit);
    }

    #[test]
    fn commit_refreshes_the_entry() {
        let (store, _) = cached();
        store.commit(&people("ann"), None).unwrap();
        assert_eq!(store.cached_version(), Some(0));
        store.commit(&people("anne"), None).unwrap();
        assert_eq!(store.cached_version(), Some(1));
        assert!(store.checkout(None).unwrap().data_eq(&people("anne")));
    }

    #[test]
    fn historical_checkout_bypasses_and_displaces_the_entry() {
        let (store, counter) = cached();
        store.commit(&people("ann"), None).unwrap();
        store.commit(&people("anne"), None).unwrap();

        let v0 = store.checkout(Some(0)).unwrap();
        assert!(v0.data_eq(&people("ann")));
        assert_eq!(store.cached_version(), None);

        // Latest read after a historical one re-materializes once, then
        // hits the cache again.
        let before = counter.load(Ordering::SeqCst);
        store.checkout(None).unwrap();
        store.checkout(None).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn explicit_latest_checkout_is_cached() {
        let (store, counter) = cached();
        store.commit(&people("ann"), None).unwrap();
        store.checkout(Some(0)).unwrap();
        assert_eq!(store.cached_version(), Some(0));

        let before = counter.load(Ordering::SeqCst);
        store.checkout(None).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), before);
    }

    #[test]
    fn empty_archive_checkout_propagates_the_error() {
        let (store, _) = cached();
        assert!(store.checkout(None).is_err());
    }
}
