//! The dataset engine.
//!
//! An `Engine` is an explicit context object wrapping an archive manager
//! and the registry of live datasets. There is no process-global instance;
//! construct one (volatile or persistent) and thread it through calls.

use crate::dataset::{ColumnRef, DatasetHandle};
use crate::error::{EngineError, Result};
use crate::library::FunctionLibrary;
use crate::profile::Profiler;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{seq::index, SeedableRng};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use ulid::Ulid;
use vts_archive::{
    Archive, ArchiveId, ArchiveManager, PersistentArchiveManager, SnapshotDescriptor,
    VolatileArchiveManager,
};
use vts_core::table::{Row, Table};
use vts_store::{
    ArchiveDatastore, CachedDatastore, Datastore, FileSystemMetadataStoreFactory,
    MetadataStoreFactory, SnapshotMetadata, VolatileMetadataStoreFactory,
};

/// Default sample size when none is given.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Maintains a collection of named, versioned datasets.
pub struct Engine {
    manager: Arc<RwLock<dyn ArchiveManager + Send + Sync>>,
    /// Base directory for on-disk annotations; `None` keeps them in memory.
    metadir: Option<PathBuf>,
    datasets: RwLock<HashMap<String, DatasetHandle>>,
    library: FunctionLibrary,
}

impl Engine {
    /// An engine whose datasets live in memory and die with it.
    pub fn volatile() -> Self {
        Self {
            manager: Arc::new(RwLock::new(VolatileArchiveManager::new())),
            metadir: None,
            datasets: RwLock::new(HashMap::new()),
            library: FunctionLibrary::new(),
        }
    }

    /// An engine persisting archives under `basedir`. With `create`, any
    /// existing state is wiped first; otherwise every dataset registered
    /// with the manager is restored, wrapped in the checkout cache when
    /// `cached`.
    pub fn persistent(basedir: impl Into<PathBuf>, create: bool, cached: bool) -> Result<Self> {
        let basedir = basedir.into();
        let manager = PersistentArchiveManager::new(&basedir, create)?;
        let metadir = basedir.join(".metadata");

        let mut datasets = HashMap::new();
        for descriptor in manager.list() {
            let archive = manager.get(&descriptor.id)?;
            let datastore =
                build_datastore(archive, Some(metadir.as_path()), Some(&descriptor.id), cached);
            datasets.insert(
                descriptor.name.clone(),
                DatasetHandle::new(
                    descriptor.name,
                    datastore,
                    Some(descriptor.id),
                    descriptor.primary_key,
                    None,
                ),
            );
        }
        info!(datasets = datasets.len(), "opened persistent engine");

        Ok(Self {
            manager: Arc::new(RwLock::new(manager)),
            metadir: Some(metadir),
            datasets: RwLock::new(datasets),
            library: FunctionLibrary::new(),
        })
    }

    /// The function library of this engine.
    pub fn library(&self) -> &FunctionLibrary {
        &self.library
    }

    /// Registered dataset names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.datasets.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Create a dataset whose first snapshot is `table`.
    pub fn create(
        &self,
        table: &Table,
        name: &str,
        primary_key: Option<Vec<String>>,
        cached: bool,
    ) -> Result<Table> {
        let mut datasets = self.datasets.write();
        if datasets.contains_key(name) {
            return Err(EngineError::DuplicateName(name.to_string()));
        }

        let descriptor = self.manager.write().create(name, primary_key.clone())?;
        let archive = self.manager.read().get(&descriptor.id)?;
        let datastore = build_datastore(
            archive,
            self.metadir.as_deref(),
            Some(&descriptor.id),
            cached,
        );
        let committed = datastore.commit(table, None)?;

        info!(dataset = name, archive = %descriptor.id, "created dataset");
        datasets.insert(
            name.to_string(),
            DatasetHandle::new(name, datastore, Some(descriptor.id), primary_key, None),
        );
        Ok(committed)
    }

    /// Handle for a registered dataset.
    pub fn dataset(&self, name: &str) -> Result<DatasetHandle> {
        self.datasets
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownDataset(name.to_string()))
    }

    /// Materialize a version of a dataset; `None` means latest.
    pub fn checkout(&self, name: &str, version: Option<u64>) -> Result<Table> {
        self.dataset(name)?.checkout(version)
    }

    /// Append a new version to a dataset and return the materialized table.
    pub fn commit(
        &self,
        name: &str,
        table: &Table,
        action: Option<serde_json::Value>,
    ) -> Result<Table> {
        self.dataset(name)?.commit(table, action)
    }

    /// Snapshot descriptors of a dataset, oldest first.
    pub fn history(&self, name: &str) -> Result<Vec<SnapshotDescriptor>> {
        Ok(self.dataset(name)?.snapshots())
    }

    /// Annotations of a dataset version; `None` binds to the latest.
    pub fn metadata(&self, name: &str, version: Option<u64>) -> Result<SnapshotMetadata> {
        self.dataset(name)?.metadata(version)
    }

    /// Apply a registered evaluation function to the selected columns of a
    /// dataset's latest snapshot and commit the result.
    pub fn update(
        &self,
        name: &str,
        columns: &[ColumnRef],
        function: &str,
        namespace: Option<&str>,
        sources: Option<&[ColumnRef]>,
    ) -> Result<Table> {
        let handle = self.dataset(name)?;
        let function = self.library.lookup(function, namespace)?;
        handle.update(columns, &function, sources)
    }

    /// Run a profiler over a dataset version and store the report under the
    /// snapshot's dataset-level annotation.
    pub fn profile(
        &self,
        name: &str,
        version: Option<u64>,
        profiler: &dyn Profiler,
    ) -> Result<serde_json::Value> {
        let handle = self.dataset(name)?;
        let table = handle.checkout(version)?;
        let report = profiler.profile(&table, None)?;

        let metadata = handle.metadata(version)?;
        let mut doc = metadata.read(None, None)?;
        doc.insert("profiling".to_string(), report.clone());
        metadata.write(doc, None, None)?;
        Ok(report)
    }

    /// Register a volatile dataset holding a random row sample of `name`'s
    /// latest snapshot, drawn without replacement when `size` is smaller
    /// than the row count. Returns the generated dataset name.
    ///
    /// Sampling is deterministic for a given seed.
    pub fn sample(&self, name: &str, size: usize, seed: Option<u64>) -> Result<String> {
        let handle = self.dataset(name)?;
        let table = handle.checkout(None)?;

        let sampled = if size < table.len() {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let picks = index::sample(&mut rng, table.len(), size);
            let rows = picks
                .iter()
                .map(|i| Row::new(table.rows()[i].values.clone()))
                .collect();
            Table::with_rows(table.schema().clone(), rows)
        } else {
            // Identifiers are stripped; the sample archive assigns its own.
            let rows = table
                .rows()
                .iter()
                .map(|r| Row::new(r.values.clone()))
                .collect();
            Table::with_rows(table.schema().clone(), rows)
        };

        let mut datasets = self.datasets.write();
        let mut sample_name = generated_name();
        while datasets.contains_key(&sample_name) {
            sample_name = generated_name();
        }

        let primary_key = handle.primary_key().map(|key| key.to_vec());
        let archive = Archive::volatile(primary_key.clone());
        let datastore: Arc<dyn Datastore> = Arc::new(CachedDatastore::new(ArchiveDatastore::new(
            archive,
            Arc::new(VolatileMetadataStoreFactory::new()),
        )));
        let action = json!({
            "op": "sample",
            "source": name,
            "size": size,
            "seed": seed,
        });
        datastore.commit(&sampled, Some(action))?;

        info!(dataset = %sample_name, source = name, rows = sampled.len(), "sampled dataset");
        datasets.insert(
            sample_name.clone(),
            DatasetHandle::new(
                &sample_name,
                datastore,
                None,
                primary_key,
                Some(name.to_string()),
            ),
        );
        Ok(sample_name)
    }

    /// Delete a dataset's full history.
    ///
    /// The underlying archive is released first; the registry entry is
    /// removed only once deletion has succeeded.
    pub fn drop_dataset(&self, name: &str) -> Result<()> {
        let mut datasets = self.datasets.write();
        let handle = datasets
            .get(name)
            .ok_or_else(|| EngineError::UnknownDataset(name.to_string()))?;

        if let Some(archive_id) = handle.archive_id().cloned() {
            self.manager.write().delete(&archive_id)?;
        }
        datasets.remove(name);
        info!(dataset = name, "dropped dataset");
        Ok(())
    }
}

fn build_datastore(
    archive: Archive,
    metadir: Option<&std::path::Path>,
    archive_id: Option<&ArchiveId>,
    cached: bool,
) -> Arc<dyn Datastore> {
    let metadata: Arc<dyn MetadataStoreFactory> = match (metadir, archive_id) {
        (Some(dir), Some(id)) => Arc::new(FileSystemMetadataStoreFactory::new(dir.join(&id.0))),
        _ => Arc::new(VolatileMetadataStoreFactory::new()),
    };
    let direct = ArchiveDatastore::new(archive, metadata);
    if cached {
        Arc::new(CachedDatastore::new(direct))
    } else {
        Arc::new(direct)
    }
}

/// A 16-character lowercase name for auto-registered datasets.
fn generated_name() -> String {
    let ulid = Ulid::new().to_string().to_lowercase();
    ulid[ulid.len() - 16..].to_string()
}
