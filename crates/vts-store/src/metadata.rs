//! Metadata annotation stores.
//!
//! An annotation is a free-form JSON object attached to the whole dataset,
//! one column, one row or one cell of a specific snapshot version. Stores
//! address annotations by `(column, row)`: both absent means dataset-level,
//! only a column means column-level, only a row means row-level, both means
//! cell-level.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use vts_archive::error::{ArchiveError, Result};
use vts_core::table::RowId;

/// A free-form annotation document.
pub type AnnotationDoc = serde_json::Map<String, serde_json::Value>;

/// Storage key for one annotated object of a snapshot.
pub fn annotation_key(column: Option<usize>, row: Option<RowId>) -> String {
    match (column, row) {
        (None, None) => "ds".to_string(),
        (Some(c), None) => format!("col_{}", c),
        (None, Some(r)) => format!("row_{}", r),
        (Some(c), Some(r)) => format!("cell_{}_{}", c, r),
    }
}

/// Annotations of one snapshot version.
///
/// `read` of an object that was never written returns an empty document.
pub trait MetadataStore: Send + Sync {
    fn read(&self, column: Option<usize>, row: Option<RowId>) -> Result<AnnotationDoc>;

    fn write(
        &self,
        doc: AnnotationDoc,
        column: Option<usize>,
        row: Option<RowId>,
    ) -> Result<AnnotationDoc>;
}

/// Produces the metadata store bound to a given snapshot version.
pub trait MetadataStoreFactory: Send + Sync {
    fn store(&self, version: u64) -> Box<dyn MetadataStore>;
}

// -- Volatile ---------------------------------------------------------------

type SharedAnnotations = Arc<RwLock<HashMap<u64, HashMap<String, AnnotationDoc>>>>;

/// In-memory metadata; lives exactly as long as the factory.
#[derive(Clone, Debug, Default)]
pub struct VolatileMetadataStoreFactory {
    annotations: SharedAnnotations,
}

impl VolatileMetadataStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStoreFactory for VolatileMetadataStoreFactory {
    fn store(&self, version: u64) -> Box<dyn MetadataStore> {
        Box::new(VolatileMetadataStore {
            annotations: self.annotations.clone(),
            version,
        })
    }
}

struct VolatileMetadataStore {
    annotations: SharedAnnotations,
    version: u64,
}

impl MetadataStore for VolatileMetadataStore {
    fn read(&self, column: Option<usize>, row: Option<RowId>) -> Result<AnnotationDoc> {
        let annotations = self.annotations.read();
        Ok(annotations
            .get(&self.version)
            .and_then(|m| m.get(&annotation_key(column, row)))
            .cloned()
            .unwrap_or_default())
    }

    fn write(
        &self,
        doc: AnnotationDoc,
        column: Option<usize>,
        row: Option<RowId>,
    ) -> Result<AnnotationDoc> {
        let mut annotations = self.annotations.write();
        annotations
            .entry(self.version)
            .or_default()
            .insert(annotation_key(column, row), doc.clone());
        Ok(doc)
    }
}

// -- Filesystem -------------------------------------------------------------

/// Metadata persisted as one JSON document per snapshot version under a
/// base directory: `<basedir>/<version>/annotations.json`.
#[derive(Clone, Debug)]
pub struct FileSystemMetadataStoreFactory {
    basedir: PathBuf,
}

impl FileSystemMetadataStoreFactory {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
        }
    }
}

impl MetadataStoreFactory for FileSystemMetadataStoreFactory {
    fn store(&self, version: u64) -> Box<dyn MetadataStore> {
        Box::new(FileSystemMetadataStore {
            dir: self.basedir.join(version.to_string()),
        })
    }
}

struct FileSystemMetadataStore {
    dir: PathBuf,
}

impl FileSystemMetadataStore {
    fn file(&self) -> PathBuf {
        self.dir.join("annotations.json")
    }

    fn load(&self) -> Result<HashMap<String, AnnotationDoc>> {
        let path = self.file();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let bytes = fs::read(&path)
            .map_err(|e| ArchiveError::io(format!("read {}", path.display()), e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ArchiveError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    fn save(&self, annotations: &HashMap<String, AnnotationDoc>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ArchiveError::io(format!("create {}", self.dir.display()), e))?;
        let path = self.file();
        let bytes = serde_json::to_vec_pretty(annotations)
            .map_err(|e| ArchiveError::Corrupt(format!("encode {}: {}", path.display(), e)))?;
        fs::write(&path, bytes)
            .map_err(|e| ArchiveError::io(format!("write {}", path.display()), e))
    }
}

impl MetadataStore for FileSystemMetadataStore {
    fn read(&self, column: Option<usize>, row: Option<RowId>) -> Result<AnnotationDoc> {
        let annotations = self.load()?;
        Ok(annotations
            .get(&annotation_key(column, row))
            .cloned()
            .unwrap_or_default())
    }

    fn write(
        &self,
        doc: AnnotationDoc,
        column: Option<usize>,
        row: Option<RowId>,
    ) -> Result<AnnotationDoc> {
        let mut annotations = self.load()?;
        annotations.insert(annotation_key(column, row), doc.clone());
        self.save(&annotations)?;
        Ok(doc)
    }
}
