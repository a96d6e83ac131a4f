//! On-disk archive manager.
//!
//! Layout under the base directory:
//!
//! ```text
//! <basedir>/
//!   archives.json            descriptors of every managed archive
//!   <archive-id>/
//!     manifest.json          row-id high-water mark + version count
//!     snapshots/<v>.json     full snapshot of version v
//! ```
//!
//! The snapshot file is written before the manifest; the manifest write is
//! the commit point, so a half-written snapshot never becomes visible on
//! reload.

use crate::archive::Archive;
use crate::error::{ArchiveError, Result};
use crate::manager::{ArchiveDescriptor, ArchiveId, ArchiveManager};
use crate::snapshot::{timestamp_ms, Snapshot};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use vts_core::table::RowIdAllocator;

const INDEX_FILE: &str = "archives.json";
const MANIFEST_FILE: &str = "manifest.json";
const SNAPSHOT_DIR: &str = "snapshots";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    next_row_id: u64,
    versions: u64,
}

/// Backing directory of one persistent archive.
#[derive(Clone, Debug)]
pub(crate) struct ArchiveDir {
    dir: PathBuf,
}

impl ArchiveDir {
    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    fn snapshot_path(&self, version: u64) -> PathBuf {
        self.dir.join(SNAPSHOT_DIR).join(format!("{}.json", version))
    }

    /// Persist one committed snapshot. Snapshot file first, manifest last.
    pub(crate) fn write_snapshot(&self, snapshot: &Snapshot, next_row_id: u64) -> Result<()> {
        write_json(&self.snapshot_path(snapshot.version), snapshot)?;
        write_json(
            &self.manifest_path(),
            &Manifest {
                next_row_id,
                versions: snapshot.version + 1,
            },
        )
    }
}

/// Archive manager that keeps every archive under a base directory on disk.
/// Reopening the directory restores the full registry.
#[derive(Debug)]
pub struct PersistentArchiveManager {
    basedir: PathBuf,
    archives: BTreeMap<ArchiveId, (ArchiveDescriptor, Archive)>,
}

impl PersistentArchiveManager {
    /// Open (or, with `create`, wipe and recreate) a base directory.
    pub fn new(basedir: impl Into<PathBuf>, create: bool) -> Result<Self> {
        let basedir = basedir.into();
        if create && basedir.exists() {
            fs::remove_dir_all(&basedir)
                .map_err(|e| ArchiveError::io(format!("wipe {}", basedir.display()), e))?;
        }
        fs::create_dir_all(&basedir)
            .map_err(|e| ArchiveError::io(format!("create {}", basedir.display()), e))?;

        let index = basedir.join(INDEX_FILE);
        let descriptors: Vec<ArchiveDescriptor> = if index.exists() {
            read_json(&index)?
        } else {
            Vec::new()
        };

        let mut archives = BTreeMap::new();
        for descriptor in descriptors {
            let dir = basedir.join(&descriptor.id.0);
            let archive = load_archive(&dir, &descriptor)?;
            archives.insert(descriptor.id.clone(), (descriptor, archive));
        }
        Ok(Self { basedir, archives })
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    fn write_index(&self) -> Result<()> {
        let descriptors: Vec<&ArchiveDescriptor> =
            self.archives.values().map(|(d, _)| d).collect();
        write_json(&self.basedir.join(INDEX_FILE), &descriptors)
    }
}

impl ArchiveManager for PersistentArchiveManager {
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
        let dir = self.basedir.join(&descriptor.id.0);
        fs::create_dir_all(dir.join(SNAPSHOT_DIR))
            .map_err(|e| ArchiveError::io(format!("create {}", dir.display()), e))?;

        let disk = ArchiveDir { dir };
        write_json(
            &disk.manifest_path(),
            &Manifest {
                next_row_id: 0,
                versions: 0,
            },
        )?;

        let archive =
            Archive::from_parts(primary_key, Vec::new(), RowIdAllocator::new(), Some(disk));
        self.archives
            .insert(descriptor.id.clone(), (descriptor.clone(), archive));
        if let Err(e) = self.write_index() {
            self.archives.remove(&descriptor.id);
            return Err(e);
        }
        info!(archive = %descriptor.id, name, "created persistent archive");
        Ok(descriptor)
    }

    fn delete(&mut self, id: &ArchiveId) -> Result<()> {
        if !self.archives.contains_key(id) {
            return Err(ArchiveError::UnknownArchive(id.clone()));
        }
        // Release the storage first; drop the registry entry only once the
        // directory is confirmed gone.
        let dir = self.basedir.join(&id.0);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| ArchiveError::io(format!("delete {}", dir.display()), e))?;
        }
        self.archives.remove(id);
        self.write_index()?;
        info!(archive = %id, "deleted persistent archive");
        Ok(())
    }
}

fn load_archive(dir: &Path, descriptor: &ArchiveDescriptor) -> Result<Archive> {
    let disk = ArchiveDir {
        dir: dir.to_path_buf(),
    };
    let manifest: Manifest = read_json(&disk.manifest_path())?;

    let mut snapshots = Vec::with_capacity(manifest.versions as usize);
    for version in 0..manifest.versions {
        let snapshot: Snapshot = read_json(&disk.snapshot_path(version))?;
        if snapshot.version != version {
            return Err(ArchiveError::Corrupt(format!(
                "snapshot file {} holds version {}",
                disk.snapshot_path(version).display(),
                snapshot.version
            )));
        }
        snapshots.push(snapshot);
    }

    Ok(Archive::from_parts(
        descriptor.primary_key.clone(),
        snapshots,
        RowIdAllocator::resume(manifest.next_row_id),
        Some(disk),
    ))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| ArchiveError::Corrupt(format!("encode {}: {}", path.display(), e)))?;
    fs::write(path, bytes).map_err(|e| ArchiveError::io(format!("write {}", path.display()), e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes =
        fs::read(path).map_err(|e| ArchiveError::io(format!("read {}", path.display()), e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ArchiveError::Corrupt(format!("{}: {}", path.display(), e)))
}
