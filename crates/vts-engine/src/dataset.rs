//! Dataset handles.
//!
//! A handle bundles everything the engine knows about one registered
//! dataset: its datastore, the archive it lives in (for persisted datasets),
//! the declared primary key and, for samples, the dataset it was drawn
//! from. Handles are cheap to clone and share state.

use crate::error::{EngineError, Result};
use crate::library::FunctionHandle;
use serde_json::json;
use std::sync::Arc;
use vts_archive::{ArchiveId, SnapshotDescriptor};
use vts_core::schema::Schema;
use vts_core::table::Table;
use vts_store::{Datastore, SnapshotMetadata};

/// A column selection, by name or by position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnRef {
    Name(String),
    Position(usize),
}

impl ColumnRef {
    pub fn resolve(&self, schema: &Schema) -> Result<usize> {
        match self {
            ColumnRef::Name(name) => schema
                .position_of(name)
                .ok_or_else(|| EngineError::UnknownColumn(name.clone())),
            ColumnRef::Position(p) if *p < schema.len() => Ok(*p),
            ColumnRef::Position(p) => Err(EngineError::UnknownColumn(p.to_string())),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef::Name(name)
    }
}

impl From<usize> for ColumnRef {
    fn from(position: usize) -> Self {
        ColumnRef::Position(position)
    }
}

struct DatasetInner {
    name: String,
    datastore: Arc<dyn Datastore>,
    /// Set only for datasets owned by the engine's archive manager; volatile
    /// samples carry `None` and vanish with the registry entry.
    archive_id: Option<ArchiveId>,
    primary_key: Option<Vec<String>>,
    /// Name of the dataset this one was sampled from.
    source: Option<String>,
}

/// Handle for one dataset maintained by the engine.
#[derive(Clone)]
pub struct DatasetHandle {
    inner: Arc<DatasetInner>,
}

impl DatasetHandle {
    pub(crate) fn new(
        name: impl Into<String>,
        datastore: Arc<dyn Datastore>,
        archive_id: Option<ArchiveId>,
        primary_key: Option<Vec<String>>,
        source: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(DatasetInner {
                name: name.into(),
                datastore,
                archive_id,
                primary_key,
                source,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn datastore(&self) -> &Arc<dyn Datastore> {
        &self.inner.datastore
    }

    pub fn archive_id(&self) -> Option<&ArchiveId> {
        self.inner.archive_id.as_ref()
    }

    pub fn primary_key(&self) -> Option<&[String]> {
        self.inner.primary_key.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.inner.source.as_deref()
    }

    pub fn checkout(&self, version: Option<u64>) -> Result<Table> {
        Ok(self.inner.datastore.checkout(version)?)
    }

    pub fn commit(&self, table: &Table, action: Option<serde_json::Value>) -> Result<Table> {
        Ok(self.inner.datastore.commit(table, action)?)
    }

    pub fn snapshots(&self) -> Vec<SnapshotDescriptor> {
        self.inner.datastore.snapshots()
    }

    pub fn metadata(&self, version: Option<u64>) -> Result<SnapshotMetadata> {
        Ok(self.inner.datastore.metadata(version)?)
    }

    /// Apply an evaluation function to the selected columns of the latest
    /// snapshot and commit the result.
    ///
    /// Per row, the function receives the values of the `sources` columns
    /// (the target columns when `sources` is `None`) and its single output
    /// is written to every target column.
    pub fn update(
        &self,
        columns: &[ColumnRef],
        function: &FunctionHandle,
        sources: Option<&[ColumnRef]>,
    ) -> Result<Table> {
        let mut table = self.checkout(None)?;
        let schema = table.schema().clone();

        let targets: Vec<usize> = columns
            .iter()
            .map(|c| c.resolve(&schema))
            .collect::<Result<_>>()?;
        let inputs: Vec<usize> = match sources {
            Some(sources) => sources
                .iter()
                .map(|c| c.resolve(&schema))
                .collect::<Result<_>>()?,
            None => targets.clone(),
        };

        let rows = table.rows().to_vec();
        let mut updated = Vec::with_capacity(rows.len());
        for mut row in rows {
            let args: Vec<_> = inputs.iter().map(|&p| row.values[p].clone()).collect();
            let result = (function.func)(&args);
            for &target in &targets {
                row.values[target] = result.clone();
            }
            updated.push(row);
        }
        table = Table::with_rows(schema.clone(), updated);

        let action = json!({
            "op": "update",
            "columns": targets
                .iter()
                .map(|&p| schema.columns()[p].name.clone())
                .collect::<Vec<_>>(),
            "function": function.name,
            "namespace": function.namespace,
        });
        self.commit(&table, Some(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_refs_resolve_names_and_positions() {
        let schema = Schema::of(["id", "name"]);
        assert_eq!(ColumnRef::from("name").resolve(&schema).unwrap(), 1);
        assert_eq!(ColumnRef::from(0usize).resolve(&schema).unwrap(), 0);
        assert!(matches!(
            ColumnRef::from("missing").resolve(&schema),
            Err(EngineError::UnknownColumn(_))
        ));
        assert!(matches!(
            ColumnRef::from(9usize).resolve(&schema),
            Err(EngineError::UnknownColumn(_))
        ));
    }
}
