//! Data profiling capability.
//!
//! A profiler derives a metadata document from a table. The structure of the
//! result is implementation dependent; the engine stores it under the
//! dataset-level annotation of the profiled snapshot.

use crate::dataset::ColumnRef;
use crate::error::Result;
use serde_json::json;
use std::collections::BTreeSet;
use vts_core::table::Table;
use vts_core::value::Value;

/// Derives profiling metadata for a table, or for a column selection when
/// one is given.
pub trait Profiler: Send + Sync {
    fn profile(&self, table: &Table, columns: Option<&[ColumnRef]>) -> Result<serde_json::Value>;
}

/// Per-column counts plus minimum and maximum.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColumnStatsProfiler;

impl ColumnStatsProfiler {
    pub fn new() -> Self {
        Self
    }
}

impl Profiler for ColumnStatsProfiler {
    fn profile(&self, table: &Table, columns: Option<&[ColumnRef]>) -> Result<serde_json::Value> {
        let positions: Vec<usize> = match columns {
            Some(columns) => columns
                .iter()
                .map(|c| c.resolve(table.schema()))
                .collect::<Result<_>>()?,
            None => (0..table.schema().len()).collect(),
        };

        let mut reports = Vec::with_capacity(positions.len());
        for position in positions {
            reports.push(profile_column(table, position));
        }
        Ok(json!({ "rows": table.len(), "columns": reports }))
    }
}

fn profile_column(table: &Table, position: usize) -> serde_json::Value {
    let mut nulls = 0usize;
    let mut distinct = BTreeSet::new();
    let mut min: Option<&Value> = None;
    let mut max: Option<&Value> = None;

    for value in table.column(position) {
        if value.is_null() {
            nulls += 1;
            continue;
        }
        distinct.insert(value.clone());
        min = Some(match min {
            Some(m) if m <= value => m,
            _ => value,
        });
        max = Some(match max {
            Some(m) if m >= value => m,
            _ => value,
        });
    }

    json!({
        "column": table.schema().columns()[position].name,
        "position": position,
        "total": table.len(),
        "nulls": nulls,
        "distinct": distinct.len(),
        "min": min.map(value_to_json),
        "max": max.map(value_to_json),
    })
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::Text(s) => json!(s),
    }
}
