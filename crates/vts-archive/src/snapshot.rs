//! Immutable table snapshots.
//!
//! A snapshot stores the full table state of one version, not a delta, so
//! checkout cost is bounded by row count rather than history length.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use vts_core::diff::SnapshotData;
use vts_core::schema::Schema;
use vts_core::table::{AssignedRow, Row, Table};

/// Full table state at one version. Created exactly once by a commit and
/// never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 0-based version number, strictly increasing, no gaps.
    pub version: u64,
    /// Commit timestamp, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Free-form description of the operation that produced this version.
    pub action: Option<serde_json::Value>,
    pub schema: Schema,
    pub rows: Vec<AssignedRow>,
}

impl Snapshot {
    /// Borrow this snapshot's state for diffing.
    pub fn data(&self) -> SnapshotData<'_> {
        SnapshotData {
            schema: &self.schema,
            rows: &self.rows,
        }
    }

    /// Materialize the snapshot as a caller-facing table, row identifiers
    /// included.
    pub fn to_table(&self) -> Table {
        let rows = self
            .rows
            .iter()
            .map(|r| Row::with_id(r.id, r.values.clone()))
            .collect();
        Table::with_rows(self.schema.clone(), rows)
    }

    pub fn descriptor(&self) -> SnapshotDescriptor {
        SnapshotDescriptor {
            version: self.version,
            created_at: self.created_at,
            action: self.action.clone(),
            rows: self.rows.len(),
        }
    }
}

/// One entry of a history listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDescriptor {
    pub version: u64,
    pub created_at: u64,
    pub action: Option<serde_json::Value>,
    /// Row count of the snapshot.
    pub rows: usize,
}

/// Milliseconds since the Unix epoch.
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use vts_core::table::RowId;
    use vts_core::value::Value;

    fn snapshot() -> Snapshot {
        Snapshot {
            version: 0,
            created_at: timestamp_ms(),
            action: Some(serde_json::json!({ "op": "load" })),
            schema: Schema::of(["id", "name"]),
            rows: vec![
                AssignedRow::new(RowId(0), vec![Value::Int(1), Value::from("ann")]),
                AssignedRow::new(RowId(1), vec![Value::Int(2), Value::from("bob")]),
            ],
        }
    }

    #[test]
    fn to_table_carries_row_ids() {
        let table = snapshot().to_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.row(0).unwrap().id, Some(RowId(0)));
        assert_eq!(table.row(1).unwrap().values[1], Value::from("bob"));
    }

    #[test]
    fn descriptor_reports_row_count() {
        let d = snapshot().descriptor();
        assert_eq!(d.version, 0);
        assert_eq!(d.rows, 2);
        assert!(d.action.is_some());
    }

    #[test]
    fn serde_round_trip() {
        let s = snapshot();
        let json = serde_json::to_string(&s).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
