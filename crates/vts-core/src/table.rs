//! Tables, rows and stable row identifiers.
//!
//! A `Table` is the unit of exchange with callers: an ordered schema plus an
//! ordered sequence of rows. Rows built by a caller carry no identifier;
//! rows materialized from a snapshot carry the identifier assigned when the
//! row first entered the archive.

use crate::schema::Schema;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for one logical row across versions.
///
/// Unique within a dataset's entire history and never reused after the row
/// it named is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints strictly increasing row identifiers.
///
/// The archive owns one allocator per history and persists its high-water
/// mark; the counter is never rewound, so a retired identifier can never
/// come back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIdAllocator {
    next: u64,
}

impl RowIdAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Resume from a persisted high-water mark.
    pub fn resume(next: u64) -> Self {
        Self { next }
    }

    pub fn mint(&mut self) -> RowId {
        let id = RowId(self.next);
        self.next += 1;
        id
    }

    /// The identifier the next `mint` would return.
    pub fn next_id(&self) -> u64 {
        self.next
    }
}

/// A table row. `id` is `None` for caller-built rows and set on rows that
/// were materialized from a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: Option<RowId>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { id: None, values }
    }

    pub fn with_id(id: RowId, values: Vec<Value>) -> Self {
        Self {
            id: Some(id),
            values,
        }
    }
}

/// A snapshot row: identifier always present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedRow {
    pub id: RowId,
    pub values: Vec<Value>,
}

impl AssignedRow {
    pub fn new(id: RowId, values: Vec<Value>) -> Self {
        Self { id, values }
    }
}

/// An ordered schema plus an ordered sequence of rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(schema: Schema, rows: Vec<Row>) -> Self {
        let width = schema.len();
        let mut table = Self { schema, rows };
        for row in &mut table.rows {
            normalize(&mut row.values, width);
        }
        table
    }

    /// Append a caller-built row. Rows are padded with nulls or truncated to
    /// the schema width.
    pub fn push_row<I>(&mut self, values: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut values: Vec<Value> = values.into_iter().map(Into::into).collect();
        normalize(&mut values, self.schema.len());
        self.rows.push(Row::new(values));
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate the values of one column.
    pub fn column(&self, position: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |r| r.values.get(position))
    }

    /// Equality over schema and cell values, ignoring row identifiers.
    ///
    /// This is the caller-visible notion of table equality; identifiers are
    /// an output of checkout, not part of the data.
    pub fn data_eq(&self, other: &Table) -> bool {
        self.schema == other.schema
            && self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(other.rows.iter())
                .all(|(a, b)| a.values == b.values)
    }
}

fn normalize(values: &mut Vec<Value>, width: usize) {
    values.resize(width, Value::Null);
}
