//! Row identity assignment and snapshot diffing.
//!
//! Given the previous snapshot and a new table, the differ decides which
//! rows are the same logical row (keeping their identifier), which are new
//! (minting a fresh identifier) and which are gone (retiring theirs).
//!
//! Matching policy:
//! - With a declared primary key, rows match on equality of the key-column
//!   values. When several previous rows carry the same key, they queue in
//!   scan order and each new row takes the first still available.
//! - Without a key, rows match on full-row value equality projected onto
//!   the columns both schemas share (by name, in new-schema order), with the
//!   same first-available-by-scan-order tie-break. A value-edited row
//!   therefore shows up as an insert plus a delete.
//!
//! Both policies are pure functions of their inputs: identical previous
//! state, table and allocator produce bit-identical output.

use crate::schema::Schema;
use crate::table::{AssignedRow, RowId, RowIdAllocator, Table};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Errors raised while reconciling a table against history.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DiffError {
    /// A declared primary-key column is absent from the submitted table.
    #[error("primary key column '{column}' missing from table")]
    MissingKeyColumn { column: String },
}

/// The previous snapshot's state, borrowed for diffing.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotData<'a> {
    pub schema: &'a Schema,
    pub rows: &'a [AssignedRow],
}

/// Classification of every row identifier touched by one diff.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Identifier kept, values identical.
    pub unchanged: Vec<RowId>,
    /// Identifier kept, values (or the cell set) differ.
    pub updated: Vec<RowId>,
    /// Freshly minted identifiers.
    pub inserted: Vec<RowId>,
    /// Identifiers retired by this version.
    pub deleted: Vec<RowId>,
}

impl ChangeSet {
    /// True when the new version is row-for-row identical to the previous.
    pub fn is_noop(&self) -> bool {
        self.updated.is_empty() && self.inserted.is_empty() && self.deleted.is_empty()
    }
}

/// Result of diffing one table against the previous snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDiff {
    /// The new version's rows with identifiers assigned, in table order.
    pub rows: Vec<AssignedRow>,
    pub changes: ChangeSet,
}

/// Assign identifiers to `table`'s rows by matching them against the
/// previous snapshot. See the module documentation for the matching policy.
///
/// The allocator is only advanced for rows classified as inserted; a failed
/// diff leaves it untouched (key validation happens before any minting).
pub fn diff(
    previous: Option<SnapshotData<'_>>,
    table: &Table,
    key: Option<&[String]>,
    ids: &mut RowIdAllocator,
) -> Result<TableDiff, DiffError> {
    match key {
        Some(key) if !key.is_empty() => diff_by_key(previous, table, key, ids),
        _ => diff_by_value(previous, table, ids),
    }
}

fn diff_by_key(
    previous: Option<SnapshotData<'_>>,
    table: &Table,
    key: &[String],
    ids: &mut RowIdAllocator,
) -> Result<TableDiff, DiffError> {
    let new_key_positions = key_positions(table.schema(), key)?;

    let Some(prev) = previous else {
        return Ok(insert_all(table, ids));
    };
    let prev_key_positions = key_positions(prev.schema, key)?;

    // Previous rows queue per key value, scan order.
    let mut candidates: HashMap<Vec<&crate::value::Value>, VecDeque<usize>> = HashMap::new();
    for (index, row) in prev.rows.iter().enumerate() {
        let k = project_ref(&row.values, &prev_key_positions);
        candidates.entry(k).or_default().push_back(index);
    }

    let same_schema = prev.schema == table.schema();
    let mut matched = vec![false; prev.rows.len()];
    let mut rows = Vec::with_capacity(table.len());
    let mut changes = ChangeSet::default();

    for row in table.rows() {
        let k = project_ref(&row.values, &new_key_positions);
        match candidates.get_mut(&k).and_then(|queue| queue.pop_front()) {
            Some(prev_index) => {
                matched[prev_index] = true;
                let prev_row = &prev.rows[prev_index];
                if same_schema && prev_row.values == row.values {
                    changes.unchanged.push(prev_row.id);
                } else {
                    changes.updated.push(prev_row.id);
                }
                rows.push(AssignedRow::new(prev_row.id, row.values.clone()));
            }
            None => {
                let id = ids.mint();
                changes.inserted.push(id);
                rows.push(AssignedRow::new(id, row.values.clone()));
            }
        }
    }

    for (index, row) in prev.rows.iter().enumerate() {
        if !matched[index] {
            changes.deleted.push(row.id);
        }
    }

    Ok(TableDiff { rows, changes })
}

fn diff_by_value(
    previous: Option<SnapshotData<'_>>,
    table: &Table,
    ids: &mut RowIdAllocator,
) -> Result<TableDiff, DiffError> {
    let Some(prev) = previous else {
        return Ok(insert_all(table, ids));
    };

    // Columns present in both schemas, in new-schema order.
    let shared: Vec<(usize, usize)> = table
        .schema()
        .iter()
        .enumerate()
        .filter_map(|(new_pos, column)| {
            prev.schema
                .position_of(&column.name)
                .map(|prev_pos| (new_pos, prev_pos))
        })
        .collect();
    let new_positions: Vec<usize> = shared.iter().map(|(n, _)| *n).collect();
    let prev_positions: Vec<usize> = shared.iter().map(|(_, p)| *p).collect();

    let mut candidates: HashMap<Vec<&crate::value::Value>, VecDeque<usize>> = HashMap::new();
    for (index, row) in prev.rows.iter().enumerate() {
        let k = project_ref(&row.values, &prev_positions);
        candidates.entry(k).or_default().push_back(index);
    }

    let same_schema = prev.schema == table.schema();
    let mut matched = vec![false; prev.rows.len()];
    let mut rows = Vec::with_capacity(table.len());
    let mut changes = ChangeSet::default();

    for row in table.rows() {
        let k = project_ref(&row.values, &new_positions);
        match candidates.get_mut(&k).and_then(|queue| queue.pop_front()) {
            Some(prev_index) => {
                matched[prev_index] = true;
                let prev_row = &prev.rows[prev_index];
                if same_schema {
                    // Shared columns are all columns here, so the match was
                    // on full-row equality.
                    changes.unchanged.push(prev_row.id);
                } else {
                    changes.updated.push(prev_row.id);
                }
                rows.push(AssignedRow::new(prev_row.id, row.values.clone()));
            }
            None => {
                let id = ids.mint();
                changes.inserted.push(id);
                rows.push(AssignedRow::new(id, row.values.clone()));
            }
        }
    }

    for (index, row) in prev.rows.iter().enumerate() {
        if !matched[index] {
            changes.deleted.push(row.id);
        }
    }

    Ok(TableDiff { rows, changes })
}

/// First commit into an empty archive: every row is an insert.
fn insert_all(table: &Table, ids: &mut RowIdAllocator) -> TableDiff {
    let mut rows = Vec::with_capacity(table.len());
    let mut changes = ChangeSet::default();
    for row in table.rows() {
        let id = ids.mint();
        changes.inserted.push(id);
        rows.push(AssignedRow::new(id, row.values.clone()));
    }
    TableDiff { rows, changes }
}

fn key_positions(schema: &Schema, key: &[String]) -> Result<Vec<usize>, DiffError> {
    key.iter()
        .map(|column| {
            schema
                .position_of(column)
                .ok_or_else(|| DiffError::MissingKeyColumn {
                    column: column.clone(),
                })
        })
        .collect()
}

fn project_ref<'a>(
    values: &'a [crate::value::Value],
    positions: &[usize],
) -> Vec<&'a crate::value::Value> {
    positions.iter().map(|&p| &values[p]).collect()
}
