//! # vts-core
//!
//! Table model and snapshot differ for the Sardonyx versioned dataset store.
//!
//! This crate provides:
//! - Cell values with a deterministic total order
//! - Schemas, tables and stable row identifiers
//! - The differ that matches rows across versions and assigns identifiers

pub mod diff;
pub mod schema;
pub mod table;
pub mod value;

pub use diff::{diff, ChangeSet, DiffError, SnapshotData, TableDiff};
pub use schema::{Column, Schema};
pub use table::{AssignedRow, Row, RowId, RowIdAllocator, Table};
pub use value::Value;
