//! # vts-engine
//!
//! Dataset registry and engine for the Sardonyx versioned dataset store.
//!
//! This crate provides:
//! - The `Engine`: an explicit context managing named, versioned datasets
//! - Dataset handles with column updates through evaluation functions
//! - The function library (explicit registration, namespaced lookup)
//! - Profiling as a polymorphic capability
//! - Seeded random sampling into volatile datasets
//!
//! ## Example
//!
//! ```rust
//! use vts_core::schema::Schema;
//! use vts_core::table::Table;
//! use vts_core::value::Value;
//! use vts_engine::Engine;
//!
//! let engine = Engine::volatile();
//!
//! let mut table = Table::new(Schema::of(["id", "name"]));
//! table.push_row([Value::Int(1), Value::from("ann")]);
//! table.push_row([Value::Int(2), Value::from("bob")]);
//!
//! engine
//!     .create(&table, "people", Some(vec!["id".to_string()]), true)
//!     .unwrap();
//! let latest = engine.checkout("people", None).unwrap();
//! assert_eq!(latest.len(), 2);
//! ```

pub mod dataset;
pub mod engine;
pub mod error;
pub mod library;
pub mod profile;

pub use dataset::{ColumnRef, DatasetHandle};
pub use engine::{Engine, DEFAULT_SAMPLE_SIZE};
pub use error::{EngineError, Result};
pub use library::{EvalFn, FunctionHandle, FunctionLibrary, Parameter};
pub use profile::{ColumnStatsProfiler, Profiler};
