//! Example: Sampling, Profiling and the Function Library
//!
//! This example demonstrates:
//! 1. Seeded random samples registered as volatile datasets
//! 2. Column updates through registered evaluation functions
//! 3. Profiling a snapshot into its metadata store

use vts_core::schema::Schema;
use vts_core::table::Table;
use vts_core::value::Value;
use vts_engine::{ColumnRef, ColumnStatsProfiler, Engine, FunctionHandle};

fn main() {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Sampling and Profiling for Sardonyx");
    println!("═══════════════════════════════════════════════════════════════\n");

    let engine = Engine::volatile();
    let mut table = Table::new(Schema::of(["id", "name", "score"]));
    for (id, name, score) in [
        (1, "ann", 91.5),
        (2, "bob", 62.0),
        (3, "cid", 78.25),
        (4, "dot", 55.0),
        (5, "eve", 99.0),
    ] {
        table.push_row([Value::Int(id), Value::from(name), Value::Float(score)]);
    }
    engine
        .create(&table, "scores", Some(vec!["id".to_string()]), true)
        .expect("create dataset");

    example_1_sampling(&engine);
    example_2_function_library(&engine);
    example_3_profiling(&engine);

    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  All examples completed successfully!");
    println!("═══════════════════════════════════════════════════════════════");
}

/// Example 1: Deterministic seeded sampling
fn example_1_sampling(engine: &Engine) {
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Example 1: Seeded Sampling                                  │");
    println!("└─────────────────────────────────────────────────────────────┘\n");

    let sample = engine.sample("scores", 2, Some(42)).expect("sample");
    let table = engine.checkout(&sample, None).expect("checkout sample");
    println!("Sample dataset '{}' with {} rows:", sample, table.len());
    for row in table.rows() {
        println!("  id={} name={}", row.values[0], row.values[1]);
    }

    let lineage = engine.dataset(&sample).expect("handle");
    println!("Sampled from: {:?}\n", lineage.source());
}

/// Example 2: Register a function and update a column with it
fn example_2_function_library(engine: &Engine) {
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Example 2: Function Library Updates                         │");
    println!("└─────────────────────────────────────────────────────────────┘\n");

    // Registration is an explicit call, not a side effect.
    engine.library().register(
        FunctionHandle::new("round", |values| match values.first() {
            Some(Value::Float(f)) => Value::Int(f.round() as i64),
            Some(other) => other.clone(),
            None => Value::Null,
        })
        .namespace("math")
        .help("Round a float to the nearest integer"),
    );

    let updated = engine
        .update(
            "scores",
            &[ColumnRef::from("score")],
            "round",
            Some("math"),
            None,
        )
        .expect("update scores");
    for row in updated.rows() {
        println!("  {}: {}", row.values[1], row.values[2]);
    }
    println!();
}

/// Example 3: Profile the latest snapshot
fn example_3_profiling(engine: &Engine) {
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Example 3: Column Profiling                                 │");
    println!("└─────────────────────────────────────────────────────────────┘\n");

    let report = engine
        .profile("scores", None, &ColumnStatsProfiler::new())
        .expect("profile");
    println!("{}", serde_json::to_string_pretty(&report).expect("render"));

    // The report is also stored as the snapshot's dataset-level annotation.
    let stored = engine
        .metadata("scores", None)
        .expect("metadata")
        .read(None, None)
        .expect("read annotation");
    println!(
        "\nStored annotation keys: {:?}",
        stored.keys().collect::<Vec<_>>()
    );
}
