//! Example: Versioned Dataset History
//!
//! This example demonstrates:
//! 1. Creating a dataset with a declared primary key
//! 2. Committing new versions and checking out old ones
//! 3. Stable row identifiers across updates
//! 4. The snapshot history listing

use vts_core::schema::Schema;
use vts_core::table::Table;
use vts_core::value::Value;
use vts_engine::Engine;

fn main() {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Versioned Dataset History for Sardonyx");
    println!("═══════════════════════════════════════════════════════════════\n");

    example_1_create_and_commit();
    example_2_row_identity();
    example_3_history_listing();

    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  All examples completed successfully!");
    println!("═══════════════════════════════════════════════════════════════");
}

fn people_v0() -> Table {
    let mut table = Table::new(Schema::of(["id", "name", "city"]));
    table.push_row([Value::Int(1), Value::from("ann"), Value::from("berlin")]);
    table.push_row([Value::Int(2), Value::from("bob"), Value::from("paris")]);
    table.push_row([Value::Int(3), Value::from("cid"), Value::from("tokyo")]);
    table
}

fn people_v1() -> Table {
    let mut table = Table::new(Schema::of(["id", "name", "city"]));
    table.push_row([Value::Int(1), Value::from("anne"), Value::from("berlin")]);
    table.push_row([Value::Int(3), Value::from("cid"), Value::from("osaka")]);
    table.push_row([Value::Int(4), Value::from("dot"), Value::from("lima")]);
    table
}

/// Example 1: Create a dataset and commit a second version
fn example_1_create_and_commit() {
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Example 1: Create and Commit                                │");
    println!("└─────────────────────────────────────────────────────────────┘\n");

    let engine = Engine::volatile();
    let v0 = engine
        .create(&people_v0(), "people", Some(vec!["id".to_string()]), true)
        .expect("create dataset");
    println!("Version 0 committed with {} rows", v0.len());

    let v1 = engine
        .commit("people", &people_v1(), None)
        .expect("commit version 1");
    println!("Version 1 committed with {} rows", v1.len());

    let old = engine.checkout("people", Some(0)).expect("checkout v0");
    println!("Checked out version 0 again: {} rows\n", old.len());
}

/// Example 2: Row identifiers survive updates, deletions retire them
fn example_2_row_identity() {
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Example 2: Stable Row Identity                              │");
    println!("└─────────────────────────────────────────────────────────────┘\n");

    let engine = Engine::volatile();
    engine
        .create(&people_v0(), "people", Some(vec!["id".to_string()]), true)
        .expect("create dataset");
    engine
        .commit("people", &people_v1(), None)
        .expect("commit version 1");

    let v0 = engine.checkout("people", Some(0)).expect("checkout v0");
    let v1 = engine.checkout("people", Some(1)).expect("checkout v1");

    for row in v1.rows() {
        let id = row.id.expect("materialized rows carry identifiers");
        let known = v0.rows().iter().any(|r| r.id == Some(id));
        println!(
            "row id={} name={} ({})",
            id,
            row.values[1],
            if known { "kept from v0" } else { "fresh" }
        );
    }
    println!();
}

/// Example 3: The history listing with action descriptors
fn example_3_history_listing() {
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Example 3: History Listing                                  │");
    println!("└─────────────────────────────────────────────────────────────┘\n");

    let engine = Engine::volatile();
    engine
        .create(&people_v0(), "people", Some(vec!["id".to_string()]), true)
        .expect("create dataset");
    engine
        .commit(
            "people",
            &people_v1(),
            Some(serde_json::json!({ "op": "cleanup", "by": "demo" })),
        )
        .expect("commit version 1");

    for descriptor in engine.history("people").expect("history") {
        println!(
            "version {} at {}ms: {} rows, action: {}",
            descriptor.version,
            descriptor.created_at,
            descriptor.rows,
            descriptor
                .action
                .map(|a| a.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
}
