use stress_test::{stress_test_commits, stress_test_scaling};
pub mod stress_test;

fn main() {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            DATASET STORE STRESS TESTS                       ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Test 1: Small tables, many versions
    let stats = stress_test_commits(100, 200, 400);
    stats.print();

    // Test 2: Medium tables
    let stats = stress_test_commits(1_000, 100, 200);
    stats.print();

    // Test 3: Large tables, few versions
    let stats = stress_test_commits(10_000, 20, 50);
    stats.print();

    // Test 4: Scaling analysis
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SCALING ANALYSIS (commit cost vs rows)            ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    stress_test_scaling(20_000, 4);

    println!("\n✓ All stress tests completed successfully!");
}
