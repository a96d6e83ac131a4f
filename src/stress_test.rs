use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use vts_core::schema::Schema;
use vts_core::table::Table;
use vts_core::value::Value;
use vts_engine::Engine;

/// Statistics collected during stress testing
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub rows: usize,
    pub commits: usize,
    pub checkouts: usize,
    pub total_time: Duration,
    pub avg_commit_time: Duration,
    pub avg_checkout_time: Duration,
    pub ops_per_second: f64,
}

impl StressTestStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Stress Test Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Rows per Version:          {:>38} ║", self.rows);
        println!("║  Commits:                   {:>38} ║", self.commits);
        println!("║  Checkouts:                 {:>38} ║", self.checkouts);
        println!("║  Total Time:                {:>39}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Average Commit Time:       {:>36}µs ║", format!("{:.2}", self.avg_commit_time.as_micros()));
        println!("║  Average Checkout Time:     {:>36}µs ║", format!("{:.2}", self.avg_checkout_time.as_micros()));
        println!("║  Operations/Second:         {:>38.0} ║", self.ops_per_second);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// Build a keyed table of `rows` rows with randomized payload columns
fn random_table(rng: &mut StdRng, rows: usize) -> Table {
    let mut table = Table::new(Schema::of(["id", "score", "tag"]));
    for id in 0..rows {
        let score: f64 = rng.gen_range(0.0..100.0);
        let tag: u32 = rng.gen_range(0..16);
        table.push_row([
            Value::Int(id as i64),
            Value::Float(score),
            Value::Text(format!("tag-{}", tag)),
        ]);
    }
    table
}

/// Stress test for commit/checkout throughput on a single dataset
pub fn stress_test_commits(rows: usize, commits: usize, checkouts: usize) -> StressTestStats {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Dataset Commit Stress Test                          ║");
    println!("║  Rows: {} | Commits: {} | Checkouts: {} ║", rows, commits, checkouts);
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut rng = StdRng::seed_from_u64(7);
    let engine = Engine::volatile();
    let start = Instant::now();

    println!("\n[Phase 1/2] Committing versions...");

    let mut commit_times = Vec::with_capacity(commits);
    let initial = random_table(&mut rng, rows);
    engine
        .create(&initial, "stress", Some(vec!["id".to_string()]), true)
        .expect("create stress dataset");

    for i in 0..commits {
        let table = random_table(&mut rng, rows);
        let t = Instant::now();
        engine.commit("stress", &table, None).expect("commit");
        commit_times.push(t.elapsed());

        if (i + 1) % 100 == 0 {
            println!("  Commits completed: {}/{}", i + 1, commits);
        }
    }

    println!("[Phase 1/2] ✓ Completed");
    println!("[Phase 2/2] Checking out versions...");

    // Phase 2: Mixed latest and historical checkouts
    let mut checkout_times = Vec::with_capacity(checkouts);
    for i in 0..checkouts {
        let version = if i % 4 == 0 {
            Some(rng.gen_range(0..commits as u64))
        } else {
            None
        };
        let t = Instant::now();
        engine.checkout("stress", version).expect("checkout");
        checkout_times.push(t.elapsed());
    }

    println!("[Phase 2/2] ✓ Completed");

    let total_time = start.elapsed();
    let avg = |times: &[Duration]| {
        if times.is_empty() {
            Duration::ZERO
        } else {
            times.iter().sum::<Duration>() / times.len() as u32
        }
    };
    let total_operations = commits + checkouts + 1;
    let ops_per_second = total_operations as f64 / total_time.as_secs_f64();

    StressTestStats {
        rows,
        commits,
        checkouts,
        total_time,
        avg_commit_time: avg(&commit_times),
        avg_checkout_time: avg(&checkout_times),
        ops_per_second,
    }
}

/// Scaling analysis: how commit cost grows with row count
pub fn stress_test_scaling(max_rows: usize, steps: usize) {
    let mut rows = max_rows / steps.max(1);
    while rows <= max_rows {
        let stats = stress_test_commits(rows, 20, 50);
        println!(
            "  rows={:>7}  avg commit={:>8.2}µs  avg checkout={:>8.2}µs",
            stats.rows,
            stats.avg_commit_time.as_micros(),
            stats.avg_checkout_time.as_micros()
        );
        rows += max_rows / steps.max(1);
    }
}
