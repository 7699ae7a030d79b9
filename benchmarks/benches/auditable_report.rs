//! Auditable benchmark report harness.
//!
//! Uses `std::time::Instant` for wall-clock timing, NOT Criterion.
//! Emits a versioned `bench_report_v1` JSON artifact to `target/bench_reports/`.
//!
//! Measures both "attack throughput" (`execute()` + `verify()` on a prepared
//! ledger) and "report throughput" (the full run, genesis to report digest)
//! for each scenario.
//!
//! Run via `cargo bench --bench auditable_report`.

// Microsecond and percentile-index conversions between u128, usize and f64.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use std::fs;
use std::time::Instant;

use serde::Serialize;

use gauntlet_benchmarks::{prepare_attack, receipt_count};
use gauntlet_harness::config::HarnessConfig;
use gauntlet_harness::scenarios::ScenarioId;

// ---------------------------------------------------------------------------
// Report schema
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct BenchReport {
    version: &'static str,
    timestamp_utc: String,
    machine: MachineInfo,
    definitions: Definitions,
    results: Vec<BenchResult>,
}

#[derive(Serialize)]
struct MachineInfo {
    os: &'static str,
    arch: &'static str,
    rust_version: String,
}

/// Pin definitions so future readers know what the numbers mean.
#[derive(Serialize)]
struct Definitions {
    /// What the attack measurement covers.
    attack_definition: &'static str,
    /// How p95 is computed.
    p95_method: &'static str,
    /// Number of warmup iterations before measurement.
    warmup_iterations: usize,
    /// Number of timed iterations.
    timed_iterations: usize,
}

#[derive(Serialize)]
struct BenchResult {
    name: String,
    scenario: String,
    measurement: &'static str,
    #[serde(flatten)]
    summary: Summary,
    run_metadata: Option<RunMetadata>,
}

#[derive(Serialize)]
struct RunMetadata {
    player_transactions: u64,
    receipts: usize,
    report_bytes: usize,
    report_digest: String,
}

/// Wall-clock distribution of one measurement, in microseconds.
#[derive(Serialize)]
struct Summary {
    iterations: usize,
    mean_us: f64,
    p50_us: f64,
    p95_us: f64,
    min_us: f64,
    max_us: f64,
}

// ---------------------------------------------------------------------------
// Timing helpers
// ---------------------------------------------------------------------------

const WARMUP_ITERATIONS: usize = 5;
const TIMED_ITERATIONS: usize = 50;

impl Summary {
    /// Percentile `pct` of ascending `sorted` at index `round(pct/100 * (N-1))`.
    fn percentile(sorted: &[f64], pct: f64) -> f64 {
        let Some(last) = sorted.len().checked_sub(1) else {
            return 0.0;
        };
        sorted[((pct / 100.0 * last as f64).round() as usize).min(last)]
    }

    fn from_durations(mut durations_us: Vec<f64>) -> Self {
        durations_us.sort_by(f64::total_cmp);
        let iterations = durations_us.len();
        let mean_us = if iterations == 0 {
            0.0
        } else {
            durations_us.iter().sum::<f64>() / iterations as f64
        };
        Self {
            iterations,
            mean_us,
            p50_us: Self::percentile(&durations_us, 50.0),
            p95_us: Self::percentile(&durations_us, 95.0),
            min_us: durations_us.first().copied().unwrap_or(0.0),
            max_us: durations_us.last().copied().unwrap_or(0.0),
        }
    }
}

/// Warm up, then time `TIMED_ITERATIONS` calls. Returns the summary and the
/// last output.
fn measure<T>(mut f: impl FnMut() -> T) -> (Summary, Option<T>) {
    for _ in 0..WARMUP_ITERATIONS {
        std::hint::black_box(f());
    }
    let mut durations_us = Vec::with_capacity(TIMED_ITERATIONS);
    let mut last = None;
    for _ in 0..TIMED_ITERATIONS {
        let start = Instant::now();
        let out = f();
        durations_us.push(start.elapsed().as_micros() as f64);
        last = Some(out);
    }
    (Summary::from_durations(durations_us), last)
}

// ---------------------------------------------------------------------------
// Scenario runner
// ---------------------------------------------------------------------------

fn run_scenario_benchmarks(id: ScenarioId, config: &HarnessConfig) -> [BenchResult; 2] {
    let prepared = prepare_attack(id, config);
    let (attack, _) = measure(|| prepared.run_attack());

    let (report, last) = measure(|| id.run(config).expect("scenario run"));
    let run_metadata = last.map(|report| RunMetadata {
        player_transactions: report.player_transactions,
        receipts: receipt_count(&report.bytes),
        report_bytes: report.bytes.len(),
        report_digest: report.digest.as_str().to_string(),
    });

    [
        BenchResult {
            name: format!("{id}/attack"),
            scenario: id.to_string(),
            measurement: "execute_verify",
            summary: attack,
            run_metadata: None,
        },
        BenchResult {
            name: format!("{id}/report"),
            scenario: id.to_string(),
            measurement: "run_e2e",
            summary: report,
            run_metadata,
        },
    ]
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let config = HarnessConfig::default();
    let mut all_results = Vec::new();
    for id in ScenarioId::ALL {
        eprintln!("Benchmarking scenario: {id} ...");
        let results = run_scenario_benchmarks(id, &config);
        for r in &results {
            eprintln!(
                "  {}: mean={:.0}us p50={:.0}us p95={:.0}us",
                r.name, r.summary.mean_us, r.summary.p50_us, r.summary.p95_us,
            );
        }
        all_results.extend(results);
    }

    let rust_version = option_env!("RUSTC_VERSION")
        .unwrap_or(env!("CARGO_PKG_VERSION"))
        .to_string();

    let report = BenchReport {
        version: "bench_report_v1",
        timestamp_utc: {
            let since_epoch = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default();
            format!("epoch:{}", since_epoch.as_secs())
        },
        machine: MachineInfo {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            rust_version,
        },
        definitions: Definitions {
            attack_definition: "One attack is execute() followed by verify() on a clone of \
                the post-setup ledger. Setup and genesis funding are excluded.",
            p95_method: "Sort all iteration durations ascending, take value at index \
                round(0.95 * (N-1)) where N = timed_iterations.",
            warmup_iterations: WARMUP_ITERATIONS,
            timed_iterations: TIMED_ITERATIONS,
        },
        results: all_results,
    };

    let report_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../target/bench_reports");
    fs::create_dir_all(report_dir).expect("create bench_reports dir");

    let report_path = format!("{report_dir}/bench_report_v1_latest.json");
    let json = serde_json::to_string_pretty(&report).expect("serialize report");
    fs::write(&report_path, &json).expect("write report");

    eprintln!("\nReport written to: {report_path}");
    eprintln!(
        "({} results across {} scenarios)",
        report.results.len(),
        ScenarioId::ALL.len()
    );
}
