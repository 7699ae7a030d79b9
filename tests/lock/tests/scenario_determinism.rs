//! Determinism tests: prove scenario runs are reproducible.
//!
//! N=10 in-process runs of every scenario must produce identical report
//! digests, report bytes and ledger state digests.

use gauntlet_harness::config::HarnessConfig;
use gauntlet_harness::scenarios::ScenarioId;

const RUNS: usize = 10;

// ---------------------------------------------------------------------------
// In-process: N=10
// ---------------------------------------------------------------------------

#[test]
fn report_digest_deterministic_n10() {
    let config = HarnessConfig::default();
    for id in ScenarioId::ALL {
        let first = id.run(&config).unwrap();
        for i in 1..RUNS {
            let result = id.run(&config).unwrap();
            assert_eq!(
                first.digest.as_str(),
                result.digest.as_str(),
                "{id}: report digest differed on run {i}"
            );
        }
    }
}

#[test]
fn report_bytes_and_state_digest_deterministic_n10() {
    let config = HarnessConfig::default();
    for id in ScenarioId::ALL {
        let first = id.run(&config).unwrap();
        for i in 1..RUNS {
            let result = id.run(&config).unwrap();
            assert_eq!(first.bytes, result.bytes, "{id}: report bytes differed on run {i}");
            assert_eq!(
                first.state_digest, result.state_digest,
                "{id}: state digest differed on run {i}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Distinctness
// ---------------------------------------------------------------------------

#[test]
fn every_scenario_has_a_distinct_report_and_state() {
    let config = HarnessConfig::default();
    let reports: Vec<_> = ScenarioId::ALL
        .iter()
        .map(|id| id.run(&config).unwrap())
        .collect();
    for (i, a) in reports.iter().enumerate() {
        for b in &reports[i + 1..] {
            assert_ne!(a.digest, b.digest, "{} and {}", a.scenario_id, b.scenario_id);
            assert_ne!(
                a.state_digest, b.state_digest,
                "{} and {}",
                a.scenario_id, b.scenario_id
            );
        }
    }
}

#[test]
fn config_changes_move_the_digest() {
    let id = ScenarioId::SideEntrance;
    let baseline = id.run(&HarnessConfig::default()).unwrap();
    let later = id
        .run(&HarnessConfig {
            genesis_timestamp: Some(1_800_000_000),
            ..HarnessConfig::default()
        })
        .unwrap();
    assert_ne!(baseline.digest, later.digest);
    assert_ne!(baseline.state_digest, later.state_digest);
}
