//! Report directory lock tests: persistence round-trip and fail-closed
//! reads over real scenario reports.

use gauntlet_harness::config::HarnessConfig;
use gauntlet_harness::report::{ReportError, ScenarioReport};
use gauntlet_harness::report_dir::{
    read_report_dir, write_report_dir, ReportDirReadError, ReportDirWriteError,
};
use gauntlet_harness::scenarios::ScenarioId;
use gauntlet_ledger::proof::canon::CanonError;

fn truster_report() -> ScenarioReport {
    ScenarioId::Truster.run(&HarnessConfig::default()).unwrap()
}

fn written(report: &ScenarioReport) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_report_dir(report, dir.path()).unwrap();
    dir
}

fn rewrite_report(dir: &tempfile::TempDir, from: &str, to: &str) {
    let path = dir.path().join("report.json");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains(from), "report.json lacks {from}");
    std::fs::write(&path, text.replacen(from, to, 1)).unwrap();
}

// ---------------------------------------------------------------------------
// Round-trip
// ---------------------------------------------------------------------------

#[test]
fn roundtrip_every_scenario_report() {
    for id in ScenarioId::ALL {
        let report = id.run(&HarnessConfig::default()).unwrap();
        let dir = written(&report);
        let loaded = read_report_dir(dir.path()).unwrap();

        assert_eq!(loaded.digest.as_str(), report.digest.as_str(), "{id}");
        assert_eq!(loaded.bytes, report.bytes, "{id}");
        assert_eq!(loaded.scenario_id, id.as_str());
        assert_eq!(loaded.player_transactions, report.player_transactions);
        assert_eq!(loaded.state_digest, report.state_digest);
    }
}

#[test]
fn directory_path_is_not_hashed() {
    let report = truster_report();
    let a = written(&report);
    let b = tempfile::tempdir().unwrap();
    let nested = b.path().join("deeper").join("still");
    write_report_dir(&report, &nested).unwrap();
    assert_eq!(
        read_report_dir(a.path()).unwrap().digest,
        read_report_dir(&nested).unwrap().digest
    );
}

#[test]
fn rewriting_a_directory_replaces_its_report() {
    let dir = written(&truster_report());
    let other = ScenarioId::SideEntrance
        .run(&HarnessConfig::default())
        .unwrap();
    write_report_dir(&other, dir.path()).unwrap();
    assert_eq!(read_report_dir(dir.path()).unwrap().digest, other.digest);
}

// ---------------------------------------------------------------------------
// Fail-closed
// ---------------------------------------------------------------------------

#[test]
fn write_refuses_directory_with_stale_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("stale.txt"), b"old run").unwrap();
    let err = write_report_dir(&truster_report(), dir.path()).unwrap_err();
    assert!(
        matches!(err, ReportDirWriteError::UndeclaredFile { ref name } if name == "stale.txt"),
        "expected UndeclaredFile for stale.txt, got {err}"
    );
    assert!(matches!(
        read_report_dir(dir.path()),
        Err(ReportDirReadError::MissingFile { .. })
    ));
}

#[test]
fn fail_closed_missing_digest_file() {
    let dir = written(&truster_report());
    std::fs::remove_file(dir.path().join("report_digest.txt")).unwrap();
    let err = read_report_dir(dir.path()).unwrap_err();
    assert!(
        matches!(err, ReportDirReadError::MissingFile { ref filename } if filename == "report_digest.txt"),
        "expected MissingFile for report_digest.txt, got {err}"
    );
}

#[test]
fn fail_closed_extra_file() {
    let dir = written(&truster_report());
    std::fs::write(dir.path().join("rogue.txt"), b"surprise").unwrap();
    let err = read_report_dir(dir.path()).unwrap_err();
    assert!(
        matches!(err, ReportDirReadError::ExtraFile { ref name } if name == "rogue.txt"),
        "expected ExtraFile for rogue.txt, got {err}"
    );
}

#[test]
fn fail_closed_non_canonical_report() {
    let report = truster_report();
    let dir = written(&report);
    let value: serde_json::Value = serde_json::from_slice(&report.bytes).unwrap();
    std::fs::write(
        dir.path().join("report.json"),
        serde_json::to_vec_pretty(&value).unwrap(),
    )
    .unwrap();
    let err = read_report_dir(dir.path()).unwrap_err();
    assert!(
        matches!(
            err,
            ReportDirReadError::Report(ReportError::Canon(CanonError::NotCanonical))
        ),
        "expected NotCanonical, got {err}"
    );
}

#[test]
fn fail_closed_tampered_balance() {
    let dir = written(&truster_report());
    rewrite_report(
        &dir,
        "\"player_dvt\":\"1000000000000000000000000\"",
        "\"player_dvt\":\"2000000000000000000000000\"",
    );
    let err = read_report_dir(dir.path()).unwrap_err();
    assert!(
        matches!(err, ReportDirReadError::DigestMismatch { .. }),
        "expected DigestMismatch, got {err}"
    );
}

#[test]
fn fail_closed_unknown_schema_version() {
    let dir = written(&truster_report());
    rewrite_report(&dir, "scenario_report.v1", "scenario_report.v9");
    let err = read_report_dir(dir.path()).unwrap_err();
    assert!(
        matches!(
            err,
            ReportDirReadError::Report(ReportError::VersionMismatch { ref found }) if found == "scenario_report.v9"
        ),
        "expected VersionMismatch, got {err}"
    );
}
