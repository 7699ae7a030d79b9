//! Report directory persistence: write/read/verify a [`ScenarioReport`].
//!
//! # Directory layout
//!
//! ```text
//! <dir>/
//!   report.json          : canonical JSON report bytes
//!   report_digest.txt    : ASCII digest string ("sha256:...")
//! ```
//!
//! The directory path is never part of any hash surface. Writing refuses a
//! directory that already holds undeclared files, so whatever
//! [`write_report_dir`] accepts, [`read_report_dir`] reads back.
//!
//! # Fail-closed semantics
//!
//! - Missing file → error
//! - Extra undeclared file → error
//! - Non-canonical `report.json` → error
//! - Digest mismatch → error

use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;

use crate::report::{ReportError, ScenarioReport};

const REPORT_FILENAME: &str = "report.json";
const DIGEST_FILENAME: &str = "report_digest.txt";

const DECLARED_FILENAMES: &[&str] = &[REPORT_FILENAME, DIGEST_FILENAME];

/// Error writing a report directory.
#[derive(Debug, Error)]
pub enum ReportDirWriteError {
    #[error("I/O error: {detail}")]
    Io { detail: String },
    /// The target directory already holds a file outside the layout.
    #[error("directory holds undeclared file: {name}")]
    UndeclaredFile { name: String },
}

/// Error reading a report directory.
#[derive(Debug, Error)]
pub enum ReportDirReadError {
    #[error("I/O error: {detail}")]
    Io { detail: String },
    /// A declared file is missing.
    #[error("missing file: {filename}")]
    MissingFile { filename: String },
    /// An undeclared file exists in the directory.
    #[error("undeclared extra file: {name}")]
    ExtraFile { name: String },
    /// `report.json` is not a valid canonical report.
    #[error("invalid report: {0}")]
    Report(#[from] ReportError),
    /// `report_digest.txt` does not match the recomputed digest.
    #[error("digest mismatch: stored={stored}, recomputed={recomputed}")]
    DigestMismatch { stored: String, recomputed: String },
}

/// Write `report` into `dir`, creating the directory if needed. An earlier
/// report in the same directory is overwritten.
///
/// # Errors
///
/// Returns [`ReportDirWriteError::UndeclaredFile`] if `dir` holds any file
/// other than the two report files, and [`ReportDirWriteError::Io`] on any
/// filesystem failure.
pub fn write_report_dir(report: &ScenarioReport, dir: &Path) -> Result<(), ReportDirWriteError> {
    std::fs::create_dir_all(dir).map_err(|e| ReportDirWriteError::Io {
        detail: format!("create_dir_all: {e}"),
    })?;
    let existing = list_files(dir).map_err(|e| ReportDirWriteError::Io {
        detail: format!("read_dir {}: {e}", dir.display()),
    })?;
    if let Some(name) = undeclared(existing) {
        return Err(ReportDirWriteError::UndeclaredFile { name });
    }
    write_atomic(&dir.join(REPORT_FILENAME), &report.bytes)?;
    write_atomic(&dir.join(DIGEST_FILENAME), report.digest.as_str().as_bytes())?;
    Ok(())
}

/// Read and verify a report directory.
///
/// # Errors
///
/// Returns [`ReportDirReadError`] on any validation failure.
pub fn read_report_dir(dir: &Path) -> Result<ScenarioReport, ReportDirReadError> {
    let bytes = read_required(dir, REPORT_FILENAME)?;
    let stored = read_required(dir, DIGEST_FILENAME)?;

    let files = list_files(dir).map_err(|e| ReportDirReadError::Io {
        detail: e.to_string(),
    })?;
    if let Some(name) = undeclared(files) {
        return Err(ReportDirReadError::ExtraFile { name });
    }

    let report = ScenarioReport::from_bytes(bytes)?;
    let stored = String::from_utf8_lossy(&stored).trim().to_string();
    if report.digest.as_str() != stored {
        return Err(ReportDirReadError::DigestMismatch {
            stored,
            recomputed: report.digest.as_str().to_string(),
        });
    }
    Ok(report)
}

/// Write via temp file + rename (best-effort atomicity on Unix).
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ReportDirWriteError> {
    let dir = path.parent().ok_or_else(|| ReportDirWriteError::Io {
        detail: "no parent directory".into(),
    })?;
    let temp_path = dir.join(format!(
        ".tmp_{}",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));
    std::fs::write(&temp_path, content).map_err(|e| ReportDirWriteError::Io {
        detail: format!("write {}: {e}", temp_path.display()),
    })?;
    std::fs::rename(&temp_path, path).map_err(|e| ReportDirWriteError::Io {
        detail: format!("rename {} → {}: {e}", temp_path.display(), path.display()),
    })
}

fn read_required(dir: &Path, filename: &str) -> Result<Vec<u8>, ReportDirReadError> {
    std::fs::read(dir.join(filename)).map_err(|_| ReportDirReadError::MissingFile {
        filename: filename.to_string(),
    })
}

fn undeclared(files: BTreeSet<String>) -> Option<String> {
    files
        .into_iter()
        .find(|name| !DECLARED_FILENAMES.contains(&name.as_str()))
}

/// Regular files in `dir`, skipping leftover temp files.
fn list_files(dir: &Path) -> std::io::Result<BTreeSet<String>> {
    let mut files = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with(".tmp_") {
                files.insert(name.to_string());
            }
        }
    }
    Ok(files)
}
