//! Scenario report: the content-addressed record of one run.
//!
//! # Report shape (`scenario_report.v1`)
//!
//! ```text
//! {
//!   "balances": {"after": {label: "wei"}, "before": {label: "wei"}},
//!   "config": { resolved harness config },
//!   "config_digest": "sha256:...",
//!   "player": "0x...",
//!   "player_transactions": n,
//!   "receipts": [ attack-phase receipts ],
//!   "scenario_id": "...",
//!   "schema_version": "scenario_report.v1",
//!   "state_digest": "sha256:...",
//!   "tracked": [{"asset": ..., "holder": ..., "label": ...}]
//! }
//! ```
//!
//! The bytes are canonical JSON and the digest is
//! `sha256(DOMAIN_SCENARIO_REPORT ‖ bytes)`. 256-bit balances are decimal
//! strings, so the canonical form stays integer-only.

use alloy_primitives::{Address, U256};
use gauntlet_ledger::proof::canon::{canonical_json_bytes, parse_canonical, CanonError};
use gauntlet_ledger::proof::hash::{canonical_hash, ContentHash};
use gauntlet_ledger::proof::hash_domain::HashDomain;
use gauntlet_ledger::vm::Receipt;
use thiserror::Error;

use crate::config::ResolvedConfig;
use crate::contract::TrackedBalance;

/// Domain prefix for report hashing.
pub const DOMAIN_SCENARIO_REPORT: HashDomain = HashDomain::ScenarioReport;

pub const REPORT_SCHEMA_VERSION: &str = "scenario_report.v1";

/// Error building or parsing a report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// Canonical JSON serialization or parsing failed.
    #[error("canonical JSON error: {0}")]
    Canon(#[from] CanonError),
    /// Two tracked balances share a label.
    #[error("duplicate balance label: {label}")]
    DuplicateLabel { label: String },
    /// `schema_version` is missing or unrecognized.
    #[error("report version mismatch: {found}")]
    VersionMismatch { found: String },
    /// A required field is missing or has the wrong type.
    #[error("report field invalid: {field}")]
    FieldInvalid { field: &'static str },
}

/// One tracked balance with its two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRow {
    pub tracked: TrackedBalance,
    pub before: U256,
    pub after: U256,
}

/// Everything the runner collected for a report.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub scenario_id: &'a str,
    pub config: &'a ResolvedConfig,
    pub player: Address,
    pub player_transactions: u64,
    pub balances: &'a [BalanceRow],
    pub receipts: &'a [Receipt],
    pub state_digest: &'a ContentHash,
}

/// A built (or re-read) report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub scenario_id: String,
    pub player_transactions: u64,
    pub state_digest: ContentHash,
    /// Canonical JSON bytes.
    pub bytes: Vec<u8>,
    /// `sha256(DOMAIN_SCENARIO_REPORT ‖ bytes)`.
    pub digest: ContentHash,
}

impl ScenarioReport {
    /// Balance `label` from the `before` or `after` snapshot.
    #[must_use]
    pub fn balance(&self, snapshot: Snapshot, label: &str) -> Option<U256> {
        let value: serde_json::Value = serde_json::from_slice(&self.bytes).ok()?;
        value["balances"][snapshot.key()][label]
            .as_str()?
            .parse()
            .ok()
    }

    /// Re-read a report from its canonical bytes and recompute the digest.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] for non-canonical bytes, an unknown schema
    /// version, or a missing field.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ReportError> {
        let value = parse_canonical(&bytes)?;
        let version = value["schema_version"].as_str().unwrap_or("");
        if version != REPORT_SCHEMA_VERSION {
            return Err(ReportError::VersionMismatch {
                found: version.to_string(),
            });
        }
        let scenario_id = value["scenario_id"]
            .as_str()
            .ok_or(ReportError::FieldInvalid {
                field: "scenario_id",
            })?
            .to_string();
        let player_transactions =
            value["player_transactions"]
                .as_u64()
                .ok_or(ReportError::FieldInvalid {
                    field: "player_transactions",
                })?;
        let state_digest = value["state_digest"]
            .as_str()
            .and_then(ContentHash::parse)
            .ok_or(ReportError::FieldInvalid {
                field: "state_digest",
            })?;
        let digest = canonical_hash(DOMAIN_SCENARIO_REPORT, &bytes);
        Ok(Self {
            scenario_id,
            player_transactions,
            state_digest,
            bytes,
            digest,
        })
    }
}

/// Which balance snapshot to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    Before,
    After,
}

impl Snapshot {
    fn key(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

fn hex_address(address: Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Assemble the canonical report.
///
/// # Errors
///
/// Returns [`ReportError::DuplicateLabel`] if two balances share a label,
/// or [`ReportError::Canon`] if serialization fails.
pub fn build_report(input: &ReportInput<'_>) -> Result<ScenarioReport, ReportError> {
    let mut before = serde_json::Map::new();
    let mut after = serde_json::Map::new();
    let mut tracked = Vec::with_capacity(input.balances.len());
    for row in input.balances {
        let label = row.tracked.label.to_string();
        if before.contains_key(&label) {
            return Err(ReportError::DuplicateLabel { label });
        }
        before.insert(label.clone(), row.before.to_string().into());
        after.insert(label.clone(), row.after.to_string().into());
        tracked.push(serde_json::json!({
            "asset": row.tracked.asset.label(),
            "holder": hex_address(row.tracked.holder),
            "label": label,
        }));
    }

    let config_digest = input.config.digest()?;
    let receipts: Vec<serde_json::Value> =
        input.receipts.iter().map(Receipt::to_canonical_json).collect();

    let value = serde_json::json!({
        "balances": {"after": after, "before": before},
        "config": input.config.to_canonical_json(),
        "config_digest": config_digest.as_str(),
        "player": hex_address(input.player),
        "player_transactions": input.player_transactions,
        "receipts": receipts,
        "scenario_id": input.scenario_id,
        "schema_version": REPORT_SCHEMA_VERSION,
        "state_digest": input.state_digest.as_str(),
        "tracked": tracked,
    });
    let bytes = canonical_json_bytes(&value)?;
    let digest = canonical_hash(DOMAIN_SCENARIO_REPORT, &bytes);
    Ok(ScenarioReport {
        scenario_id: input.scenario_id.to_string(),
        player_transactions: input.player_transactions,
        state_digest: input.state_digest.clone(),
        bytes,
        digest,
    })
}
