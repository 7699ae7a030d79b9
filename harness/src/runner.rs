//! Harness runner: drives a scenario through its phases and produces a
//! report.
//!
//! The runner owns everything scenarios may not do: ledger construction,
//! genesis funding, balance snapshots, the player transaction budget, the
//! state digest and the report.
//!
//! # Pipeline
//!
//! ```text
//! resolve config → Ledger::new() → fund DEV_SIGNERS
//!   → setup() → snapshot "before" → execute() → budget check
//!   → verify() → snapshot "after" → state_digest() → build_report()
//! ```

use alloy_primitives::U256;
use gauntlet_ledger::proof::canon::CanonError;
use gauntlet_ledger::revert::CallResult;
use gauntlet_ledger::vm::Ledger;
use thiserror::Error;
use tracing::{debug, info};

use crate::actors::DEV_SIGNERS;
use crate::config::HarnessConfig;
use crate::contract::{Scenario, ScenarioError, TrackedBalance};
use crate::report::{build_report, BalanceRow, ReportError, ReportInput, ScenarioReport};

/// Error during a harness run, tagged with the phase that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("setup phase: {0}")]
    Setup(ScenarioError),
    #[error("execute phase: {0}")]
    Execute(ScenarioError),
    #[error("verify phase: {0}")]
    Verify(ScenarioError),
    /// The player sent more transactions than the scenario allows.
    #[error("player sent {actual} transactions, budget is {budget}")]
    TransactionBudgetExceeded { budget: u64, actual: u64 },
    /// Snapshotting, digesting or serializing the outcome failed.
    #[error("report: {0}")]
    Report(#[from] ReportError),
}

impl From<CanonError> for RunError {
    fn from(e: CanonError) -> Self {
        Self::Report(ReportError::Canon(e))
    }
}

/// A finished run: the final ledger plus its report.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub ledger: Ledger,
    pub report: ScenarioReport,
}

/// Run `scenario` and return its report.
///
/// # Errors
///
/// Returns the [`RunError`] of the first phase that failed.
pub fn run<S: Scenario>(scenario: &S, config: &HarnessConfig) -> Result<ScenarioReport, RunError> {
    run_with_ledger(scenario, config).map(|run| run.report)
}

/// Run `scenario`, keeping the final ledger for inspection.
///
/// # Errors
///
/// Returns the [`RunError`] of the first phase that failed.
pub fn run_with_ledger<S: Scenario>(
    scenario: &S,
    config: &HarnessConfig,
) -> Result<ScenarioRun, RunError> {
    let id = scenario.id();
    let resolved = config.resolve(scenario.player_transaction_budget());
    let mut ledger = Ledger::new(resolved.ledger.clone());
    for signer in DEV_SIGNERS {
        ledger.set_balance(signer, resolved.genesis_balance);
    }

    info!(scenario = id, "setup");
    let mut fixture = scenario.setup(&mut ledger).map_err(RunError::Setup)?;
    let tracked = scenario.tracked_balances(&fixture);
    let before = snapshot(&ledger, &tracked).map_err(|revert| {
        RunError::Setup(ScenarioError::setup(format!("balance snapshot: {revert}")))
    })?;

    let player = scenario.player();
    let nonce_before = ledger.transaction_count(player);
    let first_attack_receipt = ledger.receipts().len();
    info!(scenario = id, %player, "execute");
    scenario
        .execute(&mut ledger, &mut fixture)
        .map_err(RunError::Execute)?;

    let player_transactions = ledger.transaction_count(player) - nonce_before;
    if let Some(budget) = resolved.player_transaction_budget {
        if player_transactions > budget {
            return Err(RunError::TransactionBudgetExceeded {
                budget,
                actual: player_transactions,
            });
        }
    }

    info!(scenario = id, player_transactions, "verify");
    scenario
        .verify(&ledger, &fixture)
        .map_err(RunError::Verify)?;
    let after = snapshot(&ledger, &tracked).map_err(|revert| {
        RunError::Verify(ScenarioError::Verification {
            check: "balance snapshot",
            expected: "readable balances".into(),
            actual: revert.to_string(),
        })
    })?;

    let balances: Vec<BalanceRow> = tracked
        .into_iter()
        .zip(before.into_iter().zip(after))
        .map(|(tracked, (before, after))| BalanceRow {
            tracked,
            before,
            after,
        })
        .collect();
    for row in &balances {
        debug!(label = row.tracked.label, before = %row.before, after = %row.after, "balance");
    }

    let state_digest = ledger.state_digest()?;
    let report = build_report(&ReportInput {
        scenario_id: id,
        config: &resolved,
        player,
        player_transactions,
        balances: &balances,
        receipts: &ledger.receipts()[first_attack_receipt..],
        state_digest: &state_digest,
    })?;
    info!(scenario = id, digest = %report.digest, "report built");
    Ok(ScenarioRun { ledger, report })
}

fn snapshot(vm: &Ledger, tracked: &[TrackedBalance]) -> CallResult<Vec<U256>> {
    tracked
        .iter()
        .map(|entry| entry.asset.balance_of(vm, entry.holder))
        .collect()
}
