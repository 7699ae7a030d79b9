//! Scenario contract: the minimal trait an exploit scenario must implement.
//!
//! A scenario provides three phases over an explicit ledger:
//!
//! - `setup` deploys and funds the targets from literal constants and
//!   asserts the post-setup state exactly, including that protected
//!   operations reject direct callers.
//! - `execute` runs the attack using only what any account can do: deploy
//!   helper contracts, send transactions, call public functions.
//! - `verify` checks literal post-conditions over balances.
//!
//! Scenarios may NOT hash, snapshot balances, count transactions or build
//! reports. Those are runner concerns.

use std::fmt::Display;

use alloy_primitives::{Address, U256};
use gauntlet_ledger::revert::{CallResult, Revert};
use gauntlet_ledger::vm::Ledger;
use gauntlet_targets::erc20;
use thiserror::Error;

use crate::actors::SIGNER_1;

/// Typed failure of a scenario phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    /// Deployment, funding or a post-setup assertion failed.
    #[error("setup failed: {detail}")]
    Setup { detail: String },
    /// A protected operation accepted a caller it should have rejected.
    #[error("guard bypassed: {call} succeeded for an unauthorized caller")]
    GuardBypassed { call: &'static str },
    /// An attack transaction or a read it depends on reverted.
    #[error("attack step `{step}` reverted: {source}")]
    Attack {
        step: &'static str,
        #[source]
        source: Revert,
    },
    /// A post-condition does not hold.
    #[error("check `{check}` failed: expected {expected}, got {actual}")]
    Verification {
        check: &'static str,
        expected: String,
        actual: String,
    },
}

impl ScenarioError {
    pub fn setup(detail: impl Into<String>) -> Self {
        Self::Setup {
            detail: detail.into(),
        }
    }
}

/// Attach a phase to a ledger result.
pub trait PhaseExt<T> {
    /// Map a revert during setup to [`ScenarioError::Setup`].
    ///
    /// # Errors
    ///
    /// Returns the mapped error when `self` is a revert.
    fn in_setup(self, what: &str) -> Result<T, ScenarioError>;

    /// Map a revert during the attack to [`ScenarioError::Attack`].
    ///
    /// # Errors
    ///
    /// Returns the mapped error when `self` is a revert.
    fn attack_step(self, step: &'static str) -> Result<T, ScenarioError>;

    /// Map a revert while reading a post-condition to
    /// [`ScenarioError::Verification`].
    ///
    /// # Errors
    ///
    /// Returns the mapped error when `self` is a revert.
    fn in_check(self, check: &'static str) -> Result<T, ScenarioError>;
}

impl<T> PhaseExt<T> for CallResult<T> {
    fn in_setup(self, what: &str) -> Result<T, ScenarioError> {
        self.map_err(|revert| ScenarioError::setup(format!("{what}: {revert}")))
    }

    fn attack_step(self, step: &'static str) -> Result<T, ScenarioError> {
        self.map_err(|source| ScenarioError::Attack { step, source })
    }

    fn in_check(self, check: &'static str) -> Result<T, ScenarioError> {
        self.map_err(|revert| ScenarioError::Verification {
            check,
            expected: "a readable value".into(),
            actual: revert.to_string(),
        })
    }
}

/// Which asset a tracked balance is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    /// Native ETH.
    Native,
    /// An ERC-20 token at this address.
    Token(Address),
}

impl Asset {
    /// `"ETH"` or the token address as lowercase hex.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Native => "ETH".to_string(),
            Self::Token(token) => format!("0x{}", hex::encode(token)),
        }
    }

    /// Current balance of `holder`.
    ///
    /// # Errors
    ///
    /// Returns the token's revert for an ERC-20 balance.
    pub fn balance_of(&self, vm: &Ledger, holder: Address) -> CallResult<U256> {
        match self {
            Self::Native => Ok(vm.balance(holder)),
            Self::Token(token) => erc20::balance_of(vm, *token, holder),
        }
    }
}

/// A balance the runner snapshots before and after the attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedBalance {
    pub label: &'static str,
    pub asset: Asset,
    pub holder: Address,
}

impl TrackedBalance {
    #[must_use]
    pub const fn native(label: &'static str, holder: Address) -> Self {
        Self {
            label,
            asset: Asset::Native,
            holder,
        }
    }

    #[must_use]
    pub const fn token(label: &'static str, token: Address, holder: Address) -> Self {
        Self {
            label,
            asset: Asset::Token(token),
            holder,
        }
    }
}

/// The contract a scenario must implement to be run by the runner.
pub trait Scenario {
    /// Addresses (and attack observations) produced by setup.
    type Fixture;

    /// Unique scenario identifier (e.g., `"truster"`).
    fn id(&self) -> &'static str;

    /// The unprivileged account that runs the attack.
    fn player(&self) -> Address {
        SIGNER_1
    }

    /// Maximum player transactions the attack may use. `None` is unbounded.
    fn player_transaction_budget(&self) -> Option<u64> {
        None
    }

    /// Deploy and fund the targets, then assert the initial state.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Setup`] or [`ScenarioError::GuardBypassed`].
    fn setup(&self, vm: &mut Ledger) -> Result<Self::Fixture, ScenarioError>;

    /// Run the attack as [`Scenario::player`].
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Attack`] for the first reverted step.
    fn execute(&self, vm: &mut Ledger, fixture: &mut Self::Fixture) -> Result<(), ScenarioError>;

    /// Check the post-conditions.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Verification`] for the first failed check.
    fn verify(&self, vm: &Ledger, fixture: &Self::Fixture) -> Result<(), ScenarioError>;

    /// Balances recorded in the report.
    fn tracked_balances(&self, fixture: &Self::Fixture) -> Vec<TrackedBalance>;
}

/// Require `actual == expected` during setup.
///
/// # Errors
///
/// Returns [`ScenarioError::Setup`] naming `what` on mismatch.
pub fn setup_eq<T: PartialEq + Display>(what: &str, expected: T, actual: T) -> Result<(), ScenarioError> {
    if actual == expected {
        Ok(())
    } else {
        Err(ScenarioError::setup(format!(
            "{what}: expected {expected}, got {actual}"
        )))
    }
}

/// Require `actual == expected` as a post-condition.
///
/// # Errors
///
/// Returns [`ScenarioError::Verification`] on mismatch.
pub fn check_eq<T: PartialEq + Display>(check: &'static str, expected: T, actual: T) -> Result<(), ScenarioError> {
    check_that(check, actual == expected, expected, actual)
}

/// Require `condition` as a post-condition, describing both sides.
///
/// # Errors
///
/// Returns [`ScenarioError::Verification`] when `condition` is false.
pub fn check_that(
    check: &'static str,
    condition: bool,
    expected: impl Display,
    actual: impl Display,
) -> Result<(), ScenarioError> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioError::Verification {
            check,
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Require that a protected call was rejected with the tagged
/// access-control error `error`.
///
/// # Errors
///
/// Returns [`ScenarioError::GuardBypassed`] if the call succeeded, or
/// [`ScenarioError::Verification`] if it reverted for another reason.
pub fn expect_unauthorized<T>(
    result: CallResult<T>,
    call: &'static str,
    error: &'static str,
) -> Result<(), ScenarioError> {
    match result {
        Ok(_) => Err(ScenarioError::GuardBypassed { call }),
        Err(Revert::Unauthorized { error: raised }) if raised == error => Ok(()),
        Err(other) => Err(ScenarioError::Verification {
            check: call,
            expected: format!("revert {error}"),
            actual: other.to_string(),
        }),
    }
}
