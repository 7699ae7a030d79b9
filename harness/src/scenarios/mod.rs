//! The six exploit scenarios, plus a registry to run them by id.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use gauntlet_ledger::vm::Ledger;
use gauntlet_targets::erc20;

use crate::config::HarnessConfig;
use crate::contract::{check_eq, check_that, PhaseExt, ScenarioError};
use crate::report::ScenarioReport;
use crate::runner::{run, RunError};

pub mod abi_smuggling;
pub mod naive_receiver;
pub mod puppet;
pub mod puppet_v2;
pub mod side_entrance;
pub mod truster;

/// Seconds of slack given to swap and liquidity deadlines.
pub const DEADLINE_WINDOW_SECS: u64 = 300;

/// Deadline for the next transaction: the timestamp of the block it will be
/// mined in, plus [`DEADLINE_WINDOW_SECS`].
#[must_use]
pub fn deadline(vm: &Ledger) -> U256 {
    U256::from(
        vm.timestamp()
            .saturating_add(vm.config().block_interval_secs)
            .saturating_add(DEADLINE_WINDOW_SECS),
    )
}

/// Every registered scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScenarioId {
    AbiSmuggling,
    NaiveReceiver,
    Puppet,
    PuppetV2,
    SideEntrance,
    Truster,
}

impl ScenarioId {
    pub const ALL: [Self; 6] = [
        Self::AbiSmuggling,
        Self::NaiveReceiver,
        Self::Puppet,
        Self::PuppetV2,
        Self::SideEntrance,
        Self::Truster,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AbiSmuggling => abi_smuggling::ID,
            Self::NaiveReceiver => naive_receiver::ID,
            Self::Puppet => puppet::ID,
            Self::PuppetV2 => puppet_v2::ID,
            Self::SideEntrance => side_entrance::ID,
            Self::Truster => truster::ID,
        }
    }

    /// Run this scenario under `config`.
    ///
    /// # Errors
    ///
    /// Returns the runner's [`RunError`].
    pub fn run(self, config: &HarnessConfig) -> Result<ScenarioReport, RunError> {
        match self {
            Self::AbiSmuggling => run(&abi_smuggling::AbiSmuggling, config),
            Self::NaiveReceiver => run(&naive_receiver::NaiveReceiver, config),
            Self::Puppet => run(&puppet::Puppet, config),
            Self::PuppetV2 => run(&puppet_v2::PuppetV2, config),
            Self::SideEntrance => run(&side_entrance::SideEntrance, config),
            Self::Truster => run(&truster::Truster, config),
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`ScenarioId::from_str`] for an unknown id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scenario: {0}")]
pub struct UnknownScenario(pub String);

impl FromStr for ScenarioId {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownScenario(s.to_string()))
    }
}

/// A lending pool's collateral quote for the same borrow, read before and
/// after the oracle was moved, next to the value the constant-product
/// formula predicts for the moved reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleShift {
    pub before: U256,
    pub after: U256,
    pub predicted: U256,
}

impl OracleShift {
    /// The quote must fall, and land exactly on the prediction.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Verification`] otherwise.
    pub fn verify(&self) -> Result<(), ScenarioError> {
        check_that(
            "collateral quote decreased",
            self.after < self.before,
            format!("< {}", self.before),
            self.after,
        )?;
        check_that(
            "collateral quote matches reserves",
            self.after == self.predicted,
            self.predicted,
            self.after,
        )
    }
}

/// Post-conditions shared by the oracle-manipulation scenarios: the pool's
/// tokens all went to the player, and the oracle moved as predicted.
///
/// # Errors
///
/// Returns [`ScenarioError::Verification`] for the first failed check.
pub fn verify_pool_drained(
    vm: &Ledger,
    token: Address,
    pool: Address,
    player: Address,
    pool_balance: U256,
    shift: Option<OracleShift>,
) -> Result<(), ScenarioError> {
    let balance =
        |holder| erc20::balance_of(vm, token, holder).in_check("token balance readable");
    check_eq("pool token balance", U256::ZERO, balance(pool)?)?;
    let player = balance(player)?;
    check_that(
        "player token balance",
        player >= pool_balance,
        format!(">= {pool_balance}"),
        player,
    )?;
    shift
        .ok_or_else(|| ScenarioError::Verification {
            check: "oracle shift recorded",
            expected: "a quote before and after the swap".into(),
            actual: "none".into(),
        })?
        .verify()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip_through_from_str() {
        for id in ScenarioId::ALL {
            assert_eq!(id.as_str().parse::<ScenarioId>().unwrap(), id);
        }
        assert!("puppet-v3".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn ids_are_unique() {
        let mut names: Vec<&str> = ScenarioId::ALL.iter().map(|id| id.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ScenarioId::ALL.len());
    }

    #[test]
    fn deadline_covers_the_next_block() {
        use gauntlet_ledger::vm::LedgerConfig;

        let mut vm = Ledger::new(LedgerConfig {
            genesis_timestamp: 0,
            block_interval_secs: 600,
            ..LedgerConfig::default()
        });
        assert_eq!(deadline(&vm), U256::from(600 + DEADLINE_WINDOW_SECS));
        vm.warp(1_000);
        assert_eq!(deadline(&vm), U256::from(1_600 + DEADLINE_WINDOW_SECS));
    }

    #[test]
    fn oracle_shift_requires_a_drop_to_the_prediction() {
        let shift = |before: u64, after: u64, predicted: u64| OracleShift {
            before: U256::from(before),
            after: U256::from(after),
            predicted: U256::from(predicted),
        };
        assert!(shift(10, 3, 3).verify().is_ok());
        assert!(shift(10, 10, 10).verify().is_err());
        assert!(shift(10, 3, 4).verify().is_err());
    }
}
