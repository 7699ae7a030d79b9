//! Ledger transaction semantics over real targets: a reverted transaction
//! undoes every nested effect but still consumes the sender's nonce and
//! leaves a receipt behind.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use gauntlet_harness::actors::{DEPLOYER, SIGNER_1};
use gauntlet_harness::config::HarnessConfig;
use gauntlet_harness::contract::ScenarioError;
use gauntlet_harness::runner::RunError;
use gauntlet_harness::scenarios::naive_receiver::NaiveDrainer;
use gauntlet_harness::scenarios::ScenarioId;
use gauntlet_ledger::primitives::{create_address, ether};
use gauntlet_ledger::revert::Revert;
use gauntlet_ledger::vm::{Ledger, LedgerConfig, TxStatus};
use gauntlet_targets::dvt::DamnValuableToken;
use gauntlet_targets::erc20;
use gauntlet_targets::naive_receiver::NaiveReceiverLenderPool;
use gauntlet_targets::truster::{self, TrusterLenderPool};

struct TrusterWorld {
    vm: Ledger,
    token: Address,
    pool: Address,
}

fn truster_world() -> TrusterWorld {
    let mut vm = Ledger::new(LedgerConfig::default());
    vm.set_balance(DEPLOYER, ether(10_000));
    vm.set_balance(SIGNER_1, ether(10_000));
    let token = vm
        .deploy(DEPLOYER, Arc::new(DamnValuableToken), U256::ZERO)
        .unwrap();
    let pool = vm
        .deploy(DEPLOYER, Arc::new(TrusterLenderPool { token }), U256::ZERO)
        .unwrap();
    vm.send(
        DEPLOYER,
        token,
        U256::ZERO,
        &erc20::calls::transfer(pool, ether(1_000)),
    )
    .unwrap();
    TrusterWorld { vm, token, pool }
}

// ---------------------------------------------------------------------------
// Nested effects roll back
// ---------------------------------------------------------------------------

#[test]
fn unpaid_loan_rolls_back_the_callback_approval() {
    let TrusterWorld {
        mut vm,
        token,
        pool,
    } = truster_world();
    let nonce = vm.transaction_count(SIGNER_1);

    // Lend 1 DVT and have the pool approve the player; the loan is never
    // repaid, so the whole transaction reverts.
    let approve = erc20::calls::approve(SIGNER_1, U256::MAX);
    let loan = truster::calls::flash_loan(ether(1), SIGNER_1, token, &approve);
    let err = vm.send(SIGNER_1, pool, U256::ZERO, &loan).unwrap_err();
    assert_eq!(err.error_name(), Some("RepayFailed"));

    assert_eq!(erc20::allowance(&vm, token, pool, SIGNER_1).unwrap(), U256::ZERO);
    assert_eq!(erc20::balance_of(&vm, token, SIGNER_1).unwrap(), U256::ZERO);
    assert_eq!(erc20::balance_of(&vm, token, pool).unwrap(), ether(1_000));
    assert_eq!(vm.transaction_count(SIGNER_1), nonce + 1);

    let receipt = vm.receipts().last().unwrap();
    assert_eq!(receipt.from, SIGNER_1);
    assert_eq!(receipt.status, TxStatus::Reverted(err));
    assert!(receipt.output.is_empty());
}

#[test]
fn reentrancy_lock_is_released_by_a_revert() {
    let TrusterWorld {
        mut vm,
        token,
        pool,
    } = truster_world();
    let loan = truster::calls::flash_loan(ether(1), SIGNER_1, token, &[]);
    assert!(vm.send(SIGNER_1, pool, U256::ZERO, &loan).is_err());

    // A repaid (zero-amount) loan still goes through afterwards.
    let free = truster::calls::flash_loan(U256::ZERO, SIGNER_1, token, &erc20::calls::total_supply());
    let receipt = vm.send(SIGNER_1, pool, U256::ZERO, &free).unwrap();
    assert!(receipt.is_success());
}

// ---------------------------------------------------------------------------
// Nonces and receipts
// ---------------------------------------------------------------------------

#[test]
fn reverted_deployment_consumes_the_nonce() {
    let mut vm = Ledger::new(LedgerConfig::default());
    vm.set_balance(DEPLOYER, ether(10_000));
    let pool = vm
        .deploy(DEPLOYER, Arc::new(NaiveReceiverLenderPool), U256::ZERO)
        .unwrap();
    vm.send(DEPLOYER, pool, ether(100), &[]).unwrap();

    // A receiver without code makes the first loan revert.
    let broken = NaiveDrainer {
        pool,
        receiver: DEPLOYER,
    };
    vm.set_balance(SIGNER_1, ether(1));
    assert!(vm.deploy(SIGNER_1, Arc::new(broken), U256::ZERO).is_err());
    assert_eq!(vm.transaction_count(SIGNER_1), 1);
    assert_eq!(vm.code_name(create_address(SIGNER_1, 0)), None);
    assert_eq!(vm.receipts().last().unwrap().created, None);

    let token = vm
        .deploy(SIGNER_1, Arc::new(DamnValuableToken), U256::ZERO)
        .unwrap();
    assert_eq!(token, create_address(SIGNER_1, 1));
    assert_eq!(vm.receipts().last().unwrap().created, Some(token));
}

#[test]
fn views_leave_no_trace() {
    let TrusterWorld { vm, pool, .. } = truster_world();
    let digest = vm.state_digest().unwrap();
    let receipts = vm.receipts().len();

    let out = vm.view(pool, &truster::calls::token()).unwrap();
    assert_eq!(out.len(), 32);
    assert!(matches!(
        vm.view(pool, &[0xde, 0xad, 0xbe, 0xef]),
        Err(Revert::UnknownSelector { .. })
    ));

    assert_eq!(vm.state_digest().unwrap(), digest);
    assert_eq!(vm.receipts().len(), receipts);
}

// ---------------------------------------------------------------------------
// Call depth through the harness
// ---------------------------------------------------------------------------

#[test]
fn shallow_call_depth_breaks_the_nested_attack() {
    let config = HarnessConfig {
        max_call_depth: Some(2),
        ..HarnessConfig::default()
    };
    let err = ScenarioId::NaiveReceiver.run(&config).unwrap_err();
    assert!(
        matches!(
            err,
            RunError::Execute(ScenarioError::Attack {
                step: "deploy drainer",
                ..
            })
        ),
        "expected the drainer deployment to revert, got {err}"
    );
}
