//! End-to-end scenario tests: every exploit runs through the harness and
//! its report records the expected balance movement.

use alloy_primitives::{address, Address, U256};
use gauntlet_harness::actors::{DEPLOYER, SIGNER_1, SIGNER_2};
use gauntlet_harness::config::HarnessConfig;
use gauntlet_harness::report::{ScenarioReport, Snapshot};
use gauntlet_harness::runner::{run, run_with_ledger, RunError};
use gauntlet_harness::scenarios::abi_smuggling::{smuggled_calldata, AbiSmuggling};
use gauntlet_harness::scenarios::naive_receiver::NaiveReceiver;
use gauntlet_harness::scenarios::ScenarioId;
use gauntlet_ledger::primitives::{create_address, ether};
use gauntlet_targets::erc20;

/// First two deployments of the dev-chain deployer.
const TOKEN: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
const VAULT: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");

/// `execute(vault, …)` smuggling `sweepFunds(recovery, token)` past a
/// `withdraw` permission check, as sent on a fresh dev chain.
const SMUGGLED_CALLDATA: &str = concat!(
    "1cff79cd",
    "000000000000000000000000e7f1725e7734ce288f8367e1bb143e90bb3f0512",
    "0000000000000000000000000000000000000000000000000000000000000080",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "d9caed1200000000000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000044",
    "85fb709d0000000000000000000000003c44cdddb6a900fa2b585dd299e03d12",
    "fa4293bc0000000000000000000000005fbdb2315678afecb367f032d93f642f",
    "64180aa300000000000000000000000000000000000000000000000000000000",
);

fn report(id: ScenarioId) -> ScenarioReport {
    id.run(&HarnessConfig::default())
        .unwrap_or_else(|e| panic!("{id} failed: {e}"))
}

fn balances(report: &ScenarioReport, label: &str) -> (U256, U256) {
    let read = |snapshot| {
        report
            .balance(snapshot, label)
            .unwrap_or_else(|| panic!("{}: no balance {label}", report.scenario_id))
    };
    (read(Snapshot::Before), read(Snapshot::After))
}

fn attack_receipts(report: &ScenarioReport) -> Vec<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_slice(&report.bytes).unwrap();
    value["receipts"].as_array().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Per-scenario outcomes
// ---------------------------------------------------------------------------

#[test]
fn abi_smuggling_sweeps_the_vault_to_recovery() {
    let report = report(ScenarioId::AbiSmuggling);
    assert_eq!(report.player_transactions, 1);
    assert_eq!(balances(&report, "vault_dvt"), (ether(1_000_000), U256::ZERO));
    assert_eq!(balances(&report, "player_dvt"), (U256::ZERO, U256::ZERO));
    assert_eq!(balances(&report, "recovery_dvt"), (U256::ZERO, ether(1_000_000)));
}

#[test]
fn abi_smuggling_reproduces_dev_chain_calldata() {
    let calldata = smuggled_calldata(VAULT, SIGNER_2, TOKEN);
    assert_eq!(calldata.len(), 260);
    assert_eq!(hex::encode(&calldata), SMUGGLED_CALLDATA);
}

#[test]
fn abi_smuggling_deploys_at_dev_chain_addresses() {
    assert_eq!(create_address(DEPLOYER, 0), TOKEN);
    assert_eq!(create_address(DEPLOYER, 1), VAULT);

    let run = run_with_ledger(&AbiSmuggling, &HarnessConfig::default()).unwrap();
    assert_eq!(run.ledger.code_name(TOKEN), Some("DamnValuableToken"));
    assert_eq!(run.ledger.code_name(VAULT), Some("SelfAuthorizedVault"));
    assert_eq!(
        erc20::balance_of(&run.ledger, TOKEN, SIGNER_2).unwrap(),
        ether(1_000_000)
    );
}

#[test]
fn naive_receiver_moves_the_receiver_into_the_pool() {
    let report = report(ScenarioId::NaiveReceiver);
    assert_eq!(report.player_transactions, 1);
    assert_eq!(balances(&report, "receiver_eth"), (ether(10), U256::ZERO));
    assert_eq!(balances(&report, "pool_eth"), (ether(1_000), ether(1_010)));
}

#[test]
fn truster_hands_the_pool_to_the_player() {
    let report = report(ScenarioId::Truster);
    assert_eq!(report.player_transactions, 1);
    assert_eq!(balances(&report, "pool_dvt"), (ether(1_000_000), U256::ZERO));
    assert_eq!(balances(&report, "player_dvt"), (U256::ZERO, ether(1_000_000)));
}

#[test]
fn side_entrance_withdraws_the_pool() {
    let report = report(ScenarioId::SideEntrance);
    assert_eq!(report.player_transactions, 2);
    assert_eq!(balances(&report, "pool_eth"), (ether(1_000), U256::ZERO));
    assert_eq!(balances(&report, "player_eth"), (ether(1), ether(1_001)));
}

#[test]
fn puppet_borrows_the_whole_pool() {
    let report = report(ScenarioId::Puppet);
    let (pool_before, pool_after) = balances(&report, "pool_dvt");
    assert_eq!((pool_before, pool_after), (ether(100_000), U256::ZERO));
    assert_eq!(balances(&report, "player_dvt"), (ether(1_000), ether(100_000)));
    let (eth_before, eth_after) = balances(&report, "player_eth");
    assert_eq!(eth_before, ether(25));
    assert!(eth_after < eth_before + ether(10));
    let (exchange_before, exchange_after) = balances(&report, "exchange_eth");
    assert_eq!(exchange_before, ether(10));
    assert!(exchange_after < ether(1));
}

#[test]
fn puppet_v2_borrows_the_whole_pool() {
    let report = report(ScenarioId::PuppetV2);
    assert_eq!(balances(&report, "pool_dvt"), (ether(1_000_000), U256::ZERO));
    assert_eq!(balances(&report, "player_dvt"), (ether(10_000), ether(1_000_000)));
    assert_eq!(balances(&report, "player_weth").1, U256::ZERO);
    let (pair_before, pair_after) = balances(&report, "pair_weth");
    assert_eq!(pair_before, ether(10));
    assert!(pair_after < ether(1));
}

// ---------------------------------------------------------------------------
// Report contents
// ---------------------------------------------------------------------------

#[test]
fn reports_hold_only_successful_player_receipts() {
    for id in ScenarioId::ALL {
        let report = report(id);
        let receipts = attack_receipts(&report);
        assert_eq!(
            receipts.len() as u64,
            report.player_transactions,
            "{id}: receipt count"
        );
        let value: serde_json::Value = serde_json::from_slice(&report.bytes).unwrap();
        let player = value["player"].as_str().unwrap();
        for receipt in &receipts {
            assert_eq!(receipt["status"], "success", "{id}: {receipt}");
            assert_eq!(receipt["from"].as_str().unwrap(), player, "{id}: sender");
        }
    }
}

#[test]
fn naive_receiver_is_played_by_the_second_signer() {
    let player_of = |id| {
        let value: serde_json::Value = serde_json::from_slice(&report(id).bytes).unwrap();
        value["player"].as_str().unwrap().to_string()
    };
    assert_eq!(
        player_of(ScenarioId::NaiveReceiver),
        format!("0x{}", hex::encode(SIGNER_2))
    );
    assert_eq!(
        player_of(ScenarioId::Truster),
        format!("0x{}", hex::encode(SIGNER_1))
    );
}

// ---------------------------------------------------------------------------
// Transaction budget
// ---------------------------------------------------------------------------

#[test]
fn zero_budget_rejects_every_attack() {
    let config = HarnessConfig {
        player_transaction_budget: Some(0),
        ..HarnessConfig::default()
    };
    for id in ScenarioId::ALL {
        assert!(
            matches!(
                id.run(&config),
                Err(RunError::TransactionBudgetExceeded { budget: 0, .. })
            ),
            "{id} ran under a zero budget"
        );
    }
}

#[test]
fn single_transaction_scenarios_fit_their_budget() {
    let config = HarnessConfig::default();
    assert!(run(&NaiveReceiver, &config).is_ok());
    assert!(run(&AbiSmuggling, &config).is_ok());
    let tight = HarnessConfig {
        player_transaction_budget: Some(1),
        ..HarnessConfig::default()
    };
    assert!(matches!(
        ScenarioId::SideEntrance.run(&tight),
        Err(RunError::TransactionBudgetExceeded {
            budget: 1,
            actual: 2
        })
    ));
}

#[test]
fn broke_signers_fail_during_setup() {
    let config = HarnessConfig {
        genesis_balance: Some(U256::ZERO),
        ..HarnessConfig::default()
    };
    assert!(matches!(
        ScenarioId::NaiveReceiver.run(&config),
        Err(RunError::Setup(_))
    ));
}

// ---------------------------------------------------------------------------
// Chain parameters
// ---------------------------------------------------------------------------

#[test]
fn slow_blocks_do_not_expire_swap_deadlines() {
    let config = HarnessConfig {
        block_interval_secs: Some(600),
        ..HarnessConfig::default()
    };
    for id in ScenarioId::ALL {
        if let Err(e) = id.run(&config) {
            panic!("{id} failed with 600s blocks: {e}");
        }
    }
}

#[test]
fn oracle_scenarios_run_from_a_zero_clock() {
    let config = HarnessConfig {
        genesis_timestamp: Some(0),
        block_interval_secs: Some(0),
        ..HarnessConfig::default()
    };
    for id in [ScenarioId::Puppet, ScenarioId::PuppetV2] {
        if let Err(e) = id.run(&config) {
            panic!("{id} failed on a frozen zero clock: {e}");
        }
    }
}
