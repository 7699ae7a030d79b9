//! User-facing router: adds ETH liquidity through WETH and routes exact-input
//! swaps across a path of pairs.

use alloy_primitives::{Address, U256};
use gauntlet_ledger::abi::{encode_address, encode_uint, split_call, AbiDecoder, AbiEncoder, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::revert::{require, CallResult, PanicCode, Revert};
use gauntlet_ledger::vm::Ledger;

use super::{factory, library, pair};
use crate::{erc20, weth};

/// `WETH()`
pub const WETH: Selector = Selector::new([0xad, 0x5c, 0x46, 0x48]);
/// `factory()`
pub const FACTORY: Selector = Selector::new([0xc4, 0x5a, 0x01, 0x55]);
/// `addLiquidityETH(address,uint256,uint256,uint256,address,uint256)`
pub const ADD_LIQUIDITY_ETH: Selector = Selector::new([0xf3, 0x05, 0xd7, 0x19]);
/// `swapExactTokensForTokens(uint256,uint256,address[],address,uint256)`
pub const SWAP_EXACT_TOKENS_FOR_TOKENS: Selector = Selector::new([0x38, 0xed, 0x17, 0x39]);
/// `getAmountsOut(uint256,address[])`
pub const GET_AMOUNTS_OUT: Selector = Selector::new([0xd0, 0x6c, 0xa6, 0x1f]);
/// `quote(uint256,uint256,uint256)`
pub const QUOTE: Selector = Selector::new([0xad, 0x61, 0x5d, 0xec]);
/// `getAmountOut(uint256,uint256,uint256)`
pub const GET_AMOUNT_OUT: Selector = Selector::new([0x05, 0x4d, 0x50, 0xd4]);

/// Router bound to one factory and one WETH contract.
#[derive(Debug, Clone, Copy)]
pub struct UniswapV2Router02 {
    pub factory: Address,
    pub weth: Address,
}

/// Amounts actually deposited by `addLiquidityETH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityAdded {
    pub amount_token: U256,
    pub amount_eth: U256,
    pub liquidity: U256,
}

fn ensure_deadline(vm: &Ledger, deadline: U256) -> CallResult<()> {
    require(deadline >= U256::from(vm.timestamp()), "UniswapV2Router: EXPIRED")
}

impl UniswapV2Router02 {
    /// Amounts to deposit given the desired maxima and the pair's reserves,
    /// creating the pair if it does not exist yet.
    #[allow(clippy::too_many_arguments)]
    fn add_liquidity_amounts(
        &self,
        vm: &mut Ledger,
        this: Address,
        token_a: Address,
        token_b: Address,
        amount_a_desired: U256,
        amount_b_desired: U256,
        amount_a_min: U256,
        amount_b_min: U256,
    ) -> CallResult<(U256, U256)> {
        if library::pair_for(vm, self.factory, token_a, token_b)? == Address::ZERO {
            vm.call(this, self.factory, U256::ZERO, &factory::calls::create_pair(token_a, token_b))?;
        }
        let (reserve_a, reserve_b) = library::get_reserves(vm, self.factory, token_a, token_b)?;
        if reserve_a.is_zero() && reserve_b.is_zero() {
            return Ok((amount_a_desired, amount_b_desired));
        }
        let amount_b_optimal = library::quote(amount_a_desired, reserve_a, reserve_b)?;
        if amount_b_optimal <= amount_b_desired {
            require(amount_b_optimal >= amount_b_min, "UniswapV2Router: INSUFFICIENT_B_AMOUNT")?;
            return Ok((amount_a_desired, amount_b_optimal));
        }
        let amount_a_optimal = library::quote(amount_b_desired, reserve_b, reserve_a)?;
        if amount_a_optimal > amount_a_desired {
            return Err(Revert::Panic(PanicCode::Assertion));
        }
        require(amount_a_optimal >= amount_a_min, "UniswapV2Router: INSUFFICIENT_A_AMOUNT")?;
        Ok((amount_a_optimal, amount_b_desired))
    }

    fn add_liquidity_eth(&self, vm: &mut Ledger, frame: &Frame, args: &AbiDecoder<'_>) -> CallResult<LiquidityAdded> {
        let this = frame.address;
        let (token, amount_token_desired, amount_token_min) = (args.address(0)?, args.uint(1)?, args.uint(2)?);
        let (amount_eth_min, to, deadline) = (args.uint(3)?, args.address(4)?, args.uint(5)?);
        ensure_deadline(vm, deadline)?;

        let (amount_token, amount_eth) = self.add_liquidity_amounts(
            vm,
            this,
            token,
            self.weth,
            amount_token_desired,
            frame.value,
            amount_token_min,
            amount_eth_min,
        )?;
        let pair_address = library::pair_for(vm, self.factory, token, self.weth)?;
        require(
            erc20::try_transfer_from(vm, this, token, frame.caller, pair_address, amount_token),
            "TransferHelper: TRANSFER_FROM_FAILED",
        )?;
        vm.call(this, self.weth, amount_eth, &weth::calls::deposit())?;
        if !erc20::transfer(vm, this, self.weth, pair_address, amount_eth)? {
            return Err(Revert::Panic(PanicCode::Assertion));
        }
        let minted = vm.call(this, pair_address, U256::ZERO, &pair::calls::mint(to))?;
        let liquidity = AbiDecoder::new(&minted).uint(0)?;

        if frame.value > amount_eth {
            vm.call(this, frame.caller, frame.value - amount_eth, &[])
                .map_err(|_| Revert::message("TransferHelper: ETH_TRANSFER_FAILED"))?;
        }
        Ok(LiquidityAdded {
            amount_token,
            amount_eth,
            liquidity,
        })
    }

    fn swap_exact_tokens_for_tokens(
        &self,
        vm: &mut Ledger,
        frame: &Frame,
        args: &AbiDecoder<'_>,
    ) -> CallResult<Vec<U256>> {
        let this = frame.address;
        let (amount_in, amount_out_min, path) = (args.uint(0)?, args.uint(1)?, args.address_array(2)?);
        let (to, deadline) = (args.address(3)?, args.uint(4)?);
        ensure_deadline(vm, deadline)?;

        let amounts = library::get_amounts_out(vm, self.factory, amount_in, &path)?;
        require(
            amounts[amounts.len() - 1] >= amount_out_min,
            "UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT",
        )?;
        let first_pair = library::pair_for(vm, self.factory, path[0], path[1])?;
        require(
            erc20::try_transfer_from(vm, this, path[0], frame.caller, first_pair, amounts[0]),
            "TransferHelper: TRANSFER_FROM_FAILED",
        )?;
        self.swap_along(vm, this, &amounts, &path, to)?;
        Ok(amounts)
    }

    /// Execute each hop; every pair but the last pays straight into the next.
    fn swap_along(
        &self,
        vm: &mut Ledger,
        this: Address,
        amounts: &[U256],
        path: &[Address],
        to: Address,
    ) -> CallResult<()> {
        for (i, hop) in path.windows(2).enumerate() {
            let (input, output) = (hop[0], hop[1]);
            let (token0, _) = library::sort_tokens(input, output)?;
            let amount_out = amounts[i + 1];
            let (amount0_out, amount1_out) = if input == token0 {
                (U256::ZERO, amount_out)
            } else {
                (amount_out, U256::ZERO)
            };
            let recipient = match path.get(i + 2) {
                Some(next) => library::pair_for(vm, self.factory, output, *next)?,
                None => to,
            };
            let pair_address = library::pair_for(vm, self.factory, input, output)?;
            let swap = pair::calls::swap(amount0_out, amount1_out, recipient, &[]);
            vm.call(this, pair_address, U256::ZERO, &swap)?;
        }
        Ok(())
    }
}

impl Contract for UniswapV2Router02 {
    fn name(&self) -> &'static str {
        "UniswapV2Router02"
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        // receive(): only WETH unwrapping may send ETH here.
        let Some((selector, args)) = split_call(input) else {
            if frame.caller != self.weth {
                return Err(Revert::Panic(PanicCode::Assertion));
            }
            return Ok(Vec::new());
        };
        if selector == ADD_LIQUIDITY_ETH {
            let added = self.add_liquidity_eth(vm, frame, &args)?;
            return Ok(AbiEncoder::new()
                .uint(added.amount_token)
                .uint(added.amount_eth)
                .uint(added.liquidity)
                .finish());
        }
        frame.non_payable(self.name())?;
        match selector {
            WETH => Ok(encode_address(self.weth)),
            FACTORY => Ok(encode_address(self.factory)),
            SWAP_EXACT_TOKENS_FOR_TOKENS => {
                let amounts = self.swap_exact_tokens_for_tokens(vm, frame, &args)?;
                Ok(AbiEncoder::new().uint_array(&amounts).finish())
            }
            GET_AMOUNTS_OUT => {
                let amounts =
                    library::get_amounts_out(vm, self.factory, args.uint(0)?, &args.address_array(1)?)?;
                Ok(AbiEncoder::new().uint_array(&amounts).finish())
            }
            QUOTE => Ok(encode_uint(library::quote(args.uint(0)?, args.uint(1)?, args.uint(2)?)?)),
            GET_AMOUNT_OUT => Ok(encode_uint(library::get_amount_out(
                args.uint(0)?,
                args.uint(1)?,
                args.uint(2)?,
            )?)),
            _ => Err(Revert::UnknownSelector {
                contract: self.name(),
                selector,
            }),
        }
    }
}

pub mod calls {
    use alloy_primitives::{Address, U256};
    use gauntlet_ledger::abi::AbiEncoder;

    #[must_use]
    pub fn add_liquidity_eth(
        token: Address,
        amount_token_desired: U256,
        amount_token_min: U256,
        amount_eth_min: U256,
        to: Address,
        deadline: U256,
    ) -> Vec<u8> {
        AbiEncoder::call(super::ADD_LIQUIDITY_ETH)
            .address(token)
            .uint(amount_token_desired)
            .uint(amount_token_min)
            .uint(amount_eth_min)
            .address(to)
            .uint(deadline)
            .finish()
    }

    #[must_use]
    pub fn swap_exact_tokens_for_tokens(
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: U256,
    ) -> Vec<u8> {
        AbiEncoder::call(super::SWAP_EXACT_TOKENS_FOR_TOKENS)
            .uint(amount_in)
            .uint(amount_out_min)
            .address_array(path)
            .address(to)
            .uint(deadline)
            .finish()
    }

    #[must_use]
    pub fn get_amounts_out(amount_in: U256, path: &[Address]) -> Vec<u8> {
        AbiEncoder::call(super::GET_AMOUNTS_OUT)
            .uint(amount_in)
            .address_array(path)
            .finish()
    }
}

/// `router.getAmountsOut(amount_in, path)` as a read-only call.
///
/// # Errors
///
/// Returns the router's revert (invalid path, empty reserves).
pub fn amounts_out(vm: &Ledger, router: Address, amount_in: U256, path: &[Address]) -> CallResult<Vec<U256>> {
    let out = vm.view(router, &calls::get_amounts_out(amount_in, path))?;
    AbiDecoder::new(&out).uint_array(0)
}
