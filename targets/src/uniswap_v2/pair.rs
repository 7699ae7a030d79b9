//! Constant-product pair holding two ERC-20 reserves.
//!
//! Liquidity is minted against tokens already transferred to the pair, and
//! swaps pay out first and check the fee-adjusted invariant afterwards:
//!
//! ```text
//! (b0·1000 − in0·3) · (b1·1000 − in1·3) ≥ r0 · r1 · 1000²
//! ```

use alloy_primitives::{Address, B256, U256};
use gauntlet_ledger::abi::{encode_address, encode_uint, split_call, AbiEncoder, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::math;
use gauntlet_ledger::revert::{require, CallResult, Revert};
use gauntlet_ledger::state::slot;
use gauntlet_ledger::vm::Ledger;
use tracing::debug;

use crate::erc20::{self, Metadata};

/// `token0()`
pub const TOKEN0: Selector = Selector::new([0x0d, 0xfe, 0x16, 0x81]);
/// `token1()`
pub const TOKEN1: Selector = Selector::new([0xd2, 0x12, 0x20, 0xa7]);
/// `factory()`
pub const FACTORY: Selector = Selector::new([0xc4, 0x5a, 0x01, 0x55]);
/// `getReserves()`
pub const GET_RESERVES: Selector = Selector::new([0x09, 0x02, 0xf1, 0xac]);
/// `MINIMUM_LIQUIDITY()`
pub const MINIMUM_LIQUIDITY: Selector = Selector::new([0xba, 0x9a, 0x7a, 0x56]);
/// `initialize(address,address)`
pub const INITIALIZE: Selector = Selector::new([0x48, 0x5c, 0xc9, 0x55]);
/// `mint(address)`
pub const MINT: Selector = Selector::new([0x6a, 0x62, 0x78, 0x42]);
/// `swap(uint256,uint256,address,bytes)`
pub const SWAP: Selector = Selector::new([0x02, 0x2c, 0x0d, 0x9f]);
/// `sync()`
pub const SYNC: Selector = Selector::new([0xff, 0xf6, 0xca, 0xe9]);
/// `uniswapV2Call(address,uint256,uint256,bytes)`, the flash-swap callback.
pub const UNISWAP_V2_CALL: Selector = Selector::new([0x10, 0xd1, 0xe8, 0x5c]);

/// Liquidity locked forever at the zero address by the first mint.
pub const MINIMUM_LIQUIDITY_AMOUNT: u64 = 1_000;

const LP_METADATA: Metadata = Metadata {
    name: "Uniswap V2",
    symbol: "UNI-V2",
    decimals: 18,
};

const FACTORY_SLOT: u64 = 6;
const TOKEN0_SLOT: u64 = 7;
const TOKEN1_SLOT: u64 = 8;
const RESERVE0_SLOT: u64 = 9;
const RESERVE1_SLOT: u64 = 10;
const TIMESTAMP_LAST_SLOT: u64 = 11;
const LOCK_SLOT: u64 = 12;

fn max_reserve() -> U256 {
    (U256::from(1u8) << 112) - U256::from(1u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reserves {
    reserve0: U256,
    reserve1: U256,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UniswapV2Pair;

impl UniswapV2Pair {
    fn reserves(vm: &Ledger, this: Address) -> Reserves {
        Reserves {
            reserve0: vm.sload(this, slot(RESERVE0_SLOT)),
            reserve1: vm.sload(this, slot(RESERVE1_SLOT)),
        }
    }

    fn tokens(vm: &Ledger, this: Address) -> (Address, Address) {
        (
            vm.sload_address(this, slot(TOKEN0_SLOT)),
            vm.sload_address(this, slot(TOKEN1_SLOT)),
        )
    }

    fn balances(vm: &Ledger, this: Address) -> CallResult<(U256, U256)> {
        let (token0, token1) = Self::tokens(vm, this);
        Ok((
            erc20::balance_of(vm, token0, this)?,
            erc20::balance_of(vm, token1, this)?,
        ))
    }

    fn update(vm: &mut Ledger, this: Address, balance0: U256, balance1: U256) -> CallResult<()> {
        require(
            balance0 <= max_reserve() && balance1 <= max_reserve(),
            "UniswapV2: OVERFLOW",
        )?;
        vm.sstore(this, slot(RESERVE0_SLOT), balance0);
        vm.sstore(this, slot(RESERVE1_SLOT), balance1);
        let timestamp = U256::from(vm.timestamp() % (1u64 << 32));
        vm.sstore(this, slot(TIMESTAMP_LAST_SLOT), timestamp);
        Ok(())
    }

    fn lock<T>(
        vm: &mut Ledger,
        this: Address,
        body: impl FnOnce(&mut Ledger) -> CallResult<T>,
    ) -> CallResult<T> {
        let key: B256 = slot(LOCK_SLOT);
        require(vm.sload(this, key).is_zero(), "UniswapV2: LOCKED")?;
        vm.sstore(this, key, U256::from(1u8));
        let out = body(vm)?;
        vm.sstore(this, key, U256::ZERO);
        Ok(out)
    }

    fn mint(vm: &mut Ledger, this: Address, to: Address) -> CallResult<U256> {
        let Reserves { reserve0, reserve1 } = Self::reserves(vm, this);
        let (balance0, balance1) = Self::balances(vm, this)?;
        let amount0 = math::sub(balance0, reserve0)?;
        let amount1 = math::sub(balance1, reserve1)?;

        let total_supply = erc20::storage::total_supply(vm, this);
        let liquidity = if total_supply.is_zero() {
            let minimum = U256::from(MINIMUM_LIQUIDITY_AMOUNT);
            let liquidity = math::sub(math::sqrt(math::mul(amount0, amount1)?), minimum)?;
            erc20::storage::mint(vm, this, Address::ZERO, minimum)?;
            liquidity
        } else {
            let by0 = math::div(math::mul(amount0, total_supply)?, reserve0)?;
            let by1 = math::div(math::mul(amount1, total_supply)?, reserve1)?;
            by0.min(by1)
        };
        require(!liquidity.is_zero(), "UniswapV2: INSUFFICIENT_LIQUIDITY_MINTED")?;
        erc20::storage::mint(vm, this, to, liquidity)?;
        Self::update(vm, this, balance0, balance1)?;
        debug!(pair = %this, %to, %liquidity, "liquidity minted");
        Ok(liquidity)
    }

    fn swap(
        vm: &mut Ledger,
        frame: &Frame,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        data: &[u8],
    ) -> CallResult<()> {
        let this = frame.address;
        require(
            !amount0_out.is_zero() || !amount1_out.is_zero(),
            "UniswapV2: INSUFFICIENT_OUTPUT_AMOUNT",
        )?;
        let Reserves { reserve0, reserve1 } = Self::reserves(vm, this);
        require(
            amount0_out < reserve0 && amount1_out < reserve1,
            "UniswapV2: INSUFFICIENT_LIQUIDITY",
        )?;

        let (token0, token1) = Self::tokens(vm, this);
        require(to != token0 && to != token1, "UniswapV2: INVALID_TO")?;
        if !amount0_out.is_zero() {
            require(
                erc20::try_transfer(vm, this, token0, to, amount0_out),
                "UniswapV2: TRANSFER_FAILED",
            )?;
        }
        if !amount1_out.is_zero() {
            require(
                erc20::try_transfer(vm, this, token1, to, amount1_out),
                "UniswapV2: TRANSFER_FAILED",
            )?;
        }
        if !data.is_empty() {
            let callback = calls::uniswap_v2_call(frame.caller, amount0_out, amount1_out, data);
            vm.call(this, to, U256::ZERO, &callback)?;
        }
        let (balance0, balance1) = Self::balances(vm, this)?;

        // Both outputs are below their reserves, checked above.
        let amount0_in = balance0.saturating_sub(reserve0 - amount0_out);
        let amount1_in = balance1.saturating_sub(reserve1 - amount1_out);
        require(
            !amount0_in.is_zero() || !amount1_in.is_zero(),
            "UniswapV2: INSUFFICIENT_INPUT_AMOUNT",
        )?;
        let thousand = U256::from(1000u16);
        let three = U256::from(3u8);
        let adjusted0 = math::sub(math::mul(balance0, thousand)?, math::mul(amount0_in, three)?)?;
        let adjusted1 = math::sub(math::mul(balance1, thousand)?, math::mul(amount1_in, three)?)?;
        let invariant = math::mul(math::mul(reserve0, reserve1)?, thousand * thousand)?;
        require(math::mul(adjusted0, adjusted1)? >= invariant, "UniswapV2: K")?;

        Self::update(vm, this, balance0, balance1)?;
        debug!(pair = %this, %amount0_in, %amount1_in, %amount0_out, %amount1_out, "swap");
        Ok(())
    }

    fn sync(vm: &mut Ledger, this: Address) -> CallResult<()> {
        let (balance0, balance1) = Self::balances(vm, this)?;
        Self::update(vm, this, balance0, balance1)
    }
}

impl Contract for UniswapV2Pair {
    fn name(&self) -> &'static str {
        "UniswapV2Pair"
    }

    fn construct(&self, vm: &mut Ledger, frame: &Frame) -> CallResult<()> {
        vm.sstore_address(frame.address, slot(FACTORY_SLOT), frame.caller);
        Ok(())
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        let Some((selector, args)) = split_call(input) else {
            return Err(Revert::NotPayable {
                contract: self.name(),
            });
        };
        frame.non_payable(self.name())?;
        let this = frame.address;
        match selector {
            TOKEN0 => Ok(encode_address(vm.sload_address(this, slot(TOKEN0_SLOT)))),
            TOKEN1 => Ok(encode_address(vm.sload_address(this, slot(TOKEN1_SLOT)))),
            FACTORY => Ok(encode_address(vm.sload_address(this, slot(FACTORY_SLOT)))),
            MINIMUM_LIQUIDITY => Ok(encode_uint(U256::from(MINIMUM_LIQUIDITY_AMOUNT))),
            GET_RESERVES => {
                let Reserves { reserve0, reserve1 } = Self::reserves(vm, this);
                Ok(AbiEncoder::new()
                    .uint(reserve0)
                    .uint(reserve1)
                    .uint(vm.sload(this, slot(TIMESTAMP_LAST_SLOT)))
                    .finish())
            }
            INITIALIZE => {
                let factory = vm.sload_address(this, slot(FACTORY_SLOT));
                require(frame.caller == factory, "UniswapV2: FORBIDDEN")?;
                vm.sstore_address(this, slot(TOKEN0_SLOT), args.address(0)?);
                vm.sstore_address(this, slot(TOKEN1_SLOT), args.address(1)?);
                Ok(Vec::new())
            }
            MINT => {
                let to = args.address(0)?;
                let liquidity = Self::lock(vm, this, |vm| Self::mint(vm, this, to))?;
                Ok(encode_uint(liquidity))
            }
            SWAP => {
                let (amount0_out, amount1_out, to) = (args.uint(0)?, args.uint(1)?, args.address(2)?);
                let data = args.bytes(3)?;
                Self::lock(vm, this, |vm| {
                    Self::swap(vm, frame, amount0_out, amount1_out, to, data)
                })?;
                Ok(Vec::new())
            }
            SYNC => {
                Self::lock(vm, this, |vm| Self::sync(vm, this))?;
                Ok(Vec::new())
            }
            _ => erc20::dispatch(vm, frame, &LP_METADATA, selector, &args)?.ok_or(
                Revert::UnknownSelector {
                    contract: self.name(),
                    selector,
                },
            ),
        }
    }
}

pub mod calls {
    use alloy_primitives::{Address, U256};
    use gauntlet_ledger::abi::AbiEncoder;

    #[must_use]
    pub fn initialize(token0: Address, token1: Address) -> Vec<u8> {
        AbiEncoder::call(super::INITIALIZE)
            .address(token0)
            .address(token1)
            .finish()
    }

    #[must_use]
    pub fn mint(to: Address) -> Vec<u8> {
        AbiEncoder::call(super::MINT).address(to).finish()
    }

    #[must_use]
    pub fn swap(amount0_out: U256, amount1_out: U256, to: Address, data: &[u8]) -> Vec<u8> {
        AbiEncoder::call(super::SWAP)
            .uint(amount0_out)
            .uint(amount1_out)
            .address(to)
            .bytes(data)
            .finish()
    }

    #[must_use]
    pub fn sync() -> Vec<u8> {
        AbiEncoder::call(super::SYNC).finish()
    }

    #[must_use]
    pub fn uniswap_v2_call(sender: Address, amount0: U256, amount1: U256, data: &[u8]) -> Vec<u8> {
        AbiEncoder::call(super::UNISWAP_V2_CALL)
            .address(sender)
            .uint(amount0)
            .uint(amount1)
            .bytes(data)
            .finish()
    }
}
