//! Uniswap v1: one ETH/token exchange per token, created by a factory that
//! clones a template exchange.
//!
//! Pricing is constant product with a 0.3 % fee taken from the input:
//!
//! ```text
//! out = in · 997 · R_out / (R_in · 1000 + in · 997)
//! ```
//!
//! The exchange's ETH reserve is simply its native balance and its token
//! reserve is `token.balanceOf(exchange)`, so a single large swap moves the
//! spot price the lending pool in [`crate::puppet`] reads.
//!
//! Failed assertions revert without data, as a Vyper `assert` does.

use alloy_primitives::{Address, U256};
use gauntlet_ledger::abi::{decode_address, decode_uint, encode_address, encode_uint, split_call, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::math;
use gauntlet_ledger::revert::{check, CallResult, Revert};
use gauntlet_ledger::state::slot;
use gauntlet_ledger::vm::Ledger;
use tracing::debug;

use crate::erc20::{self, Metadata};

/// `initializeFactory(address)`
pub const INITIALIZE_FACTORY: Selector = Selector::new([0x53, 0x8a, 0x3f, 0x0e]);
/// `createExchange(address)`
pub const CREATE_EXCHANGE: Selector = Selector::new([0x16, 0x48, 0xf3, 0x8e]);
/// `getExchange(address)`
pub const GET_EXCHANGE: Selector = Selector::new([0x06, 0xf2, 0xbf, 0x62]);
/// `getToken(address)`
pub const GET_TOKEN: Selector = Selector::new([0x59, 0x77, 0x04, 0x38]);
/// `getTokenWithId(uint256)`
pub const GET_TOKEN_WITH_ID: Selector = Selector::new([0xaa, 0x65, 0xa6, 0xc0]);
/// `tokenCount()`
pub const TOKEN_COUNT: Selector = Selector::new([0x9f, 0x18, 0x1b, 0x5e]);
/// `exchangeTemplate()`
pub const EXCHANGE_TEMPLATE: Selector = Selector::new([0x1c, 0x2b, 0xbd, 0x18]);

/// `setup(address)`
pub const SETUP: Selector = Selector::new([0x66, 0xd3, 0x82, 0x03]);
/// `tokenAddress()`
pub const TOKEN_ADDRESS: Selector = Selector::new([0x9d, 0x76, 0xea, 0x58]);
/// `factoryAddress()`
pub const FACTORY_ADDRESS: Selector = Selector::new([0x96, 0x6d, 0xae, 0x0e]);
/// `addLiquidity(uint256,uint256,uint256)`
pub const ADD_LIQUIDITY: Selector = Selector::new([0x42, 0x2f, 0x10, 0x43]);
/// `getTokenToEthInputPrice(uint256)`
pub const GET_TOKEN_TO_ETH_INPUT_PRICE: Selector = Selector::new([0x95, 0xb6, 0x8f, 0xe7]);
/// `getEthToTokenInputPrice(uint256)`
pub const GET_ETH_TO_TOKEN_INPUT_PRICE: Selector = Selector::new([0xcd, 0x77, 0x24, 0xc3]);
/// `tokenToEthSwapInput(uint256,uint256,uint256)`
pub const TOKEN_TO_ETH_SWAP_INPUT: Selector = Selector::new([0x95, 0xe3, 0xc5, 0x0b]);
/// `ethToTokenSwapInput(uint256,uint256)`
pub const ETH_TO_TOKEN_SWAP_INPUT: Selector = Selector::new([0xf3, 0x9b, 0x5b, 0x9b]);

/// Smallest ETH amount accepted when seeding an empty exchange.
const MIN_INITIAL_ETH: u64 = 1_000_000_000;

const LP_METADATA: Metadata = Metadata {
    name: "Uniswap V1",
    symbol: "UNI-V1",
    decimals: 18,
};

/// `get_input_price` with the 0.3 % input fee.
///
/// # Errors
///
/// Reverts if either reserve is empty, or on overflow.
pub fn input_price(input_amount: U256, input_reserve: U256, output_reserve: U256) -> CallResult<U256> {
    check(!input_reserve.is_zero() && !output_reserve.is_zero())?;
    let input_with_fee = math::mul(input_amount, U256::from(997u16))?;
    let numerator = math::mul(input_with_fee, output_reserve)?;
    let denominator = math::add(math::mul(input_reserve, U256::from(1000u16))?, input_with_fee)?;
    math::div(numerator, denominator)
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

mod factory_slots {
    use alloy_primitives::{Address, B256, U256};
    use gauntlet_ledger::state::{address_key, mapping_slot, slot};

    pub const TEMPLATE: u64 = 0;
    pub const TOKEN_COUNT: u64 = 1;
    const TOKEN_TO_EXCHANGE: u64 = 2;
    const EXCHANGE_TO_TOKEN: u64 = 3;
    const ID_TO_TOKEN: u64 = 4;

    pub fn token_to_exchange(token: Address) -> B256 {
        mapping_slot(address_key(token), slot(TOKEN_TO_EXCHANGE))
    }

    pub fn exchange_to_token(exchange: Address) -> B256 {
        mapping_slot(address_key(exchange), slot(EXCHANGE_TO_TOKEN))
    }

    pub fn id_to_token(id: U256) -> B256 {
        mapping_slot(B256::from(id.to_be_bytes::<32>()), slot(ID_TO_TOKEN))
    }
}

/// Registry of exchanges, one per token.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniswapV1Factory;

impl UniswapV1Factory {
    fn create_exchange(vm: &mut Ledger, this: Address, token: Address) -> CallResult<Address> {
        check(token != Address::ZERO)?;
        let template = vm.sload_address(this, slot(factory_slots::TEMPLATE));
        check(template != Address::ZERO)?;
        check(vm.sload_address(this, factory_slots::token_to_exchange(token)) == Address::ZERO)?;
        let code = vm.state().code(template).ok_or(Revert::Bare)?;

        let exchange = vm.create(this, code, U256::ZERO)?;
        vm.call(this, exchange, U256::ZERO, &calls::setup(token))?;

        vm.sstore_address(this, factory_slots::token_to_exchange(token), exchange);
        vm.sstore_address(this, factory_slots::exchange_to_token(exchange), token);
        let token_id = vm
            .sload(this, slot(factory_slots::TOKEN_COUNT))
            .saturating_add(U256::from(1u8));
        vm.sstore(this, slot(factory_slots::TOKEN_COUNT), token_id);
        vm.sstore_address(this, factory_slots::id_to_token(token_id), token);
        debug!(%token, %exchange, "exchange created");
        Ok(exchange)
    }
}

impl Contract for UniswapV1Factory {
    fn name(&self) -> &'static str {
        "UniswapV1Factory"
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
            INITIALIZE_FACTORY => {
                let template = args.address(0)?;
                let current = vm.sload_address(this, slot(factory_slots::TEMPLATE));
                check(current == Address::ZERO && template != Address::ZERO)?;
                vm.sstore_address(this, slot(factory_slots::TEMPLATE), template);
                Ok(Vec::new())
            }
            CREATE_EXCHANGE => {
                let exchange = Self::create_exchange(vm, this, args.address(0)?)?;
                Ok(encode_address(exchange))
            }
            GET_EXCHANGE => {
                let key = factory_slots::token_to_exchange(args.address(0)?);
                Ok(encode_address(vm.sload_address(this, key)))
            }
            GET_TOKEN => {
                let key = factory_slots::exchange_to_token(args.address(0)?);
                Ok(encode_address(vm.sload_address(this, key)))
            }
            GET_TOKEN_WITH_ID => {
                let key = factory_slots::id_to_token(args.uint(0)?);
                Ok(encode_address(vm.sload_address(this, key)))
            }
            TOKEN_COUNT => Ok(encode_uint(vm.sload(this, slot(factory_slots::TOKEN_COUNT)))),
            EXCHANGE_TEMPLATE => {
                let key = slot(factory_slots::TEMPLATE);
                Ok(encode_address(vm.sload_address(this, key)))
            }
            _ => Err(Revert::UnknownSelector {
                contract: self.name(),
                selector,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

const EXCHANGE_TOKEN_SLOT: u64 = 0;
const EXCHANGE_FACTORY_SLOT: u64 = 1;

/// ETH/token exchange. Deploy once as the factory's template; the factory
/// clones it for every token.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniswapV1Exchange;

impl UniswapV1Exchange {
    fn token(vm: &Ledger, this: Address) -> Address {
        vm.sload_address(this, slot(EXCHANGE_TOKEN_SLOT))
    }

    fn add_liquidity(
        vm: &mut Ledger,
        frame: &Frame,
        min_liquidity: U256,
        max_tokens: U256,
        deadline: U256,
    ) -> CallResult<U256> {
        let (this, sender, value) = (frame.address, frame.caller, frame.value);
        check(deadline > U256::from(vm.timestamp()) && !max_tokens.is_zero() && !value.is_zero())?;
        let token = Self::token(vm, this);
        let total_liquidity = erc20::storage::total_supply(vm, this);

        if total_liquidity.is_zero() {
            let factory = vm.sload_address(this, slot(EXCHANGE_FACTORY_SLOT));
            check(factory != Address::ZERO && token != Address::ZERO)?;
            check(value >= U256::from(MIN_INITIAL_ETH))?;
            let registered = vm.call(this, factory, U256::ZERO, &calls::get_exchange(token))?;
            check(decode_address(&registered)? == this)?;
            let initial_liquidity = vm.balance(this);
            erc20::storage::mint(vm, this, sender, initial_liquidity)?;
            check(erc20::transfer_from(vm, this, token, sender, this, max_tokens)?)?;
            return Ok(initial_liquidity);
        }

        check(!min_liquidity.is_zero())?;
        let eth_reserve = math::sub(vm.balance(this), value)?;
        let token_reserve = erc20::balance_of(vm, token, this)?;
        let token_amount = math::add(
            math::div(math::mul(value, token_reserve)?, eth_reserve)?,
            U256::from(1u8),
        )?;
        let liquidity_minted = math::div(math::mul(value, total_liquidity)?, eth_reserve)?;
        check(max_tokens >= token_amount && liquidity_minted >= min_liquidity)?;
        erc20::storage::mint(vm, this, sender, liquidity_minted)?;
        check(erc20::transfer_from(vm, this, token, sender, this, token_amount)?)?;
        Ok(liquidity_minted)
    }

    fn token_to_eth_input(
        vm: &mut Ledger,
        this: Address,
        tokens_sold: U256,
        min_eth: U256,
        deadline: U256,
        buyer: Address,
    ) -> CallResult<U256> {
        check(deadline >= U256::from(vm.timestamp()) && !tokens_sold.is_zero() && !min_eth.is_zero())?;
        let token = Self::token(vm, this);
        let token_reserve = erc20::balance_of(vm, token, this)?;
        let eth_bought = input_price(tokens_sold, token_reserve, vm.balance(this))?;
        check(eth_bought >= min_eth)?;
        vm.call(this, buyer, eth_bought, &[]).map_err(|_| Revert::Bare)?;
        check(erc20::transfer_from(vm, this, token, buyer, this, tokens_sold)?)?;
        debug!(%buyer, %tokens_sold, %eth_bought, "token to eth swap");
        Ok(eth_bought)
    }

    fn eth_to_token_input(
        vm: &mut Ledger,
        this: Address,
        eth_sold: U256,
        min_tokens: U256,
        deadline: U256,
        recipient: Address,
    ) -> CallResult<U256> {
        check(deadline >= U256::from(vm.timestamp()) && !eth_sold.is_zero() && !min_tokens.is_zero())?;
        let token = Self::token(vm, this);
        let token_reserve = erc20::balance_of(vm, token, this)?;
        let eth_reserve = math::sub(vm.balance(this), eth_sold)?;
        let tokens_bought = input_price(eth_sold, eth_reserve, token_reserve)?;
        check(tokens_bought >= min_tokens)?;
        check(erc20::transfer(vm, this, token, recipient, tokens_bought)?)?;
        debug!(%recipient, %eth_sold, %tokens_bought, "eth to token swap");
        Ok(tokens_bought)
    }
}

impl Contract for UniswapV1Exchange {
    fn name(&self) -> &'static str {
        "UniswapV1Exchange"
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        let this = frame.address;
        // __default__: buy tokens with the attached ETH.
        let Some((selector, args)) = split_call(input) else {
            let deadline = U256::from(vm.timestamp());
            Self::eth_to_token_input(vm, this, frame.value, U256::from(1u8), deadline, frame.caller)?;
            return Ok(Vec::new());
        };
        match selector {
            ADD_LIQUIDITY => {
                let minted = Self::add_liquidity(vm, frame, args.uint(0)?, args.uint(1)?, args.uint(2)?)?;
                Ok(encode_uint(minted))
            }
            ETH_TO_TOKEN_SWAP_INPUT => {
                let (min_tokens, deadline) = (args.uint(0)?, args.uint(1)?);
                let bought =
                    Self::eth_to_token_input(vm, this, frame.value, min_tokens, deadline, frame.caller)?;
                Ok(encode_uint(bought))
            }
            _ => {
                frame.non_payable(self.name())?;
                self.call_non_payable(vm, frame, selector, &args)
            }
        }
    }
}

impl UniswapV1Exchange {
    fn call_non_payable(
        &self,
        vm: &mut Ledger,
        frame: &Frame,
        selector: Selector,
        args: &gauntlet_ledger::abi::AbiDecoder<'_>,
    ) -> CallResult<Vec<u8>> {
        let this = frame.address;
        match selector {
            SETUP => {
                let token = args.address(0)?;
                let factory = vm.sload_address(this, slot(EXCHANGE_FACTORY_SLOT));
                check(factory == Address::ZERO && Self::token(vm, this) == Address::ZERO)?;
                check(token != Address::ZERO)?;
                vm.sstore_address(this, slot(EXCHANGE_FACTORY_SLOT), frame.caller);
                vm.sstore_address(this, slot(EXCHANGE_TOKEN_SLOT), token);
                Ok(Vec::new())
            }
            TOKEN_ADDRESS => Ok(encode_address(Self::token(vm, this))),
            FACTORY_ADDRESS => {
                let key = slot(EXCHANGE_FACTORY_SLOT);
                Ok(encode_address(vm.sload_address(this, key)))
            }
            GET_ETH_TO_TOKEN_INPUT_PRICE => {
                let eth_sold = args.uint(0)?;
                check(!eth_sold.is_zero())?;
                let token_reserve = erc20::balance_of(vm, Self::token(vm, this), this)?;
                Ok(encode_uint(input_price(eth_sold, vm.balance(this), token_reserve)?))
            }
            GET_TOKEN_TO_ETH_INPUT_PRICE => {
                let tokens_sold = args.uint(0)?;
                check(!tokens_sold.is_zero())?;
                let token_reserve = erc20::balance_of(vm, Self::token(vm, this), this)?;
                Ok(encode_uint(input_price(tokens_sold, token_reserve, vm.balance(this))?))
            }
            TOKEN_TO_ETH_SWAP_INPUT => {
                let (tokens_sold, min_eth, deadline) = (args.uint(0)?, args.uint(1)?, args.uint(2)?);
                let bought =
                    Self::token_to_eth_input(vm, this, tokens_sold, min_eth, deadline, frame.caller)?;
                Ok(encode_uint(bought))
            }
            _ => erc20::dispatch(vm, frame, &LP_METADATA, selector, args)?.ok_or(
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
    pub fn initialize_factory(template: Address) -> Vec<u8> {
        AbiEncoder::call(super::INITIALIZE_FACTORY).address(template).finish()
    }

    #[must_use]
    pub fn create_exchange(token: Address) -> Vec<u8> {
        AbiEncoder::call(super::CREATE_EXCHANGE).address(token).finish()
    }

    #[must_use]
    pub fn get_exchange(token: Address) -> Vec<u8> {
        AbiEncoder::call(super::GET_EXCHANGE).address(token).finish()
    }

    #[must_use]
    pub fn get_token(exchange: Address) -> Vec<u8> {
        AbiEncoder::call(super::GET_TOKEN).address(exchange).finish()
    }

    #[must_use]
    pub fn setup(token: Address) -> Vec<u8> {
        AbiEncoder::call(super::SETUP).address(token).finish()
    }

    #[must_use]
    pub fn add_liquidity(min_liquidity: U256, max_tokens: U256, deadline: U256) -> Vec<u8> {
        AbiEncoder::call(super::ADD_LIQUIDITY)
            .uint(min_liquidity)
            .uint(max_tokens)
            .uint(deadline)
            .finish()
    }

    #[must_use]
    pub fn get_token_to_eth_input_price(tokens_sold: U256) -> Vec<u8> {
        AbiEncoder::call(super::GET_TOKEN_TO_ETH_INPUT_PRICE)
            .uint(tokens_sold)
            .finish()
    }

    #[must_use]
    pub fn get_eth_to_token_input_price(eth_sold: U256) -> Vec<u8> {
        AbiEncoder::call(super::GET_ETH_TO_TOKEN_INPUT_PRICE)
            .uint(eth_sold)
            .finish()
    }

    #[must_use]
    pub fn token_to_eth_swap_input(tokens_sold: U256, min_eth: U256, deadline: U256) -> Vec<u8> {
        AbiEncoder::call(super::TOKEN_TO_ETH_SWAP_INPUT)
            .uint(tokens_sold)
            .uint(min_eth)
            .uint(deadline)
            .finish()
    }

    #[must_use]
    pub fn eth_to_token_swap_input(min_tokens: U256, deadline: U256) -> Vec<u8> {
        AbiEncoder::call(super::ETH_TO_TOKEN_SWAP_INPUT)
            .uint(min_tokens)
            .uint(deadline)
            .finish()
    }
}

/// `factory.getExchange(token)` as a read-only call.
///
/// # Errors
///
/// Returns the factory's revert or a decoding failure.
pub fn exchange_for(vm: &Ledger, factory: Address, token: Address) -> CallResult<Address> {
    decode_address(&vm.view(factory, &calls::get_exchange(token))?)
}

/// `exchange.getTokenToEthInputPrice(tokens_sold)` as a read-only call.
///
/// # Errors
///
/// Returns the exchange's revert (empty reserves, zero input).
pub fn token_to_eth_price(vm: &Ledger, exchange: Address, tokens_sold: U256) -> CallResult<U256> {
    decode_uint(&vm.view(exchange, &calls::get_token_to_eth_input_price(tokens_sold))?)
}

/// `exchange.getEthToTokenInputPrice(eth_sold)` as a read-only call.
///
/// # Errors
///
/// Returns the exchange's revert (empty reserves, zero input).
pub fn eth_to_token_price(vm: &Ledger, exchange: Address, eth_sold: U256) -> CallResult<U256> {
    decode_uint(&vm.view(exchange, &calls::get_eth_to_token_input_price(eth_sold))?)
}
