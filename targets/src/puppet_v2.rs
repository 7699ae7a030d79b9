//! DVT lending pool that prices its WETH collateral from a Uniswap v2 pair's
//! reserves.
//!
//! Borrowing requires three times the token value in WETH, quoted at the
//! pair's current reserve ratio.

use alloy_primitives::{Address, B256, U256};
use gauntlet_ledger::abi::{decode_uint, encode_uint, split_call, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::math;
use gauntlet_ledger::primitives::one_ether;
use gauntlet_ledger::revert::{require, CallResult, Revert};
use gauntlet_ledger::state::{address_key, mapping_slot, slot};
use gauntlet_ledger::vm::Ledger;
use tracing::debug;

use crate::erc20;
use crate::uniswap_v2::library;

/// `calculateDepositOfWETHRequired(uint256)`
pub const CALCULATE_DEPOSIT_OF_WETH_REQUIRED: Selector = Selector::new([0xc4, 0xbd, 0x83, 0xfa]);
/// `borrow(uint256)`
pub const BORROW: Selector = Selector::new([0xc5, 0xeb, 0xea, 0xec]);
/// `deposits(address)`
pub const DEPOSITS: Selector = Selector::new([0xfc, 0x7e, 0x28, 0x6d]);

/// WETH collateral required per unit of borrowed value.
pub const DEPOSIT_FACTOR: u64 = 3;
const DEPOSITS_SLOT: u64 = 4;

fn deposit_slot(account: Address) -> B256 {
    mapping_slot(address_key(account), slot(DEPOSITS_SLOT))
}

#[derive(Debug, Clone, Copy)]
pub struct PuppetV2Pool {
    pub weth: Address,
    pub token: Address,
    pub uniswap_pair: Address,
    pub uniswap_factory: Address,
}

impl PuppetV2Pool {
    fn oracle_quote(&self, vm: &Ledger, amount: U256) -> CallResult<U256> {
        let (reserves_weth, reserves_token) =
            library::get_reserves(vm, self.uniswap_factory, self.weth, self.token)?;
        library::quote(math::mul(amount, one_ether())?, reserves_token, reserves_weth)
    }

    fn deposit_of_weth_required(&self, vm: &Ledger, token_amount: U256) -> CallResult<U256> {
        let quote = self.oracle_quote(vm, token_amount)?;
        math::div(math::mul(quote, U256::from(DEPOSIT_FACTOR))?, one_ether())
    }

    fn borrow(&self, vm: &mut Ledger, frame: &Frame, borrow_amount: U256) -> CallResult<()> {
        let this = frame.address;
        let amount = self.deposit_of_weth_required(vm, borrow_amount)?;
        erc20::transfer_from(vm, this, self.weth, frame.caller, this, amount)?;
        let key = deposit_slot(frame.caller);
        let deposited = math::add(vm.sload(this, key), amount)?;
        vm.sstore(this, key, deposited);
        require(
            erc20::transfer(vm, this, self.token, frame.caller, borrow_amount)?,
            "Transfer failed",
        )?;
        debug!(borrower = %frame.caller, deposit = %amount, %borrow_amount, "borrowed");
        Ok(())
    }
}

impl Contract for PuppetV2Pool {
    fn name(&self) -> &'static str {
        "PuppetV2Pool"
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        let Some((selector, args)) = split_call(input) else {
            return Err(Revert::NotPayable {
                contract: self.name(),
            });
        };
        frame.non_payable(self.name())?;
        match selector {
            BORROW => {
                self.borrow(vm, frame, args.uint(0)?)?;
                Ok(Vec::new())
            }
            CALCULATE_DEPOSIT_OF_WETH_REQUIRED => {
                Ok(encode_uint(self.deposit_of_weth_required(vm, args.uint(0)?)?))
            }
            DEPOSITS => Ok(encode_uint(vm.sload(frame.address, deposit_slot(args.address(0)?)))),
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
    pub fn calculate_deposit_of_weth_required(amount: U256) -> Vec<u8> {
        AbiEncoder::call(super::CALCULATE_DEPOSIT_OF_WETH_REQUIRED)
            .uint(amount)
            .finish()
    }

    #[must_use]
    pub fn borrow(amount: U256) -> Vec<u8> {
        AbiEncoder::call(super::BORROW).uint(amount).finish()
    }

    #[must_use]
    pub fn deposits(account: Address) -> Vec<u8> {
        AbiEncoder::call(super::DEPOSITS).address(account).finish()
    }
}

/// `pool.calculateDepositOfWETHRequired(amount)` as a read-only call.
///
/// # Errors
///
/// Returns the pool's revert or a decoding failure.
pub fn weth_deposit_required(vm: &Ledger, pool: Address, amount: U256) -> CallResult<U256> {
    decode_uint(&vm.view(pool, &calls::calculate_deposit_of_weth_required(amount))?)
}

/// `pool.deposits(account)` as a read-only call.
///
/// # Errors
///
/// Returns the pool's revert or a decoding failure.
pub fn deposits(vm: &Ledger, pool: Address, account: Address) -> CallResult<U256> {
    decode_uint(&vm.view(pool, &calls::deposits(account))?)
}
