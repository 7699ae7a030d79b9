//! DVT lending pool that prices its collateral from a Uniswap v1 exchange's
//! spot balances.
//!
//! Borrowing `amount` DVT requires depositing twice its value in ETH, with
//!
//! ```text
//! price = exchange.balance · 1e18 / token.balanceOf(exchange)
//! ```
//!
//! Dumping tokens into a thinly funded exchange collapses that price.

use alloy_primitives::{Address, B256, U256};
use gauntlet_ledger::abi::{decode_uint, encode_address, encode_uint, split_call, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::math;
use gauntlet_ledger::primitives::one_ether;
use gauntlet_ledger::revert::{ensure, CallResult, Revert};
use gauntlet_ledger::state::{address_key, mapping_slot, slot};
use gauntlet_ledger::vm::Ledger;
use tracing::debug;

use crate::erc20;
use crate::external::send_value;
use crate::guard::non_reentrant;

/// `calculateDepositRequired(uint256)`
pub const CALCULATE_DEPOSIT_REQUIRED: Selector = Selector::new([0xbc, 0x55, 0x4c, 0x28]);
/// `borrow(uint256,address)`
pub const BORROW: Selector = Selector::new([0x4b, 0x3f, 0xd1, 0x48]);
/// `deposits(address)`
pub const DEPOSITS: Selector = Selector::new([0xfc, 0x7e, 0x28, 0x6d]);
/// `DEPOSIT_FACTOR()`
pub const DEPOSIT_FACTOR: Selector = Selector::new([0x5d, 0x48, 0xe2, 0x55]);
/// `uniswapPair()`
pub const UNISWAP_PAIR: Selector = Selector::new([0xc8, 0x16, 0x84, 0x1b]);
/// `token()`
pub const TOKEN: Selector = Selector::new([0xfc, 0x0c, 0x54, 0x6a]);

/// Collateral multiple over the borrowed value.
pub const DEPOSIT_FACTOR_VALUE: u64 = 2;

const LOCK_SLOT: u64 = 0;
const DEPOSITS_SLOT: u64 = 1;

fn deposit_slot(account: Address) -> B256 {
    mapping_slot(address_key(account), slot(DEPOSITS_SLOT))
}

#[derive(Debug, Clone, Copy)]
pub struct PuppetPool {
    pub token: Address,
    /// The Uniswap v1 exchange used as the price oracle.
    pub uniswap_pair: Address,
}

impl PuppetPool {
    fn oracle_price(&self, vm: &Ledger) -> CallResult<U256> {
        let token_reserve = erc20::balance_of(vm, self.token, self.uniswap_pair)?;
        math::div(math::mul(vm.balance(self.uniswap_pair), one_ether())?, token_reserve)
    }

    fn deposit_required(&self, vm: &Ledger, amount: U256) -> CallResult<U256> {
        let value = math::mul(amount, self.oracle_price(vm)?)?;
        math::div(math::mul(value, U256::from(DEPOSIT_FACTOR_VALUE))?, one_ether())
    }

    fn borrow(&self, vm: &mut Ledger, frame: &Frame, amount: U256, recipient: Address) -> CallResult<()> {
        let this = frame.address;
        let deposit_required = self.deposit_required(vm, amount)?;
        ensure(frame.value >= deposit_required, "NotEnoughCollateral")?;
        if frame.value > deposit_required {
            send_value(vm, this, frame.caller, frame.value - deposit_required)?;
        }
        let key = deposit_slot(frame.caller);
        let deposited = math::add(vm.sload(this, key), deposit_required)?;
        vm.sstore(this, key, deposited);
        ensure(
            erc20::transfer(vm, this, self.token, recipient, amount)?,
            "TransferFailed",
        )?;
        debug!(borrower = %frame.caller, %recipient, %deposit_required, %amount, "borrowed");
        Ok(())
    }
}

impl Contract for PuppetPool {
    fn name(&self) -> &'static str {
        "PuppetPool"
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        let Some((selector, args)) = split_call(input) else {
            return Err(Revert::NotPayable {
                contract: self.name(),
            });
        };
        if selector == BORROW {
            let (amount, recipient) = (args.uint(0)?, args.address(1)?);
            non_reentrant(vm, frame.address, slot(LOCK_SLOT), |vm| {
                self.borrow(vm, frame, amount, recipient)
            })?;
            return Ok(Vec::new());
        }
        frame.non_payable(self.name())?;
        match selector {
            CALCULATE_DEPOSIT_REQUIRED => Ok(encode_uint(self.deposit_required(vm, args.uint(0)?)?)),
            DEPOSITS => Ok(encode_uint(vm.sload(frame.address, deposit_slot(args.address(0)?)))),
            DEPOSIT_FACTOR => Ok(encode_uint(U256::from(DEPOSIT_FACTOR_VALUE))),
            UNISWAP_PAIR => Ok(encode_address(self.uniswap_pair)),
            TOKEN => Ok(encode_address(self.token)),
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
    pub fn calculate_deposit_required(amount: U256) -> Vec<u8> {
        AbiEncoder::call(super::CALCULATE_DEPOSIT_REQUIRED)
            .uint(amount)
            .finish()
    }

    #[must_use]
    pub fn borrow(amount: U256, recipient: Address) -> Vec<u8> {
        AbiEncoder::call(super::BORROW)
            .uint(amount)
            .address(recipient)
            .finish()
    }

    #[must_use]
    pub fn deposits(account: Address) -> Vec<u8> {
        AbiEncoder::call(super::DEPOSITS).address(account).finish()
    }
}

/// `pool.calculateDepositRequired(amount)` as a read-only call.
///
/// # Errors
///
/// Returns the pool's revert (an empty oracle divides by zero).
pub fn deposit_required(vm: &Ledger, pool: Address, amount: U256) -> CallResult<U256> {
    decode_uint(&vm.view(pool, &calls::calculate_deposit_required(amount))?)
}

/// `pool.deposits(account)` as a read-only call.
///
/// # Errors
///
/// Returns the pool's revert or a decoding failure.
pub fn deposits(vm: &Ledger, pool: Address, account: Address) -> CallResult<U256> {
    decode_uint(&vm.view(pool, &calls::deposits(account))?)
}
