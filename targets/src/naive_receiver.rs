//! ETH flash-loan pool with a fixed fee, and a borrower contract that pays
//! that fee on every loan it receives.
//!
//! The pool lets *anyone* name the borrower in `flashLoan`. The receiver
//! checks that the callback comes from its pool, but never checks who asked
//! the pool for the loan, so each loan initiated by a third party costs it
//! [`fixed_fee`] wei.

use alloy_primitives::{address, keccak256, Address, B256, U256};
use gauntlet_ledger::abi::{
    decode_address, decode_bytes32, encode_address, encode_bool, encode_bytes32, encode_uint,
    split_call, AbiEncoder, Selector,
};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::primitives::one_ether;
use gauntlet_ledger::revert::{authorize, ensure, CallResult, Revert};
use gauntlet_ledger::vm::Ledger;

use crate::external::safe_transfer_eth;

/// `ETH()`
pub const ETH: Selector = Selector::new([0x83, 0x22, 0xff, 0xf2]);
/// `maxFlashLoan(address)`
pub const MAX_FLASH_LOAN: Selector = Selector::new([0x61, 0x32, 0x55, 0xab]);
/// `flashFee(address,uint256)`
pub const FLASH_FEE: Selector = Selector::new([0xd9, 0xd9, 0x8c, 0xe4]);
/// `flashLoan(address,address,uint256,bytes)`
pub const FLASH_LOAN: Selector = Selector::new([0x5c, 0xff, 0xe9, 0xde]);
/// `onFlashLoan(address,address,uint256,uint256,bytes)`
pub const ON_FLASH_LOAN: Selector = Selector::new([0x23, 0xe3, 0x0c, 0x8b]);

/// Placeholder token address standing for native ETH.
pub const ETH_ADDRESS: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

/// Fee charged per loan, whatever the amount: 1 ETH.
#[must_use]
pub fn fixed_fee() -> U256 {
    one_ether()
}

/// Value a borrower's `onFlashLoan` must return.
#[must_use]
pub fn callback_success() -> B256 {
    keccak256("ERC3156FlashBorrower.onFlashLoan")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveReceiverLenderPool;

impl NaiveReceiverLenderPool {
    fn flash_loan(
        vm: &mut Ledger,
        frame: &Frame,
        receiver: Address,
        token: Address,
        amount: U256,
        data: &[u8],
    ) -> CallResult<()> {
        let this = frame.address;
        ensure(token == ETH_ADDRESS, "UnsupportedCurrency")?;
        let balance_before = vm.balance(this);

        safe_transfer_eth(vm, this, receiver, amount)?;
        let callback = calls::on_flash_loan(frame.caller, ETH_ADDRESS, amount, fixed_fee(), data);
        let returned = vm.call(this, receiver, U256::ZERO, &callback)?;
        ensure(
            decode_bytes32(&returned)? == callback_success(),
            "CallbackFailed",
        )?;

        ensure(
            vm.balance(this) >= balance_before.saturating_add(fixed_fee()),
            "RepayFailed",
        )
    }
}

impl Contract for NaiveReceiverLenderPool {
    fn name(&self) -> &'static str {
        "NaiveReceiverLenderPool"
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        // receive()
        let Some((selector, args)) = split_call(input) else {
            return Ok(Vec::new());
        };
        frame.non_payable(self.name())?;
        match selector {
            ETH => Ok(encode_address(ETH_ADDRESS)),
            MAX_FLASH_LOAN => {
                let max = if args.address(0)? == ETH_ADDRESS {
                    vm.balance(frame.address)
                } else {
                    U256::ZERO
                };
                Ok(encode_uint(max))
            }
            FLASH_FEE => {
                ensure(args.address(0)? == ETH_ADDRESS, "UnsupportedCurrency")?;
                Ok(encode_uint(fixed_fee()))
            }
            FLASH_LOAN => {
                let (receiver, token, amount) =
                    (args.address(0)?, args.address(1)?, args.uint(2)?);
                Self::flash_loan(vm, frame, receiver, token, amount, args.bytes(3)?)?;
                Ok(encode_bool(true))
            }
            _ => Err(Revert::UnknownSelector {
                contract: self.name(),
                selector,
            }),
        }
    }
}

/// Borrower that repays `amount + fee` to its pool on every callback.
#[derive(Debug, Clone, Copy)]
pub struct FlashLoanReceiver {
    pub pool: Address,
}

impl Contract for FlashLoanReceiver {
    fn name(&self) -> &'static str {
        "FlashLoanReceiver"
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        // receive()
        let Some((selector, args)) = split_call(input) else {
            return Ok(Vec::new());
        };
        frame.non_payable(self.name())?;
        if selector != ON_FLASH_LOAN {
            return Err(Revert::UnknownSelector {
                contract: self.name(),
                selector,
            });
        }
        authorize(frame.caller == self.pool, "InvalidCaller")?;
        ensure(args.address(1)? == ETH_ADDRESS, "UnsupportedCurrency")?;
        let amount_to_be_repaid = args.uint(2)?.wrapping_add(args.uint(3)?);
        safe_transfer_eth(vm, frame.address, self.pool, amount_to_be_repaid)?;
        Ok(encode_bytes32(callback_success()))
    }
}

pub mod calls {
    use alloy_primitives::{Address, U256};
    use gauntlet_ledger::abi::AbiEncoder;

    #[must_use]
    pub fn max_flash_loan(token: Address) -> Vec<u8> {
        AbiEncoder::call(super::MAX_FLASH_LOAN).address(token).finish()
    }

    #[must_use]
    pub fn flash_fee(token: Address, amount: U256) -> Vec<u8> {
        AbiEncoder::call(super::FLASH_FEE)
            .address(token)
            .uint(amount)
            .finish()
    }

    #[must_use]
    pub fn flash_loan(receiver: Address, token: Address, amount: U256, data: &[u8]) -> Vec<u8> {
        AbiEncoder::call(super::FLASH_LOAN)
            .address(receiver)
            .address(token)
            .uint(amount)
            .bytes(data)
            .finish()
    }

    #[must_use]
    pub fn on_flash_loan(
        initiator: Address,
        token: Address,
        amount: U256,
        fee: U256,
        data: &[u8],
    ) -> Vec<u8> {
        AbiEncoder::call(super::ON_FLASH_LOAN)
            .address(initiator)
            .address(token)
            .uint(amount)
            .uint(fee)
            .bytes(data)
            .finish()
    }
}

/// `pool.ETH()` as a read-only call.
///
/// # Errors
///
/// Returns the pool's revert or a decoding failure.
pub fn eth_token(vm: &Ledger, pool: Address) -> CallResult<Address> {
    decode_address(&vm.view(pool, &AbiEncoder::call(ETH).finish())?)
}
