//! ETH pool offering free flash loans and deposit/withdraw accounting.
//!
//! The loan is considered repaid when the pool's ETH balance is back where it
//! started. Depositing the borrowed ETH satisfies that check while crediting
//! the borrower's withdrawable balance.

use alloy_primitives::{Address, B256, U256};
use gauntlet_ledger::abi::{decode_uint, encode_uint, split_call, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::revert::{ensure, CallResult, Revert};
use gauntlet_ledger::state::{address_key, mapping_slot, slot};
use gauntlet_ledger::vm::Ledger;

use crate::external::safe_transfer_eth;

/// `deposit()`
pub const DEPOSIT: Selector = Selector::new([0xd0, 0xe3, 0x0d, 0xb0]);
/// `withdraw()`
pub const WITHDRAW: Selector = Selector::new([0x3c, 0xcf, 0xd6, 0x0b]);
/// `flashLoan(uint256)`
pub const FLASH_LOAN: Selector = Selector::new([0x9a, 0xb6, 0x03, 0xb9]);
/// `balances(address)`
pub const BALANCES: Selector = Selector::new([0x27, 0xe2, 0x35, 0xe3]);
/// `execute()`, the borrower callback.
pub const EXECUTE: Selector = Selector::new([0x61, 0x46, 0x19, 0x54]);

const BALANCES_SLOT: u64 = 0;

fn balance_slot(account: Address) -> B256 {
    mapping_slot(address_key(account), slot(BALANCES_SLOT))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SideEntranceLenderPool;

impl SideEntranceLenderPool {
    fn flash_loan(vm: &mut Ledger, frame: &Frame, amount: U256) -> CallResult<()> {
        let this = frame.address;
        let balance_before = vm.balance(this);
        vm.call(this, frame.caller, amount, &EXECUTE.as_bytes())?;
        ensure(vm.balance(this) >= balance_before, "RepayFailed")
    }
}

impl Contract for SideEntranceLenderPool {
    fn name(&self) -> &'static str {
        "SideEntranceLenderPool"
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        let Some((selector, args)) = split_call(input) else {
            return Err(Revert::NotPayable {
                contract: self.name(),
            });
        };
        let this = frame.address;
        match selector {
            DEPOSIT => {
                let key = balance_slot(frame.caller);
                // Bounded by the total ETH supply.
                let credited = vm.sload(this, key).saturating_add(frame.value);
                vm.sstore(this, key, credited);
                Ok(Vec::new())
            }
            WITHDRAW => {
                frame.non_payable(self.name())?;
                let key = balance_slot(frame.caller);
                let amount = vm.sload(this, key);
                vm.sstore(this, key, U256::ZERO);
                safe_transfer_eth(vm, this, frame.caller, amount)?;
                Ok(Vec::new())
            }
            FLASH_LOAN => {
                frame.non_payable(self.name())?;
                Self::flash_loan(vm, frame, args.uint(0)?)?;
                Ok(Vec::new())
            }
            BALANCES => {
                frame.non_payable(self.name())?;
                Ok(encode_uint(vm.sload(this, balance_slot(args.address(0)?))))
            }
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
    pub fn deposit() -> Vec<u8> {
        AbiEncoder::call(super::DEPOSIT).finish()
    }

    #[must_use]
    pub fn withdraw() -> Vec<u8> {
        AbiEncoder::call(super::WITHDRAW).finish()
    }

    #[must_use]
    pub fn flash_loan(amount: U256) -> Vec<u8> {
        AbiEncoder::call(super::FLASH_LOAN).uint(amount).finish()
    }

    #[must_use]
    pub fn balances(account: Address) -> Vec<u8> {
        AbiEncoder::call(super::BALANCES).address(account).finish()
    }
}

/// `pool.balances(account)` as a read-only call.
///
/// # Errors
///
/// Returns the pool's revert or a decoding failure.
pub fn deposited(vm: &Ledger, pool: Address, account: Address) -> CallResult<U256> {
    decode_uint(&vm.view(pool, &calls::balances(account))?)
}
