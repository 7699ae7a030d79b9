//! Wrapped ether: an ERC-20 minted one-for-one against deposited wei.

use gauntlet_ledger::abi::{split_call, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::revert::{CallResult, Revert};
use gauntlet_ledger::vm::Ledger;

use crate::erc20::{self, Metadata};
use crate::external::safe_transfer_eth;

/// `deposit()`
pub const DEPOSIT: Selector = Selector::new([0xd0, 0xe3, 0x0d, 0xb0]);
/// `withdraw(uint256)`
pub const WITHDRAW: Selector = Selector::new([0x2e, 0x1a, 0x7d, 0x4d]);

const METADATA: Metadata = Metadata {
    name: "Wrapped Ether",
    symbol: "WETH",
    decimals: 18,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Weth;

impl Contract for Weth {
    fn name(&self) -> &'static str {
        "WETH"
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        // receive() wraps
        let Some((selector, args)) = split_call(input) else {
            erc20::storage::mint(vm, frame.address, frame.caller, frame.value)?;
            return Ok(Vec::new());
        };
        match selector {
            DEPOSIT => {
                erc20::storage::mint(vm, frame.address, frame.caller, frame.value)?;
                Ok(Vec::new())
            }
            WITHDRAW => {
                frame.non_payable(self.name())?;
                let amount = args.uint(0)?;
                erc20::storage::burn(vm, frame.address, frame.caller, amount)?;
                safe_transfer_eth(vm, frame.address, frame.caller, amount)?;
                Ok(Vec::new())
            }
            _ => erc20::dispatch(vm, frame, &METADATA, selector, &args)?.ok_or(
                Revert::UnknownSelector {
                    contract: self.name(),
                    selector,
                },
            ),
        }
    }
}

pub mod calls {
    use alloy_primitives::U256;
    use gauntlet_ledger::abi::AbiEncoder;

    #[must_use]
    pub fn deposit() -> Vec<u8> {
        AbiEncoder::call(super::DEPOSIT).finish()
    }

    #[must_use]
    pub fn withdraw(amount: U256) -> Vec<u8> {
        AbiEncoder::call(super::WITHDRAW).uint(amount).finish()
    }
}
