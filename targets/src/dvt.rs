//! Damn Valuable Token: a plain ERC-20 whose whole supply goes to the deployer.

use alloy_primitives::U256;
use gauntlet_ledger::abi::split_call;
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::revert::{CallResult, Revert};
use gauntlet_ledger::vm::Ledger;

use crate::erc20::{self, Metadata};

const METADATA: Metadata = Metadata {
    name: "DamnValuableToken",
    symbol: "DVT",
    decimals: 18,
};

/// The token contract. Its constructor mints `U256::MAX` to the deployer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DamnValuableToken;

impl Contract for DamnValuableToken {
    fn name(&self) -> &'static str {
        "DamnValuableToken"
    }

    fn construct(&self, vm: &mut Ledger, frame: &Frame) -> CallResult<()> {
        frame.non_payable(self.name())?;
        erc20::storage::mint(vm, frame.address, frame.caller, U256::MAX)
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        let Some((selector, args)) = split_call(input) else {
            return Err(Revert::NotPayable {
                contract: self.name(),
            });
        };
        erc20::dispatch(vm, frame, &METADATA, selector, &args)?.ok_or(Revert::UnknownSelector {
            contract: self.name(),
            selector,
        })
    }
}
