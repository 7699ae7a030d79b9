//! Contract contract: the minimal trait deployed code must implement.
//!
//! Contract logic is immutable once deployed. Constructor arguments that
//! Solidity would bake into bytecode as immutables live in the implementing
//! struct; everything mutable lives in ledger storage, so re-entrant calls
//! observe the same state the outer frame is working on.

use alloy_primitives::{Address, U256};

use crate::revert::{CallResult, Revert};
use crate::vm::Ledger;

/// Execution context of a call frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// `msg.sender`.
    pub caller: Address,
    /// `address(this)`.
    pub address: Address,
    /// `msg.value`.
    pub value: U256,
    /// `tx.origin`.
    pub origin: Address,
}

impl Frame {
    /// Reject value sent to a non-payable function.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::NotPayable`] if `msg.value` is non-zero.
    pub fn non_payable(&self, contract: &'static str) -> CallResult<()> {
        if self.value.is_zero() {
            Ok(())
        } else {
            Err(Revert::NotPayable { contract })
        }
    }
}

/// Logic deployed at a contract address.
pub trait Contract: std::fmt::Debug + Send + Sync {
    /// Contract name, used in traces and state digests.
    fn name(&self) -> &'static str;

    /// Constructor body, run once inside the creating frame.
    ///
    /// # Errors
    ///
    /// A revert aborts the deployment; no code is left at the address.
    fn construct(&self, _vm: &mut Ledger, _frame: &Frame) -> CallResult<()> {
        Ok(())
    }

    /// Handle a message call. Empty `input` is a plain value transfer.
    ///
    /// # Errors
    ///
    /// Any revert unwinds this frame's state changes.
    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>>;
}
