//! Low-level external calls: value transfers and arbitrary calls.
//!
//! Two conventions exist in the targets. The compact one swallows the
//! callee's revert reason and reverts with a fixed message; the verbose one
//! checks the sender's balance first. [`function_call`] forwards the callee's
//! revert unchanged.

use alloy_primitives::{Address, U256};
use gauntlet_ledger::revert::{require, CallResult, Revert};
use gauntlet_ledger::vm::Ledger;

/// Send `amount` wei; any failure becomes `ETH_TRANSFER_FAILED`.
///
/// # Errors
///
/// Returns [`Revert::Message`] if the recipient reverts or `from` cannot
/// cover `amount`.
pub fn safe_transfer_eth(
    vm: &mut Ledger,
    from: Address,
    to: Address,
    amount: U256,
) -> CallResult<()> {
    vm.call(from, to, amount, &[])
        .map(|_| ())
        .map_err(|_| Revert::message("ETH_TRANSFER_FAILED"))
}

/// Send `amount` wei after checking the sender's balance.
///
/// # Errors
///
/// Returns [`Revert::Message`] on insufficient balance or if the recipient
/// reverts.
pub fn send_value(vm: &mut Ledger, from: Address, to: Address, amount: U256) -> CallResult<()> {
    require(vm.balance(from) >= amount, "Address: insufficient balance")?;
    vm.call(from, to, amount, &[]).map(|_| ()).map_err(|_| {
        Revert::message("Address: unable to send value, recipient may have reverted")
    })
}

/// Call `target` with `data`, requiring that `target` holds code.
///
/// # Errors
///
/// Returns `Address: call to non-contract` for targets without code, or the
/// callee's own revert.
pub fn function_call(
    vm: &mut Ledger,
    from: Address,
    target: Address,
    data: &[u8],
) -> CallResult<Vec<u8>> {
    require(vm.code_name(target).is_some(), "Address: call to non-contract")?;
    vm.call(from, target, U256::ZERO, data)
}
