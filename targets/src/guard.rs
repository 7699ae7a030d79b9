//! Reentrancy lock kept in contract storage.

use alloy_primitives::{Address, B256, U256};
use gauntlet_ledger::revert::{require, CallResult};
use gauntlet_ledger::vm::Ledger;

const NOT_ENTERED: u64 = 1;
const ENTERED: u64 = 2;

/// Run `body` holding the lock stored at `slot` of `this`.
///
/// A nested entry while the lock is held reverts. If `body` reverts the lock
/// write is undone together with the rest of the frame.
///
/// # Errors
///
/// Returns `ReentrancyGuard: reentrant call` on re-entry, or `body`'s revert.
pub fn non_reentrant<T>(
    vm: &mut Ledger,
    this: Address,
    slot: B256,
    body: impl FnOnce(&mut Ledger) -> CallResult<T>,
) -> CallResult<T> {
    require(
        vm.sload(this, slot) != U256::from(ENTERED),
        "ReentrancyGuard: reentrant call",
    )?;
    vm.sstore(this, slot, U256::from(ENTERED));
    let out = body(vm)?;
    vm.sstore(this, slot, U256::from(NOT_ENTERED));
    Ok(out)
}
