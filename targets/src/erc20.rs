//! Shared ERC-20 logic.
//!
//! Every token in the workspace (DVT, WETH and the exchanges' liquidity
//! tokens) keeps its accounting at the same storage slots:
//!
//! | slot | field |
//! |---|---|
//! | 2 | `totalSupply` |
//! | 3 | `balanceOf[holder]` |
//! | 4 | `allowance[owner][spender]` |
//!
//! Debits use checked arithmetic and panic with `0x11` on underflow. An
//! allowance of `U256::MAX` is never decremented.
//!
//! The top-level functions here are the *caller* side: message calls into a
//! token from contract code, and read-only balance queries. The token side
//! lives in [`storage`] and [`dispatch`].

use alloy_primitives::{Address, U256};
use gauntlet_ledger::abi::{
    decode_bool, decode_uint, encode_bool, encode_uint, AbiDecoder, AbiEncoder, Selector,
};
use gauntlet_ledger::contract::Frame;
use gauntlet_ledger::revert::{require, CallResult};
use gauntlet_ledger::vm::Ledger;

/// `name()`
pub const NAME: Selector = Selector::new([0x06, 0xfd, 0xde, 0x03]);
/// `symbol()`
pub const SYMBOL: Selector = Selector::new([0x95, 0xd8, 0x9b, 0x41]);
/// `decimals()`
pub const DECIMALS: Selector = Selector::new([0x31, 0x3c, 0xe5, 0x67]);
/// `totalSupply()`
pub const TOTAL_SUPPLY: Selector = Selector::new([0x18, 0x16, 0x0d, 0xdd]);
/// `balanceOf(address)`
pub const BALANCE_OF: Selector = Selector::new([0x70, 0xa0, 0x82, 0x31]);
/// `allowance(address,address)`
pub const ALLOWANCE: Selector = Selector::new([0xdd, 0x62, 0xed, 0x3e]);
/// `transfer(address,uint256)`
pub const TRANSFER: Selector = Selector::new([0xa9, 0x05, 0x9c, 0xbb]);
/// `transferFrom(address,address,uint256)`
pub const TRANSFER_FROM: Selector = Selector::new([0x23, 0xb8, 0x72, 0xdd]);
/// `approve(address,uint256)`
pub const APPROVE: Selector = Selector::new([0x09, 0x5e, 0xa7, 0xb3]);

const SURFACE: [Selector; 9] = [
    NAME,
    SYMBOL,
    DECIMALS,
    TOTAL_SUPPLY,
    BALANCE_OF,
    ALLOWANCE,
    TRANSFER,
    TRANSFER_FROM,
    APPROVE,
];

/// Token metadata returned by the `name`/`symbol`/`decimals` views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// Storage-level accounting, used by token contracts on their own address.
pub mod storage {
    use alloy_primitives::{Address, B256, U256};
    use gauntlet_ledger::math;
    use gauntlet_ledger::revert::CallResult;
    use gauntlet_ledger::state::{address_key, mapping_slot, slot};
    use gauntlet_ledger::vm::Ledger;

    const TOTAL_SUPPLY_SLOT: u64 = 2;
    const BALANCES_SLOT: u64 = 3;
    const ALLOWANCES_SLOT: u64 = 4;

    fn balance_slot(holder: Address) -> B256 {
        mapping_slot(address_key(holder), slot(BALANCES_SLOT))
    }

    fn allowance_slot(owner: Address, spender: Address) -> B256 {
        let inner = mapping_slot(address_key(owner), slot(ALLOWANCES_SLOT));
        mapping_slot(address_key(spender), inner)
    }

    #[must_use]
    pub fn total_supply(vm: &Ledger, token: Address) -> U256 {
        vm.sload(token, slot(TOTAL_SUPPLY_SLOT))
    }

    #[must_use]
    pub fn balance(vm: &Ledger, token: Address, holder: Address) -> U256 {
        vm.sload(token, balance_slot(holder))
    }

    #[must_use]
    pub fn allowance(vm: &Ledger, token: Address, owner: Address, spender: Address) -> U256 {
        vm.sload(token, allowance_slot(owner, spender))
    }

    /// Create `amount` new tokens for `to`.
    ///
    /// # Errors
    ///
    /// Panics (`0x11`) if the total supply would overflow.
    pub fn mint(vm: &mut Ledger, token: Address, to: Address, amount: U256) -> CallResult<()> {
        let supply = math::add(total_supply(vm, token), amount)?;
        vm.sstore(token, slot(TOTAL_SUPPLY_SLOT), supply);
        // Bounded by the total supply.
        let credited = balance(vm, token, to).saturating_add(amount);
        vm.sstore(token, balance_slot(to), credited);
        Ok(())
    }

    /// Destroy `amount` of `from`'s tokens.
    ///
    /// # Errors
    ///
    /// Panics (`0x11`) if `from` holds less than `amount`.
    pub fn burn(vm: &mut Ledger, token: Address, from: Address, amount: U256) -> CallResult<()> {
        let remaining = math::sub(balance(vm, token, from), amount)?;
        vm.sstore(token, balance_slot(from), remaining);
        let supply = total_supply(vm, token).saturating_sub(amount);
        vm.sstore(token, slot(TOTAL_SUPPLY_SLOT), supply);
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Panics (`0x11`) if `from` holds less than `amount`.
    pub fn transfer(
        vm: &mut Ledger,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> CallResult<()> {
        let remaining = math::sub(balance(vm, token, from), amount)?;
        vm.sstore(token, balance_slot(from), remaining);
        let credited = balance(vm, token, to).saturating_add(amount);
        vm.sstore(token, balance_slot(to), credited);
        Ok(())
    }

    pub fn approve(vm: &mut Ledger, token: Address, owner: Address, spender: Address, amount: U256) {
        vm.sstore(token, allowance_slot(owner, spender), amount);
    }

    /// Consume `amount` of `spender`'s allowance over `owner`'s tokens.
    ///
    /// # Errors
    ///
    /// Panics (`0x11`) if the allowance is finite and below `amount`.
    pub fn spend_allowance(
        vm: &mut Ledger,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> CallResult<()> {
        let allowed = allowance(vm, token, owner, spender);
        if allowed != U256::MAX {
            vm.sstore(token, allowance_slot(owner, spender), math::sub(allowed, amount)?);
        }
        Ok(())
    }
}

/// Serve the standard ERC-20 functions for the token at `frame.address`.
///
/// Returns `Ok(None)` when `selector` is not part of the ERC-20 surface, so
/// the token can handle its own extensions.
///
/// # Errors
///
/// Returns the revert raised by the function (bad arguments, insufficient
/// balance or allowance, value sent to a non-payable function).
pub fn dispatch(
    vm: &mut Ledger,
    frame: &Frame,
    metadata: &Metadata,
    selector: Selector,
    args: &AbiDecoder<'_>,
) -> CallResult<Option<Vec<u8>>> {
    if !SURFACE.contains(&selector) {
        return Ok(None);
    }
    frame.non_payable(metadata.name)?;
    let this = frame.address;
    let out = match selector {
        NAME => AbiEncoder::new().bytes(metadata.name.as_bytes()).finish(),
        SYMBOL => AbiEncoder::new().bytes(metadata.symbol.as_bytes()).finish(),
        DECIMALS => encode_uint(U256::from(metadata.decimals)),
        TOTAL_SUPPLY => encode_uint(storage::total_supply(vm, this)),
        BALANCE_OF => encode_uint(storage::balance(vm, this, args.address(0)?)),
        ALLOWANCE => encode_uint(storage::allowance(
            vm,
            this,
            args.address(0)?,
            args.address(1)?,
        )),
        TRANSFER => {
            storage::transfer(vm, this, frame.caller, args.address(0)?, args.uint(1)?)?;
            encode_bool(true)
        }
        TRANSFER_FROM => {
            let (from, to, amount) = (args.address(0)?, args.address(1)?, args.uint(2)?);
            storage::spend_allowance(vm, this, from, frame.caller, amount)?;
            storage::transfer(vm, this, from, to, amount)?;
            encode_bool(true)
        }
        APPROVE => {
            storage::approve(vm, this, frame.caller, args.address(0)?, args.uint(1)?);
            encode_bool(true)
        }
        _ => return Ok(None),
    };
    Ok(Some(out))
}

/// Calldata builders.
pub mod calls {
    use alloy_primitives::{Address, U256};
    use gauntlet_ledger::abi::AbiEncoder;

    #[must_use]
    pub fn balance_of(holder: Address) -> Vec<u8> {
        AbiEncoder::call(super::BALANCE_OF).address(holder).finish()
    }

    #[must_use]
    pub fn total_supply() -> Vec<u8> {
        AbiEncoder::call(super::TOTAL_SUPPLY).finish()
    }

    #[must_use]
    pub fn allowance(owner: Address, spender: Address) -> Vec<u8> {
        AbiEncoder::call(super::ALLOWANCE)
            .address(owner)
            .address(spender)
            .finish()
    }

    #[must_use]
    pub fn transfer(to: Address, amount: U256) -> Vec<u8> {
        AbiEncoder::call(super::TRANSFER)
            .address(to)
            .uint(amount)
            .finish()
    }

    #[must_use]
    pub fn transfer_from(from: Address, to: Address, amount: U256) -> Vec<u8> {
        AbiEncoder::call(super::TRANSFER_FROM)
            .address(from)
            .address(to)
            .uint(amount)
            .finish()
    }

    #[must_use]
    pub fn approve(spender: Address, amount: U256) -> Vec<u8> {
        AbiEncoder::call(super::APPROVE)
            .address(spender)
            .uint(amount)
            .finish()
    }
}

/// `token.balanceOf(holder)` as a read-only call.
///
/// # Errors
///
/// Returns the token's revert, or [`gauntlet_ledger::revert::Revert::InvalidCalldata`]
/// if the return data is not a word.
pub fn balance_of(vm: &Ledger, token: Address, holder: Address) -> CallResult<U256> {
    decode_uint(&vm.view(token, &calls::balance_of(holder))?)
}

/// `token.allowance(owner, spender)` as a read-only call.
///
/// # Errors
///
/// Returns the token's revert or a decoding failure.
pub fn allowance(vm: &Ledger, token: Address, owner: Address, spender: Address) -> CallResult<U256> {
    decode_uint(&vm.view(token, &calls::allowance(owner, spender))?)
}

/// `token.transfer(to, amount)` from `caller`, returning the token's bool.
///
/// # Errors
///
/// Returns the token's revert.
pub fn transfer(
    vm: &mut Ledger,
    caller: Address,
    token: Address,
    to: Address,
    amount: U256,
) -> CallResult<bool> {
    returned_true(&vm.call(caller, token, U256::ZERO, &calls::transfer(to, amount))?)
}

/// `token.transferFrom(from, to, amount)` from `caller`.
///
/// # Errors
///
/// Returns the token's revert.
pub fn transfer_from(
    vm: &mut Ledger,
    caller: Address,
    token: Address,
    from: Address,
    to: Address,
    amount: U256,
) -> CallResult<bool> {
    let input = calls::transfer_from(from, to, amount);
    returned_true(&vm.call(caller, token, U256::ZERO, &input)?)
}

/// `token.approve(spender, amount)` from `caller`.
///
/// # Errors
///
/// Returns the token's revert.
pub fn approve(
    vm: &mut Ledger,
    caller: Address,
    token: Address,
    spender: Address,
    amount: U256,
) -> CallResult<bool> {
    returned_true(&vm.call(caller, token, U256::ZERO, &calls::approve(spender, amount))?)
}

/// Low-level `transfer`: `true` only if the call succeeded and returned
/// nothing or `true`. The token's revert reason is discarded.
pub fn try_transfer(
    vm: &mut Ledger,
    caller: Address,
    token: Address,
    to: Address,
    amount: U256,
) -> bool {
    matches!(transfer(vm, caller, token, to, amount), Ok(true))
}

/// Low-level `transferFrom`, with the same success rule as [`try_transfer`].
pub fn try_transfer_from(
    vm: &mut Ledger,
    caller: Address,
    token: Address,
    from: Address,
    to: Address,
    amount: U256,
) -> bool {
    matches!(transfer_from(vm, caller, token, from, to, amount), Ok(true))
}

/// `transfer` that must succeed, reverting with `TRANSFER_FAILED` otherwise.
///
/// # Errors
///
/// Returns `TRANSFER_FAILED` if the token reverted or returned `false`.
pub fn safe_transfer(
    vm: &mut Ledger,
    caller: Address,
    token: Address,
    to: Address,
    amount: U256,
) -> CallResult<()> {
    require(try_transfer(vm, caller, token, to, amount), "TRANSFER_FAILED")
}

fn returned_true(output: &[u8]) -> CallResult<bool> {
    if output.is_empty() {
        return Ok(true);
    }
    decode_bool(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_ledger::address;
    use gauntlet_ledger::revert::{PanicCode, Revert};
    use gauntlet_ledger::vm::LedgerConfig;

    const TOKEN: Address = address!("00000000000000000000000000000000000000d7");
    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0000000000000000000000000000000000000b0b");

    #[test]
    fn selectors_match_signatures() {
        for (selector, signature) in [
            (NAME, "name()"),
            (SYMBOL, "symbol()"),
            (DECIMALS, "decimals()"),
            (TOTAL_SUPPLY, "totalSupply()"),
            (BALANCE_OF, "balanceOf(address)"),
            (ALLOWANCE, "allowance(address,address)"),
            (TRANSFER, "transfer(address,uint256)"),
            (TRANSFER_FROM, "transferFrom(address,address,uint256)"),
            (APPROVE, "approve(address,uint256)"),
        ] {
            assert_eq!(selector, Selector::of(signature), "{signature}");
        }
    }

    #[test]
    fn mint_and_transfer_conserve_supply() {
        let mut vm = Ledger::new(LedgerConfig::default());
        storage::mint(&mut vm, TOKEN, ALICE, U256::from(100u8)).unwrap();
        storage::transfer(&mut vm, TOKEN, ALICE, BOB, U256::from(30u8)).unwrap();
        assert_eq!(storage::balance(&vm, TOKEN, ALICE), U256::from(70u8));
        assert_eq!(storage::balance(&vm, TOKEN, BOB), U256::from(30u8));
        assert_eq!(storage::total_supply(&vm, TOKEN), U256::from(100u8));
    }

    #[test]
    fn overdraft_is_arithmetic_panic() {
        let mut vm = Ledger::new(LedgerConfig::default());
        let err = storage::transfer(&mut vm, TOKEN, ALICE, BOB, U256::from(1u8)).unwrap_err();
        assert_eq!(err, Revert::Panic(PanicCode::ArithmeticOverflow));
    }

    #[test]
    fn max_allowance_is_never_spent() {
        let mut vm = Ledger::new(LedgerConfig::default());
        storage::approve(&mut vm, TOKEN, ALICE, BOB, U256::MAX);
        storage::spend_allowance(&mut vm, TOKEN, ALICE, BOB, U256::from(5u8)).unwrap();
        assert_eq!(storage::allowance(&vm, TOKEN, ALICE, BOB), U256::MAX);

        storage::approve(&mut vm, TOKEN, ALICE, BOB, U256::from(4u8));
        assert!(storage::spend_allowance(&mut vm, TOKEN, ALICE, BOB, U256::from(5u8)).is_err());
        storage::spend_allowance(&mut vm, TOKEN, ALICE, BOB, U256::from(3u8)).unwrap();
        assert_eq!(storage::allowance(&vm, TOKEN, ALICE, BOB), U256::from(1u8));
    }

    #[test]
    fn burn_reduces_supply() {
        let mut vm = Ledger::new(LedgerConfig::default());
        storage::mint(&mut vm, TOKEN, ALICE, U256::from(10u8)).unwrap();
        storage::burn(&mut vm, TOKEN, ALICE, U256::from(4u8)).unwrap();
        assert_eq!(storage::total_supply(&vm, TOKEN), U256::from(6u8));
        assert!(storage::burn(&mut vm, TOKEN, BOB, U256::from(1u8)).is_err());
    }

    #[test]
    fn empty_return_data_counts_as_success() {
        assert!(returned_true(&[]).unwrap());
        assert!(!returned_true(&encode_bool(false)).unwrap());
    }
}
