//! World state: accounts, native balances, contract code and storage.
//!
//! `WorldState` is a plain value. The VM checkpoints it by cloning before
//! every call frame and restores the clone on revert; contract code is held
//! behind `Arc` so a checkpoint never copies contract logic.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::contract::Contract;
use crate::revert::{CallResult, Revert};

/// A single account.
#[derive(Debug, Clone, Default)]
pub struct Account {
    /// Native balance in wei.
    pub balance: U256,
    /// Transactions sent (EOA) or contracts created (contract).
    pub nonce: u64,
    /// Contract logic; `None` for externally owned accounts.
    pub code: Option<Arc<dyn Contract>>,
}

/// Storage slot index as a key.
#[must_use]
pub fn slot(index: u64) -> B256 {
    B256::from(U256::from(index).to_be_bytes::<32>())
}

/// Solidity layout for `mapping(key => _)` declared at `base`:
/// `keccak256(key ‖ base)`.
#[must_use]
pub fn mapping_slot(key: B256, base: B256) -> B256 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(key.as_slice());
    preimage[32..].copy_from_slice(base.as_slice());
    keccak256(preimage)
}

/// Mapping key for an address (left-padded word).
#[must_use]
pub fn address_key(address: Address) -> B256 {
    address.into_word()
}

/// Accounts and storage.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    accounts: BTreeMap<Address, Account>,
    storage: BTreeMap<(Address, B256), U256>,
}

impl WorldState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn account(&self, address: Address) -> Option<&Account> {
        self.accounts.get(&address)
    }

    /// All accounts in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    #[must_use]
    pub fn balance(&self, address: Address) -> U256 {
        self.accounts
            .get(&address)
            .map_or(U256::ZERO, |a| a.balance)
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    #[must_use]
    pub fn nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map_or(0, |a| a.nonce)
    }

    /// Increment the nonce, returning the value before the increment.
    pub fn bump_nonce(&mut self, address: Address) -> u64 {
        let account = self.accounts.entry(address).or_default();
        let nonce = account.nonce;
        account.nonce = nonce.saturating_add(1);
        nonce
    }

    #[must_use]
    pub fn code(&self, address: Address) -> Option<Arc<dyn Contract>> {
        self.accounts.get(&address).and_then(|a| a.code.clone())
    }

    /// Install code at a fresh contract address (nonce starts at 1).
    pub fn install_code(&mut self, address: Address, code: Arc<dyn Contract>) {
        let account = self.accounts.entry(address).or_default();
        account.code = Some(code);
        account.nonce = 1;
    }

    /// Move `value` wei from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`Revert::InsufficientBalance`] if `from` holds less than `value`.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> CallResult<()> {
        if value.is_zero() {
            return Ok(());
        }
        let available = self.balance(from);
        let remaining = available
            .checked_sub(value)
            .ok_or(Revert::InsufficientBalance {
                account: from,
                available,
                required: value,
            })?;
        self.set_balance(from, remaining);
        let credited = self.balance(to).saturating_add(value);
        self.set_balance(to, credited);
        Ok(())
    }

    #[must_use]
    pub fn sload(&self, address: Address, key: B256) -> U256 {
        self.storage
            .get(&(address, key))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Write a slot; writing zero clears it.
    pub fn sstore(&mut self, address: Address, key: B256, value: U256) {
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
    }

    /// Canonical JSON projection of the whole state.
    ///
    /// Accounts are keyed by lowercase hex address; balances and slot values
    /// are decimal strings (canonical JSON admits only 64-bit integers).
    #[must_use]
    pub fn to_canonical_json(&self) -> serde_json::Value {
        let mut accounts = serde_json::Map::new();
        for (address, account) in &self.accounts {
            let storage: serde_json::Map<String, serde_json::Value> = self
                .storage
                .range((*address, B256::ZERO)..=(*address, B256::repeat_byte(0xff)))
                .map(|((_, key), value)| {
                    (
                        format!("0x{}", hex::encode(key)),
                        serde_json::Value::String(value.to_string()),
                    )
                })
                .collect();
            accounts.insert(
                format!("0x{}", hex::encode(address)),
                serde_json::json!({
                    "balance": account.balance.to_string(),
                    "code": account.code.as_ref().map(|c| c.name()),
                    "nonce": account.nonce,
                    "storage": storage,
                }),
            );
        }
        serde_json::json!({
            "accounts": accounts,
            "schema_version": "world_state.v1",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0000000000000000000000000000000000000b0b");

    #[test]
    fn transfer_moves_value() {
        let mut state = WorldState::new();
        state.set_balance(ALICE, U256::from(10u8));
        state.transfer(ALICE, BOB, U256::from(4u8)).unwrap();
        assert_eq!(state.balance(ALICE), U256::from(6u8));
        assert_eq!(state.balance(BOB), U256::from(4u8));
    }

    #[test]
    fn transfer_rejects_overdraft_without_side_effects() {
        let mut state = WorldState::new();
        state.set_balance(ALICE, U256::from(1u8));
        let err = state.transfer(ALICE, BOB, U256::from(2u8)).unwrap_err();
        assert!(matches!(err, Revert::InsufficientBalance { .. }));
        assert_eq!(state.balance(ALICE), U256::from(1u8));
        assert_eq!(state.balance(BOB), U256::ZERO);
    }

    #[test]
    fn zero_store_clears_slot() {
        let mut state = WorldState::new();
        state.sstore(ALICE, slot(0), U256::from(7u8));
        assert_eq!(state.sload(ALICE, slot(0)), U256::from(7u8));
        state.sstore(ALICE, slot(0), U256::ZERO);
        assert_eq!(state.to_canonical_json()["accounts"].as_object().unwrap().len(), 0);
    }

    #[test]
    fn mapping_slot_matches_solidity_layout() {
        // keccak256(abi.encode(address(0), uint256(0)))
        let expected: B256 =
            "0xad3228b676f7d3cd4284a5443f17f1962b36e491b30a40b2405849e597ba5fb5"
                .parse()
                .unwrap();
        assert_eq!(mapping_slot(address_key(Address::ZERO), slot(0)), expected);
    }

    #[test]
    fn bump_nonce_returns_previous_value() {
        let mut state = WorldState::new();
        assert_eq!(state.bump_nonce(ALICE), 0);
        assert_eq!(state.bump_nonce(ALICE), 1);
        assert_eq!(state.nonce(ALICE), 2);
    }
}
