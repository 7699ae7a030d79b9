//! Gauntlet Ledger: the deterministic execution environment scenarios run against.
//!
//! # API Surface
//!
//! - [`vm::Ledger`] -- accounts, storage, blocks, transactions and nested message calls
//! - [`contract::Contract`] -- the trait target contracts implement
//! - [`abi`] -- Solidity ABI encoding/decoding for calldata and return data
//! - [`proof`] -- canonical JSON and domain-separated SHA-256 digests
//!
//! # Module Dependency Direction
//!
//! `primitives`, `revert`, `math` ← `abi` ← `state` ← `contract`/`vm` ← `proof`
//!
//! The ledger knows nothing about specific contracts or scenarios.
//! Every state change made by contract code goes through [`vm::Ledger`], and
//! every call frame is atomic: a revert restores the state captured when the
//! frame was entered.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod abi;
pub mod contract;
pub mod math;
pub mod primitives;
pub mod proof;
pub mod revert;
pub mod state;
pub mod vm;

pub use alloy_primitives::{address, Address, B256, U256};
