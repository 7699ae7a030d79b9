//! Gauntlet Targets: intentionally vulnerable contracts, modelled in Rust.
//!
//! Each module holds one contract system: its selectors, its logic as a
//! [`gauntlet_ledger::contract::Contract`] implementation, and a `calls`
//! submodule with calldata builders for callers outside the contract.
//!
//! Contract logic touches state only through [`gauntlet_ledger::vm::Ledger`]:
//! storage reads and writes on its own address, and message calls to other
//! addresses. Nothing here knows about scenarios.
//!
//! # Module map
//!
//! - [`erc20`], [`dvt`], [`weth`] -- tokens sharing one storage layout
//! - [`external`], [`guard`] -- low-level call helpers and the reentrancy lock
//! - [`vault`] -- permissioned executor vault
//! - [`naive_receiver`], [`truster`], [`side_entrance`] -- flash-loan pools
//! - [`uniswap_v1`], [`uniswap_v2`] -- constant-product exchanges
//! - [`puppet`], [`puppet_v2`] -- lending pools priced by those exchanges

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod dvt;
pub mod erc20;
pub mod external;
pub mod guard;
pub mod naive_receiver;
pub mod puppet;
pub mod puppet_v2;
pub mod side_entrance;
pub mod truster;
pub mod uniswap_v1;
pub mod uniswap_v2;
pub mod vault;
pub mod weth;
