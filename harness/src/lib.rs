//! Gauntlet Harness: deterministic setup, single-shot attack, literal
//! verification.
//!
//! The harness runs a [`contract::Scenario`] against a fresh
//! [`gauntlet_ledger::vm::Ledger`] and packages the outcome as a
//! content-addressed [`report::ScenarioReport`].
//!
//! Scenarios touch contract state only through ledger transactions and
//! views. They never write storage directly; the only cheat they may use is
//! setting a native balance during setup.
//!
//! # Pipeline
//!
//! ```text
//! HarnessConfig::resolve() → Ledger::new() → fund dev signers
//!   → setup() → snapshot balances → execute() → enforce tx budget
//!   → verify() → snapshot balances → state_digest() → build_report()
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod actors;
pub mod config;
pub mod contract;
pub mod report;
pub mod report_dir;
pub mod runner;
pub mod scenarios;
