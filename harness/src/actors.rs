//! The first four accounts of the standard development mnemonic.
//!
//! Using the same signers as a local dev chain makes every CREATE address in
//! a scenario match the one a dev node would assign.

use alloy_primitives::{address, Address};

/// Signer 0. Deploys every target contract.
pub const DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
/// Signer 1.
pub const SIGNER_1: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
/// Signer 2.
pub const SIGNER_2: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
/// Signer 3.
pub const SIGNER_3: Address = address!("90F79bf6EB2c4f870365E785982E1f101E93b906");

/// Accounts funded at genesis, in signer order.
pub const DEV_SIGNERS: [Address; 4] = [DEPLOYER, SIGNER_1, SIGNER_2, SIGNER_3];
