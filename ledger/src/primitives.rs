//! Units and address derivation.

use alloy_primitives::{Address, U256};

/// Wei per ether (10^18).
pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// `amount` whole ether (or whole 18-decimal tokens) in wei.
#[must_use]
pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(WEI_PER_ETHER)
}

/// 10^18 as a `U256`; the fixed-point unit used by price oracles.
#[must_use]
pub fn one_ether() -> U256 {
    U256::from(WEI_PER_ETHER)
}

/// Address of a contract created with `CREATE` by `deployer` at `nonce`:
/// `keccak256(rlp([deployer, nonce]))[12..]`.
#[must_use]
pub fn create_address(deployer: Address, nonce: u64) -> Address {
    deployer.create(nonce)
}
