//! Zero-fee DVT flash-loan pool that performs an arbitrary call for the
//! borrower.
//!
//! `flashLoan(amount, borrower, target, data)` lends `amount`, then calls
//! `target` with `data` *as the pool*, then checks only that its token
//! balance did not shrink. A zero-amount loan whose call is
//! `token.approve(attacker, balance)` passes that check and leaves a standing
//! allowance behind.

use alloy_primitives::{Address, U256};
use gauntlet_ledger::abi::{decode_address, encode_address, encode_bool, split_call, Selector};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::revert::{ensure, CallResult, Revert};
use gauntlet_ledger::state::slot;
use gauntlet_ledger::vm::Ledger;

use crate::erc20;
use crate::external::function_call;
use crate::guard::non_reentrant;

/// `flashLoan(uint256,address,address,bytes)`
pub const FLASH_LOAN: Selector = Selector::new([0xab, 0x19, 0xe0, 0xc0]);
/// `token()`
pub const TOKEN: Selector = Selector::new([0xfc, 0x0c, 0x54, 0x6a]);

const LOCK_SLOT: u64 = 0;

#[derive(Debug, Clone, Copy)]
pub struct TrusterLenderPool {
    pub token: Address,
}

impl TrusterLenderPool {
    fn flash_loan(
        &self,
        vm: &mut Ledger,
        this: Address,
        amount: U256,
        borrower: Address,
        target: Address,
        data: &[u8],
    ) -> CallResult<()> {
        let balance_before = erc20::balance_of(vm, self.token, this)?;
        erc20::transfer(vm, this, self.token, borrower, amount)?;
        function_call(vm, this, target, data)?;
        ensure(
            erc20::balance_of(vm, self.token, this)? >= balance_before,
            "RepayFailed",
        )
    }
}

impl Contract for TrusterLenderPool {
    fn name(&self) -> &'static str {
        "TrusterLenderPool"
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        let Some((selector, args)) = split_call(input) else {
            return Err(Revert::NotPayable {
                contract: self.name(),
            });
        };
        frame.non_payable(self.name())?;
        match selector {
            TOKEN => Ok(encode_address(self.token)),
            FLASH_LOAN => {
                let (amount, borrower, target) = (args.uint(0)?, args.address(1)?, args.address(2)?);
                let data = args.bytes(3)?;
                non_reentrant(vm, frame.address, slot(LOCK_SLOT), |vm| {
                    self.flash_loan(vm, frame.address, amount, borrower, target, data)
                })?;
                Ok(encode_bool(true))
            }
            _ => Err(Revert::UnknownSelector {
                contract: self.name(),
                selector,
            }),
        }
    }
}

pub mod calls {
    use alloy_primitives::{Address, U256};
    use gauntlet_ledger::abi::AbiEncoder;

    #[must_use]
    pub fn token() -> Vec<u8> {
        AbiEncoder::call(super::TOKEN).finish()
    }

    #[must_use]
    pub fn flash_loan(amount: U256, borrower: Address, target: Address, data: &[u8]) -> Vec<u8> {
        AbiEncoder::call(super::FLASH_LOAN)
            .uint(amount)
            .address(borrower)
            .address(target)
            .bytes(data)
            .finish()
    }
}

/// `pool.token()` as a read-only call.
///
/// # Errors
///
/// Returns the pool's revert or a decoding failure.
pub fn token(vm: &Ledger, pool: Address) -> CallResult<Address> {
    decode_address(&vm.view(pool, &calls::token())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dvt::DamnValuableToken;
    use gauntlet_ledger::address;
    use gauntlet_ledger::primitives::ether;
    use gauntlet_ledger::vm::LedgerConfig;
    use std::sync::Arc;

    const DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const PLAYER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

    fn world() -> (Ledger, Address, Address) {
        let mut vm = Ledger::new(LedgerConfig::default());
        let token = vm
            .deploy(DEPLOYER, Arc::new(DamnValuableToken), U256::ZERO)
            .unwrap();
        let pool = vm
            .deploy(DEPLOYER, Arc::new(TrusterLenderPool { token }), U256::ZERO)
            .unwrap();
        vm.send(DEPLOYER, token, U256::ZERO, &erc20::calls::transfer(pool, ether(1_000)))
            .unwrap();
        (vm, token, pool)
    }

    #[test]
    fn selectors_match_signatures() {
        assert_eq!(FLASH_LOAN, Selector::of("flashLoan(uint256,address,address,bytes)"));
        assert_eq!(TOKEN, Selector::of("token()"));
    }

    #[test]
    fn token_view() {
        let (vm, token_address, pool) = world();
        assert_eq!(token(&vm, pool).unwrap(), token_address);
    }

    #[test]
    fn unrepaid_loan_reverts() {
        let (mut vm, token, pool) = world();
        let loan = calls::flash_loan(ether(1), PLAYER, token, &erc20::calls::total_supply());
        let err = vm.send(PLAYER, pool, U256::ZERO, &loan).unwrap_err();
        assert_eq!(err.error_name(), Some("RepayFailed"));
        assert_eq!(erc20::balance_of(&vm, token, PLAYER).unwrap(), U256::ZERO);
    }

    #[test]
    fn arbitrary_call_runs_as_the_pool() {
        let (mut vm, token, pool) = world();
        let approve = erc20::calls::approve(PLAYER, ether(1_000));
        let loan = calls::flash_loan(U256::ZERO, PLAYER, token, &approve);
        vm.send(PLAYER, pool, U256::ZERO, &loan).unwrap();
        assert_eq!(erc20::allowance(&vm, token, pool, PLAYER).unwrap(), ether(1_000));
    }

    #[test]
    fn call_to_account_without_code_reverts() {
        let (mut vm, _, pool) = world();
        let loan = calls::flash_loan(U256::ZERO, PLAYER, PLAYER, &[]);
        assert!(vm.send(PLAYER, pool, U256::ZERO, &loan).is_err());
    }
}
