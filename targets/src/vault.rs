//! Self-authorized vault: a token vault whose privileged functions may only
//! be reached through its own permissioned `execute` entry point.
//!
//! # Permission model
//!
//! A permission is the id `keccak256(selector ‖ executor ‖ target)` over the
//! packed 4 + 20 + 20 bytes. `setPermissions` stores a list of ids exactly
//! once. `execute(target, actionData)` then checks the id built from
//! `msg.sender`, `target` and the selector found at calldata offset
//! `4 + 32 * 3`, requires `target` to be the vault itself, and forwards
//! `actionData` as a call from the vault.
//!
//! The selector check reads a fixed calldata position, while the forwarded
//! payload is located through its ABI offset word. Nothing ties the two
//! together.
//!
//! # Storage
//!
//! | slot | field |
//! |---|---|
//! | 0 | reentrancy lock |
//! | 1 | `initialized` |
//! | 2 | `permissions[id]` |
//! | 3 | last withdrawal timestamp |

use alloy_primitives::{keccak256, Address, B256, U256};
use gauntlet_ledger::abi::{
    calldata_load, encode_bool, encode_bytes32, encode_uint, split_call, AbiDecoder, AbiEncoder,
    Selector, WORD,
};
use gauntlet_ledger::contract::{Contract, Frame};
use gauntlet_ledger::primitives::one_ether;
use gauntlet_ledger::revert::{authorize, ensure, CallResult, Revert};
use gauntlet_ledger::state::{mapping_slot, slot};
use gauntlet_ledger::vm::Ledger;

use crate::erc20;
use crate::external::function_call;
use crate::guard::non_reentrant;

/// `execute(address,bytes)`
pub const EXECUTE: Selector = Selector::new([0x1c, 0xff, 0x79, 0xcd]);
/// `withdraw(address,address,uint256)`
pub const WITHDRAW: Selector = Selector::new([0xd9, 0xca, 0xed, 0x12]);
/// `sweepFunds(address,address)`
pub const SWEEP_FUNDS: Selector = Selector::new([0x85, 0xfb, 0x70, 0x9d]);
/// `setPermissions(bytes32[])`
pub const SET_PERMISSIONS: Selector = Selector::new([0xae, 0xab, 0xae, 0x6b]);
/// `getActionId(bytes4,address,address)`
pub const GET_ACTION_ID: Selector = Selector::new([0x3e, 0x15, 0x24, 0x99]);
/// `permissions(bytes32)`
pub const PERMISSIONS: Selector = Selector::new([0xb4, 0xd2, 0x38, 0x8f]);
/// `initialized()`
pub const INITIALIZED: Selector = Selector::new([0x15, 0x8e, 0xf9, 0x3e]);
/// `getLastWithdrawalTimestamp()`
pub const GET_LAST_WITHDRAWAL_TIMESTAMP: Selector = Selector::new([0x26, 0x6d, 0xf7, 0x82]);
/// `getWithdrawalLimit()`
pub const GET_WITHDRAWAL_LIMIT: Selector = Selector::new([0xb7, 0x3d, 0xfa, 0xdd]);
/// `getWaitingPeriod()`
pub const GET_WAITING_PERIOD: Selector = Selector::new([0xdc, 0xdb, 0x7d, 0xae]);

/// Calldata offset `execute` reads the permission selector from.
pub const ACTION_SELECTOR_OFFSET: usize = 4 + WORD * 3;

/// Seconds that must pass between two withdrawals (15 days).
pub const WAITING_PERIOD: u64 = 15 * 24 * 60 * 60;

const LOCK_SLOT: u64 = 0;
const INITIALIZED_SLOT: u64 = 1;
const PERMISSIONS_SLOT: u64 = 2;
const LAST_WITHDRAWAL_SLOT: u64 = 3;

/// Largest amount a single `withdraw` may move (1 token unit at 18 decimals).
#[must_use]
pub fn withdrawal_limit() -> U256 {
    one_ether()
}

/// `keccak256(abi.encodePacked(selector, executor, target))`.
#[must_use]
pub fn action_id(selector: Selector, executor: Address, target: Address) -> B256 {
    let mut packed = [0u8; 4 + 20 + 20];
    packed[..4].copy_from_slice(&selector.as_bytes());
    packed[4..24].copy_from_slice(executor.as_slice());
    packed[24..].copy_from_slice(target.as_slice());
    keccak256(packed)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelfAuthorizedVault;

impl SelfAuthorizedVault {
    fn permitted(vm: &Ledger, this: Address, id: B256) -> bool {
        !vm.sload(this, mapping_slot(id, slot(PERMISSIONS_SLOT))).is_zero()
    }

    fn execute(
        vm: &mut Ledger,
        frame: &Frame,
        input: &[u8],
        args: AbiDecoder<'_>,
    ) -> CallResult<Vec<u8>> {
        let this = frame.address;
        let target = args.address(0)?;
        let action_data = args.bytes(1)?;
        let word = calldata_load(input, ACTION_SELECTOR_OFFSET);
        let selector = Selector::new([word[0], word[1], word[2], word[3]]);
        authorize(
            Self::permitted(vm, this, action_id(selector, frame.caller, target)),
            "NotAllowed",
        )?;
        authorize(target == this, "TargetNotAllowed")?;
        let returned = function_call(vm, this, target, action_data)?;
        Ok(AbiEncoder::new().bytes(&returned).finish())
    }

    fn withdraw(
        vm: &mut Ledger,
        frame: &Frame,
        token: Address,
        recipient: Address,
        amount: U256,
    ) -> CallResult<()> {
        let this = frame.address;
        authorize(frame.caller == this, "CallerNotAllowed")?;
        ensure(amount <= withdrawal_limit(), "InvalidWithdrawalAmount")?;
        let last = vm.sload(this, slot(LAST_WITHDRAWAL_SLOT));
        ensure(
            U256::from(vm.timestamp()) > last.saturating_add(U256::from(WAITING_PERIOD)),
            "WithdrawalWaitingPeriodNotEnded",
        )?;
        vm.sstore(this, slot(LAST_WITHDRAWAL_SLOT), U256::from(vm.timestamp()));
        erc20::safe_transfer(vm, this, token, recipient, amount)
    }

    fn sweep_funds(
        vm: &mut Ledger,
        frame: &Frame,
        receiver: Address,
        token: Address,
    ) -> CallResult<()> {
        let this = frame.address;
        authorize(frame.caller == this, "CallerNotAllowed")?;
        let balance = erc20::balance_of(vm, token, this)?;
        erc20::safe_transfer(vm, this, token, receiver, balance)
    }
}

impl Contract for SelfAuthorizedVault {
    fn name(&self) -> &'static str {
        "SelfAuthorizedVault"
    }

    fn construct(&self, vm: &mut Ledger, frame: &Frame) -> CallResult<()> {
        frame.non_payable(self.name())?;
        let now = U256::from(vm.timestamp());
        vm.sstore(frame.address, slot(LAST_WITHDRAWAL_SLOT), now);
        Ok(())
    }

    fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
        let Some((selector, args)) = split_call(input) else {
            return Err(Revert::NotPayable {
                contract: self.name(),
            });
        };
        frame.non_payable(self.name())?;
        let this = frame.address;
        match selector {
            EXECUTE => non_reentrant(vm, this, slot(LOCK_SLOT), |vm| {
                Self::execute(vm, frame, input, args)
            }),
            WITHDRAW => {
                let (token, recipient, amount) =
                    (args.address(0)?, args.address(1)?, args.uint(2)?);
                Self::withdraw(vm, frame, token, recipient, amount)?;
                Ok(Vec::new())
            }
            SWEEP_FUNDS => {
                Self::sweep_funds(vm, frame, args.address(0)?, args.address(1)?)?;
                Ok(Vec::new())
            }
            SET_PERMISSIONS => {
                let ids = args.bytes32_array(0)?;
                ensure(
                    vm.sload(this, slot(INITIALIZED_SLOT)).is_zero(),
                    "AlreadyInitialized",
                )?;
                for id in ids {
                    vm.sstore(this, mapping_slot(id, slot(PERMISSIONS_SLOT)), U256::from(1u8));
                }
                vm.sstore(this, slot(INITIALIZED_SLOT), U256::from(1u8));
                Ok(Vec::new())
            }
            GET_ACTION_ID => Ok(encode_bytes32(action_id(
                args.selector(0)?,
                args.address(1)?,
                args.address(2)?,
            ))),
            PERMISSIONS => Ok(encode_bool(Self::permitted(vm, this, args.bytes32(0)?))),
            INITIALIZED => Ok(encode_bool(!vm.sload(this, slot(INITIALIZED_SLOT)).is_zero())),
            GET_LAST_WITHDRAWAL_TIMESTAMP => {
                Ok(encode_uint(vm.sload(this, slot(LAST_WITHDRAWAL_SLOT))))
            }
            GET_WITHDRAWAL_LIMIT => Ok(encode_uint(withdrawal_limit())),
            GET_WAITING_PERIOD => Ok(encode_uint(U256::from(WAITING_PERIOD))),
            _ => Err(Revert::UnknownSelector {
                contract: self.name(),
                selector,
            }),
        }
    }
}

pub mod calls {
    use alloy_primitives::{Address, B256, U256};
    use gauntlet_ledger::abi::{AbiEncoder, Selector};

    /// Standard encoding of `execute(target, actionData)`.
    #[must_use]
    pub fn execute(target: Address, action_data: &[u8]) -> Vec<u8> {
        AbiEncoder::call(super::EXECUTE)
            .address(target)
            .bytes(action_data)
            .finish()
    }

    #[must_use]
    pub fn withdraw(token: Address, recipient: Address, amount: U256) -> Vec<u8> {
        AbiEncoder::call(super::WITHDRAW)
            .address(token)
            .address(recipient)
            .uint(amount)
            .finish()
    }

    #[must_use]
    pub fn sweep_funds(receiver: Address, token: Address) -> Vec<u8> {
        AbiEncoder::call(super::SWEEP_FUNDS)
            .address(receiver)
            .address(token)
            .finish()
    }

    #[must_use]
    pub fn set_permissions(ids: &[B256]) -> Vec<u8> {
        AbiEncoder::call(super::SET_PERMISSIONS)
            .bytes32_array(ids)
            .finish()
    }

    #[must_use]
    pub fn get_action_id(selector: Selector, executor: Address, target: Address) -> Vec<u8> {
        AbiEncoder::call(super::GET_ACTION_ID)
            .selector(selector)
            .address(executor)
            .address(target)
            .finish()
    }

    #[must_use]
    pub fn permissions(id: B256) -> Vec<u8> {
        AbiEncoder::call(super::PERMISSIONS).bytes32(id).finish()
    }

    #[must_use]
    pub fn initialized() -> Vec<u8> {
        AbiEncoder::call(super::INITIALIZED).finish()
    }

    #[must_use]
    pub fn get_last_withdrawal_timestamp() -> Vec<u8> {
        AbiEncoder::call(super::GET_LAST_WITHDRAWAL_TIMESTAMP).finish()
    }
}
