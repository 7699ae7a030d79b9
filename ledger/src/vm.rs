//! The ledger: a deterministic, single-threaded execution environment.
//!
//! # Transactions
//!
//! [`Ledger::send`] and [`Ledger::deploy`] are top-level transactions. Each
//! one bumps the sender's nonce, mines a block (advancing the timestamp by
//! [`LedgerConfig::block_interval_secs`]) and records a [`Receipt`], whether
//! it succeeds or reverts.
//!
//! # Call frames
//!
//! [`Ledger::call`] and [`Ledger::create`] are the message-call primitives
//! contract code uses. Every frame captures the world state on entry and
//! restores it if the frame reverts, so a caught revert leaves no partial
//! effects and an uncaught one unwinds the whole transaction.

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use tracing::debug;

use crate::contract::{Contract, Frame};
use crate::primitives::create_address;
use crate::proof::canon::{canonical_json_bytes, CanonError};
use crate::proof::hash::{canonical_hash, ContentHash};
use crate::proof::hash_domain::HashDomain;
use crate::revert::{CallResult, Revert};
use crate::state::WorldState;

const DEFAULT_MAX_CALL_DEPTH: usize = 1024;
const DEFAULT_GENESIS_TIMESTAMP: u64 = 1_700_000_000;
const DEFAULT_BLOCK_INTERVAL_SECS: u64 = 1;

/// Chain parameters fixed for the lifetime of a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Nested frames allowed before a call reverts with
    /// [`Revert::CallDepthExceeded`].
    pub max_call_depth: usize,
    /// Timestamp of block 0.
    pub genesis_timestamp: u64,
    /// Seconds added to the timestamp by every mined block.
    pub block_interval_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            genesis_timestamp: DEFAULT_GENESIS_TIMESTAMP,
            block_interval_secs: DEFAULT_BLOCK_INTERVAL_SECS,
        }
    }
}

/// Outcome of a top-level transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Reverted(Revert),
}

/// Record of one top-level transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Position in the ledger's transaction history.
    pub index: usize,
    pub from: Address,
    /// Destination of a message call; `None` for deployments.
    pub to: Option<Address>,
    /// Address of the deployed contract, if the deployment succeeded.
    pub created: Option<Address>,
    pub block_number: u64,
    pub status: TxStatus,
    /// Return data of a successful call.
    pub output: Vec<u8>,
}

impl Receipt {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    /// Canonical JSON projection (addresses as lowercase hex).
    #[must_use]
    pub fn to_canonical_json(&self) -> serde_json::Value {
        let hex_address = |a: Address| format!("0x{}", hex::encode(a));
        let status = match &self.status {
            TxStatus::Success => "success".to_string(),
            TxStatus::Reverted(revert) => format!("reverted: {revert}"),
        };
        serde_json::json!({
            "block_number": self.block_number,
            "created": self.created.map(hex_address),
            "from": hex_address(self.from),
            "index": self.index,
            "output": format!("0x{}", hex::encode(&self.output)),
            "status": status,
            "to": self.to.map(hex_address),
        })
    }
}

/// Accounts, storage, block environment and transaction history.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    state: WorldState,
    block_number: u64,
    timestamp: u64,
    depth: usize,
    origin: Address,
    receipts: Vec<Receipt>,
}

impl Ledger {
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            timestamp: config.genesis_timestamp,
            config,
            state: WorldState::new(),
            block_number: 0,
            depth: 0,
            origin: Address::ZERO,
            receipts: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    // -----------------------------------------------------------------------
    // Accounts and storage
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn balance(&self, address: Address) -> U256 {
        self.state.balance(address)
    }

    /// Overwrite a native balance. Genesis allocation only; contract code
    /// moves value through [`Ledger::call`].
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.state.set_balance(address, balance);
    }

    #[must_use]
    pub fn nonce(&self, address: Address) -> u64 {
        self.state.nonce(address)
    }

    /// Top-level transactions sent by `address`.
    #[must_use]
    pub fn transaction_count(&self, address: Address) -> u64 {
        self.state.nonce(address)
    }

    /// Name of the contract deployed at `address`, if any.
    #[must_use]
    pub fn code_name(&self, address: Address) -> Option<&'static str> {
        self.state.code(address).map(|code| code.name())
    }

    #[must_use]
    pub fn sload(&self, address: Address, key: B256) -> U256 {
        self.state.sload(address, key)
    }

    pub fn sstore(&mut self, address: Address, key: B256, value: U256) {
        self.state.sstore(address, key, value);
    }

    /// An `address` stored in the low 20 bytes of a slot.
    #[must_use]
    pub fn sload_address(&self, address: Address, key: B256) -> Address {
        let word = self.sload(address, key).to_be_bytes::<32>();
        Address::from_word(B256::from(word))
    }

    pub fn sstore_address(&mut self, address: Address, key: B256, value: Address) {
        let word = U256::from_be_bytes(value.into_word().0);
        self.sstore(address, key, word);
    }

    // -----------------------------------------------------------------------
    // Block environment
    // -----------------------------------------------------------------------

    /// `block.timestamp` of the current block.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Set the timestamp of the current block. Time never moves backwards.
    pub fn warp(&mut self, timestamp: u64) {
        self.timestamp = self.timestamp.max(timestamp);
    }

    /// Advance the current block's timestamp by `seconds`.
    pub fn advance_time(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
    }

    fn mine_block(&mut self) {
        self.block_number += 1;
        self.timestamp = self
            .timestamp
            .saturating_add(self.config.block_interval_secs);
    }

    #[must_use]
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    // -----------------------------------------------------------------------
    // Top-level transactions
    // -----------------------------------------------------------------------

    /// Send a message-call transaction from `from`.
    ///
    /// # Errors
    ///
    /// Returns the revert that aborted the transaction. The sender's nonce
    /// is still incremented and a reverted receipt is recorded.
    pub fn send(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        input: &[u8],
    ) -> CallResult<Receipt> {
        self.state.bump_nonce(from);
        self.mine_block();
        self.origin = from;
        let result = self.call(from, to, value, input);
        let (status, output) = match &result {
            Ok(output) => (TxStatus::Success, output.clone()),
            Err(revert) => (TxStatus::Reverted(revert.clone()), Vec::new()),
        };
        let receipt = self.record(from, Some(to), None, status, output);
        result.map(|_| receipt)
    }

    /// Send a contract-creation transaction from `from`.
    ///
    /// # Errors
    ///
    /// Returns the revert raised by the constructor (or by the value
    /// transfer). The sender's nonce is still incremented.
    pub fn deploy(
        &mut self,
        from: Address,
        code: Arc<dyn Contract>,
        value: U256,
    ) -> CallResult<Address> {
        self.mine_block();
        self.origin = from;
        let result = self.create(from, code, value);
        let status = match &result {
            Ok(_) => TxStatus::Success,
            Err(revert) => TxStatus::Reverted(revert.clone()),
        };
        self.record(from, None, result.as_ref().ok().copied(), status, Vec::new());
        result
    }

    fn record(
        &mut self,
        from: Address,
        to: Option<Address>,
        created: Option<Address>,
        status: TxStatus,
        output: Vec<u8>,
    ) -> Receipt {
        let receipt = Receipt {
            index: self.receipts.len(),
            from,
            to,
            created,
            block_number: self.block_number,
            status,
            output,
        };
        self.receipts.push(receipt.clone());
        receipt
    }

    /// Read-only call from the zero address. Every effect is discarded.
    ///
    /// # Errors
    ///
    /// Returns the revert raised by the callee.
    pub fn view(&self, to: Address, input: &[u8]) -> CallResult<Vec<u8>> {
        let mut scratch = Ledger {
            config: self.config.clone(),
            state: self.state.clone(),
            block_number: self.block_number,
            timestamp: self.timestamp,
            depth: 0,
            origin: Address::ZERO,
            receipts: Vec::new(),
        };
        scratch.call(Address::ZERO, to, U256::ZERO, input)
    }

    // -----------------------------------------------------------------------
    // Call frames
    // -----------------------------------------------------------------------

    /// Message call from `caller` to `to`, transferring `value` wei.
    ///
    /// A call to an address without code is a plain value transfer.
    ///
    /// # Errors
    ///
    /// Returns the callee's revert (state already restored), or
    /// [`Revert::CallDepthExceeded`] past the configured depth.
    pub fn call(
        &mut self,
        caller: Address,
        to: Address,
        value: U256,
        input: &[u8],
    ) -> CallResult<Vec<u8>> {
        self.enter_frame()?;
        let checkpoint = self.state.clone();
        let result = self.execute_call(caller, to, value, input);
        self.depth -= 1;
        if let Err(revert) = &result {
            debug!(depth = self.depth, %caller, %to, %revert, "call frame reverted");
            self.state = checkpoint;
        }
        result
    }

    fn execute_call(
        &mut self,
        caller: Address,
        to: Address,
        value: U256,
        input: &[u8],
    ) -> CallResult<Vec<u8>> {
        self.state.transfer(caller, to, value)?;
        let Some(code) = self.state.code(to) else {
            return Ok(Vec::new());
        };
        let frame = Frame {
            caller,
            address: to,
            value,
            origin: self.origin,
        };
        code.call(self, &frame, input)
    }

    /// `CREATE` from `deployer`: derive the address from the deployer's
    /// nonce, install `code`, transfer `value` and run the constructor.
    ///
    /// The deployer's nonce is consumed even if the constructor reverts.
    ///
    /// # Errors
    ///
    /// Returns the constructor's revert (state already restored).
    pub fn create(
        &mut self,
        deployer: Address,
        code: Arc<dyn Contract>,
        value: U256,
    ) -> CallResult<Address> {
        self.enter_frame()?;
        let nonce = self.state.bump_nonce(deployer);
        let address = create_address(deployer, nonce);
        let checkpoint = self.state.clone();
        let result = self.execute_create(deployer, address, code, value);
        self.depth -= 1;
        match result {
            Ok(()) => {
                debug!(%deployer, %address, name = self.code_name(address), "contract deployed");
                Ok(address)
            }
            Err(revert) => {
                debug!(%deployer, %address, %revert, "deployment reverted");
                self.state = checkpoint;
                Err(revert)
            }
        }
    }

    fn execute_create(
        &mut self,
        deployer: Address,
        address: Address,
        code: Arc<dyn Contract>,
        value: U256,
    ) -> CallResult<()> {
        if self.state.code(address).is_some() {
            return Err(Revert::message("contract address collision"));
        }
        self.state.transfer(deployer, address, value)?;
        self.state.install_code(address, Arc::clone(&code));
        let frame = Frame {
            caller: deployer,
            address,
            value,
            origin: self.origin,
        };
        code.construct(self, &frame)
    }

    fn enter_frame(&mut self) -> CallResult<()> {
        if self.depth >= self.config.max_call_depth {
            return Err(Revert::CallDepthExceeded { depth: self.depth });
        }
        self.depth += 1;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Digest
    // -----------------------------------------------------------------------

    /// Domain-separated SHA-256 over the canonical JSON of the world state
    /// and block environment.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if the projection cannot be canonicalized.
    pub fn state_digest(&self) -> Result<ContentHash, CanonError> {
        let value = serde_json::json!({
            "block_number": self.block_number,
            "timestamp": self.timestamp,
            "world": self.state.to_canonical_json(),
        });
        let bytes = canonical_json_bytes(&value)?;
        Ok(canonical_hash(HashDomain::WorldState, &bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{decode_uint, split_call, AbiEncoder, Selector};
    use crate::revert::require;
    use crate::state::slot;
    use alloy_primitives::address;

    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0000000000000000000000000000000000000b0b");

    /// Stores into slot 0, optionally reverting afterwards; can also call
    /// another counter and swallow its revert.
    #[derive(Debug)]
    struct Counter;

    fn bump() -> Selector {
        Selector::of("bump()")
    }
    fn bump_then_fail() -> Selector {
        Selector::of("bumpThenFail()")
    }
    fn bump_and_poke(target: Address) -> Vec<u8> {
        AbiEncoder::call(Selector::of("bumpAndPoke(address)"))
            .address(target)
            .finish()
    }
    fn recurse() -> Selector {
        Selector::of("recurse()")
    }

    impl Contract for Counter {
        fn name(&self) -> &'static str {
            "Counter"
        }

        fn construct(&self, vm: &mut Ledger, frame: &Frame) -> CallResult<()> {
            require(frame.value < U256::from(100u8), "too rich")?;
            vm.sstore(frame.address, slot(1), U256::from(1u8));
            Ok(())
        }

        fn call(&self, vm: &mut Ledger, frame: &Frame, input: &[u8]) -> CallResult<Vec<u8>> {
            let Some((selector, args)) = split_call(input) else {
                return Ok(Vec::new());
            };
            let count = vm.sload(frame.address, slot(0));
            if selector == bump() {
                vm.sstore(frame.address, slot(0), count + U256::from(1u8));
            } else if selector == bump_then_fail() {
                vm.sstore(frame.address, slot(0), count + U256::from(1u8));
                return Err(Revert::message("nope"));
            } else if selector == Selector::of("bumpAndPoke(address)") {
                vm.sstore(frame.address, slot(0), count + U256::from(1u8));
                let target = args.address(0)?;
                let inner = vm.call(frame.address, target, U256::ZERO, &bump_then_fail().0);
                assert!(inner.is_err());
            } else if selector == recurse() {
                vm.call(frame.address, frame.address, U256::ZERO, &recurse().0)?;
            } else if selector == Selector::of("count()") {
                return Ok(crate::abi::encode_uint(count));
            }
            Ok(Vec::new())
        }
    }

    fn ledger_with_counters() -> (Ledger, Address, Address) {
        let mut vm = Ledger::new(LedgerConfig::default());
        vm.set_balance(ALICE, U256::from(1_000u64));
        let a = vm.deploy(ALICE, Arc::new(Counter), U256::ZERO).unwrap();
        let b = vm.deploy(ALICE, Arc::new(Counter), U256::ZERO).unwrap();
        (vm, a, b)
    }

    #[test]
    fn deploy_uses_create_derivation() {
        let (vm, a, b) = ledger_with_counters();
        assert_eq!(a, create_address(ALICE, 0));
        assert_eq!(b, create_address(ALICE, 1));
        assert_eq!(vm.code_name(a), Some("Counter"));
        assert_eq!(vm.nonce(a), 1);
        assert_eq!(vm.sload(a, slot(1)), U256::from(1u8));
    }

    #[test]
    fn caught_inner_revert_leaves_no_partial_state() {
        let (mut vm, a, b) = ledger_with_counters();
        vm.send(ALICE, a, U256::ZERO, &bump_and_poke(b)).unwrap();
        assert_eq!(vm.sload(a, slot(0)), U256::from(1u8));
        assert_eq!(vm.sload(b, slot(0)), U256::ZERO);
    }

    #[test]
    fn reverted_transaction_still_bumps_nonce() {
        let (mut vm, a, _) = ledger_with_counters();
        let before = vm.nonce(ALICE);
        let err = vm
            .send(ALICE, a, U256::from(5u8), &bump_then_fail().0)
            .unwrap_err();
        assert_eq!(err, Revert::message("nope"));
        assert_eq!(vm.nonce(ALICE), before + 1);
        assert_eq!(vm.sload(a, slot(0)), U256::ZERO);
        assert_eq!(vm.balance(a), U256::ZERO);
        let last = vm.receipts().last().unwrap();
        assert!(!last.is_success());
    }

    #[test]
    fn reverted_constructor_consumes_nonce_and_leaves_no_code() {
        let mut vm = Ledger::new(LedgerConfig::default());
        vm.set_balance(ALICE, U256::from(1_000u64));
        assert!(vm.deploy(ALICE, Arc::new(Counter), U256::from(500u64)).is_err());
        assert_eq!(vm.nonce(ALICE), 1);
        assert_eq!(vm.code_name(create_address(ALICE, 0)), None);
        assert_eq!(vm.balance(ALICE), U256::from(1_000u64));
    }

    #[test]
    fn unbounded_recursion_hits_depth_limit() {
        let mut vm = Ledger::new(LedgerConfig {
            max_call_depth: 8,
            ..LedgerConfig::default()
        });
        let a = vm.deploy(ALICE, Arc::new(Counter), U256::ZERO).unwrap();
        let err = vm.send(ALICE, a, U256::ZERO, &recurse().0).unwrap_err();
        assert_eq!(err, Revert::CallDepthExceeded { depth: 8 });
    }

    #[test]
    fn view_discards_effects() {
        let (vm, a, _) = ledger_with_counters();
        let digest = vm.state_digest().unwrap();
        vm.view(a, &bump().0).unwrap();
        assert_eq!(vm.state_digest().unwrap(), digest);
        let count = decode_uint(&vm.view(a, &Selector::of("count()").0).unwrap()).unwrap();
        assert_eq!(count, U256::ZERO);
    }

    #[test]
    fn every_transaction_mines_a_block() {
        let (mut vm, a, _) = ledger_with_counters();
        let (block, time) = (vm.block_number(), vm.timestamp());
        vm.send(ALICE, BOB, U256::from(1u8), &[]).unwrap();
        vm.send(ALICE, a, U256::ZERO, &bump().0).unwrap();
        assert_eq!(vm.block_number(), block + 2);
        assert_eq!(vm.timestamp(), time + 2);
        assert_eq!(vm.balance(BOB), U256::from(1u8));
        assert_eq!(vm.transaction_count(ALICE), 4);
        assert_eq!(vm.receipts().len(), 4);
    }

    #[test]
    fn identical_histories_have_identical_digests() {
        let (mut x, a, _) = ledger_with_counters();
        let (mut y, _, _) = ledger_with_counters();
        x.send(ALICE, a, U256::ZERO, &bump().0).unwrap();
        y.send(ALICE, a, U256::ZERO, &bump().0).unwrap();
        assert_eq!(x.state_digest().unwrap(), y.state_digest().unwrap());
        x.send(ALICE, a, U256::ZERO, &bump().0).unwrap();
        assert_ne!(x.state_digest().unwrap(), y.state_digest().unwrap());
    }
}
