//! Harness configuration and its auditable snapshot.
//!
//! Every field of [`HarnessConfig`] is optional; `None` takes the default.
//! The runner resolves the config once per run and commits the resolved
//! values into the report, so two reports with the same digest were
//! produced under the same chain parameters.

use alloy_primitives::U256;
use gauntlet_ledger::primitives::ether;
use gauntlet_ledger::proof::canon::{canonical_json_bytes, CanonError};
use gauntlet_ledger::proof::hash::{canonical_hash, ContentHash};
use gauntlet_ledger::proof::hash_domain::HashDomain;
use gauntlet_ledger::vm::LedgerConfig;

/// Domain prefix for config snapshot hashing.
pub const DOMAIN_CONFIG_SNAPSHOT: HashDomain = HashDomain::ConfigSnapshot;

const DEFAULT_GENESIS_BALANCE_ETHER: u64 = 10_000;

/// Overrides for a harness run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Nested call frames allowed. `None` uses the ledger default (1024).
    pub max_call_depth: Option<usize>,
    /// Native balance of each dev signer at genesis. `None` is 10 000 ETH.
    pub genesis_balance: Option<U256>,
    /// Timestamp of block 0. `None` uses the ledger default.
    pub genesis_timestamp: Option<u64>,
    /// Seconds per mined block. `None` uses the ledger default.
    pub block_interval_secs: Option<u64>,
    /// Replaces the scenario's own player-transaction budget.
    pub player_transaction_budget: Option<u64>,
}

/// Config with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub ledger: LedgerConfig,
    pub genesis_balance: U256,
    pub player_transaction_budget: Option<u64>,
}

impl HarnessConfig {
    /// Fill defaults. `scenario_budget` applies unless overridden.
    #[must_use]
    pub fn resolve(&self, scenario_budget: Option<u64>) -> ResolvedConfig {
        let defaults = LedgerConfig::default();
        ResolvedConfig {
            ledger: LedgerConfig {
                max_call_depth: self.max_call_depth.unwrap_or(defaults.max_call_depth),
                genesis_timestamp: self
                    .genesis_timestamp
                    .unwrap_or(defaults.genesis_timestamp),
                block_interval_secs: self
                    .block_interval_secs
                    .unwrap_or(defaults.block_interval_secs),
            },
            genesis_balance: self
                .genesis_balance
                .unwrap_or_else(|| ether(DEFAULT_GENESIS_BALANCE_ETHER)),
            player_transaction_budget: self.player_transaction_budget.or(scenario_budget),
        }
    }
}

impl ResolvedConfig {
    /// Canonical JSON projection. The 256-bit balance is a decimal string.
    #[must_use]
    pub fn to_canonical_json(&self) -> serde_json::Value {
        serde_json::json!({
            "block_interval_secs": self.ledger.block_interval_secs,
            "determinism_contract": {
                "fixed_genesis": true,
                "no_env_reads": true,
                "no_randomness": true,
                "no_wall_time": true,
            },
            "genesis_balance": self.genesis_balance.to_string(),
            "genesis_timestamp": self.ledger.genesis_timestamp,
            "max_call_depth": self.ledger.max_call_depth,
            "player_transaction_budget": self.player_transaction_budget,
            "schema_version": "harness_config.v1",
        })
    }

    /// Content hash of the canonical snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if the snapshot cannot be canonicalized.
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = canonical_json_bytes(&self.to_canonical_json())?;
        Ok(canonical_hash(DOMAIN_CONFIG_SNAPSHOT, &bytes))
    }
}
