//! Shared helpers for gauntlet benchmark suites.

use gauntlet_harness::actors::DEV_SIGNERS;
use gauntlet_harness::config::HarnessConfig;
use gauntlet_harness::contract::Scenario;
use gauntlet_harness::scenarios::{
    abi_smuggling::AbiSmuggling, naive_receiver::NaiveReceiver, puppet::Puppet,
    puppet_v2::PuppetV2, side_entrance::SideEntrance, truster::Truster, ScenarioId,
};
use gauntlet_ledger::vm::Ledger;

/// A scenario whose setup has already run, so the attack alone can be timed.
pub trait PreparedAttack {
    fn id(&self) -> &'static str;

    /// Execute and verify the attack on a copy of the post-setup ledger.
    /// Returns the player's transaction count for the attack.
    ///
    /// # Panics
    ///
    /// Panics if the attack or its verification fails. Benchmark failures
    /// are fatal.
    fn run_attack(&self) -> u64;
}

struct Prepared<S: Scenario> {
    scenario: S,
    ledger: Ledger,
    fixture: S::Fixture,
}

impl<S> PreparedAttack for Prepared<S>
where
    S: Scenario,
    S::Fixture: Clone,
{
    fn id(&self) -> &'static str {
        self.scenario.id()
    }

    fn run_attack(&self) -> u64 {
        let mut ledger = self.ledger.clone();
        let mut fixture = self.fixture.clone();
        let player = self.scenario.player();
        let before = ledger.transaction_count(player);
        self.scenario
            .execute(&mut ledger, &mut fixture)
            .unwrap_or_else(|e| panic!("{}: {e}", self.scenario.id()));
        self.scenario
            .verify(&ledger, &fixture)
            .unwrap_or_else(|e| panic!("{}: {e}", self.scenario.id()));
        ledger.transaction_count(player) - before
    }
}

/// Fund the dev signers and run `scenario`'s setup, as the runner does.
///
/// # Panics
///
/// Panics if setup fails.
fn prepare<S>(scenario: S, config: &HarnessConfig) -> Box<dyn PreparedAttack>
where
    S: Scenario + 'static,
    S::Fixture: Clone + 'static,
{
    let resolved = config.resolve(scenario.player_transaction_budget());
    let mut ledger = Ledger::new(resolved.ledger);
    for signer in DEV_SIGNERS {
        ledger.set_balance(signer, resolved.genesis_balance);
    }
    let fixture = scenario
        .setup(&mut ledger)
        .unwrap_or_else(|e| panic!("{}: {e}", scenario.id()));
    Box::new(Prepared {
        scenario,
        ledger,
        fixture,
    })
}

/// Post-setup state for one registered scenario.
///
/// # Panics
///
/// Panics if setup fails.
#[must_use]
pub fn prepare_attack(id: ScenarioId, config: &HarnessConfig) -> Box<dyn PreparedAttack> {
    match id {
        ScenarioId::AbiSmuggling => prepare(AbiSmuggling, config),
        ScenarioId::NaiveReceiver => prepare(NaiveReceiver, config),
        ScenarioId::Puppet => prepare(Puppet, config),
        ScenarioId::PuppetV2 => prepare(PuppetV2, config),
        ScenarioId::SideEntrance => prepare(SideEntrance, config),
        ScenarioId::Truster => prepare(Truster, config),
    }
}

/// Receipts in a finished report, for sizing the serialized output.
#[must_use]
pub fn receipt_count(report_bytes: &[u8]) -> usize {
    serde_json::from_slice::<serde_json::Value>(report_bytes)
        .ok()
        .and_then(|value| value["receipts"].as_array().map(Vec::len))
        .unwrap_or(0)
}
