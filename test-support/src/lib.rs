//! Testkit for the stakeboard workspace. Wires the in-memory store each
//! crate already keeps behind `#[cfg(test)]` into one fully-functional,
//! database-free `World` so integration tests can drive the Registry,
//! Ledger, Matchmaker, Match Runtime and Payment Orchestrator together,
//! the way `race-test`'s `context_helpers` build a full game context
//! for the teacher's handler tests.

mod sms;

pub use sms::CapturingSms;

use std::sync::Arc;

use stakeboard_ledger::Ledger;
use stakeboard_match_runtime::MatchRegistry;
use stakeboard_matchmaker::Matchmaker;
use stakeboard_payment::{FakeProvider, MemoryPaymentStore, MemoryWithdrawalStore, PaymentOrchestrator};
use stakeboard_registry::Registry;

/// A complete set of services, each backed by its crate's in-memory
/// store, sharing a single ledger the way `AppState::build` shares one
/// behind real Postgres connections.
pub struct World {
    pub ledger: Ledger,
    pub registry: Registry,
    pub matchmaker: Arc<Matchmaker>,
    pub match_registry: Arc<MatchRegistry>,
    pub payment: Arc<PaymentOrchestrator>,
    pub sms: Arc<CapturingSms>,
}

impl World {
    pub fn new() -> World {
        let ledger = Ledger::new(Arc::new(stakeboard_ledger::MemoryLedgerStore::default()));
        let registry_store = Arc::new(stakeboard_registry::memory::MemoryRegistryStore::default());
        let sms = Arc::new(CapturingSms::default());
        let registry = Registry::new(registry_store.clone(), sms.clone(), Default::default());

        let match_store = Arc::new(stakeboard_match_runtime::memory::MemoryMatchStore::default());
        let matchmaker_store = Arc::new(stakeboard_matchmaker::memory::MemoryMatchmakerStore::default());
        let matchmaker = Arc::new(Matchmaker::new(matchmaker_store, match_store.clone(), ledger.clone(), Default::default()));
        let match_registry = Arc::new(MatchRegistry::new(match_store, ledger.clone(), registry_store, Default::default()));

        let payment = Arc::new(PaymentOrchestrator::new(
            Arc::new(MemoryPaymentStore::default()),
            Arc::new(MemoryWithdrawalStore::default()),
            ledger.clone(),
            Arc::new(FakeProvider),
            Arc::new(FakeProvider),
            0,
        ));

        World { ledger, registry, matchmaker, match_registry, payment, sms }
    }

    /// Registers a player with a phone, display name and PIN in one
    /// call, the common starting point for an end-to-end scenario.
    pub async fn seeded_player(&self, phone: &str, display_name: &str, pin: &str) -> stakeboard_core::types::Player {
        let player = self.registry.create_or_touch(phone, Some(display_name)).await.expect("create player");
        self.registry.set_pin(player.id, pin).await.expect("set pin");
        player
    }
}

impl Default for World {
    fn default() -> World {
        World::new()
    }
}
