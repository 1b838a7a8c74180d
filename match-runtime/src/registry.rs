//! `MatchRegistry`: the in-process map of live match workers, mirroring
//! the teacher's `GameManager` (`games: Arc<Mutex<HashMap<String,
//! Handle>>>`, load-idempotent, wait-and-unload cleanup task on
//! completion).

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use stakeboard_core::types::MatchId;
use stakeboard_ledger::Ledger;
use stakeboard_registry::RegistryStore;

use crate::actor::{spawn, MatchHandle, RuntimeConfig};
use crate::store::MatchStore;

pub struct MatchRegistry {
    matches: Arc<Mutex<HashMap<MatchId, MatchHandle>>>,
    match_store: Arc<dyn MatchStore>,
    ledger: Ledger,
    registry_store: Arc<dyn RegistryStore>,
    config: RuntimeConfig,
}

impl MatchRegistry {
    pub fn new(match_store: Arc<dyn MatchStore>, ledger: Ledger, registry_store: Arc<dyn RegistryStore>, config: RuntimeConfig) -> Self {
        Self { matches: Arc::new(Mutex::new(HashMap::new())), match_store, ledger, registry_store, config }
    }

    /// Returns the running worker's handle, spawning one if this match
    /// isn't loaded yet. Idempotent: concurrent callers racing the same
    /// never-loaded match both get the same handle.
    pub async fn load_or_spawn(&self, match_id: MatchId) -> MatchHandle {
        let mut matches = self.matches.lock().await;
        match matches.entry(match_id) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(e) => {
                let (handle, join) = spawn(match_id, self.match_store.clone(), self.ledger.clone(), self.registry_store.clone(), self.config);
                e.insert(handle.clone());
                wait_and_unload(match_id, join, self.matches.clone());
                handle
            }
        }
    }

    pub async fn get(&self, match_id: MatchId) -> Option<MatchHandle> {
        self.matches.lock().await.get(&match_id).cloned()
    }
}

/// Mirrors the teacher's `wait_and_unload`: awaits the worker's join
/// handle, then removes it from the map so the next `load_or_spawn`
/// for that match id spawns a fresh worker instead of handing out a
/// dead one.
fn wait_and_unload(match_id: MatchId, join: tokio::task::JoinHandle<()>, matches: Arc<Mutex<HashMap<MatchId, MatchHandle>>>) {
    tokio::spawn(async move {
        if let Err(e) = join.await {
            info!("match {match_id}: worker task panicked: {e}");
        }
        matches.lock().await.remove(&match_id);
        info!("match {match_id}: worker exited, unloaded from registry");
    });
}
