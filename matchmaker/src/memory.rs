//! In-memory `MatchmakerStore`, for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stakeboard_core::types::{Amount, PlayerId, QueueEntry, QueueEntryId, QueueMode, QueueStatus};
use stakeboard_core::{Error, Result};

use crate::store::MatchmakerStore;

struct State {
    entries: HashMap<QueueEntryId, QueueEntry>,
    by_token: HashMap<String, QueueEntryId>,
    by_match_code: HashMap<String, QueueEntryId>,
    pairings: HashMap<QueueEntryId, (String, String)>,
}

pub struct MemoryMatchmakerStore {
    state: Mutex<State>,
}

impl Default for MemoryMatchmakerStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                by_token: HashMap::new(),
                by_match_code: HashMap::new(),
                pairings: HashMap::new(),
            }),
        }
    }
}

#[async_trait]
impl MatchmakerStore for MemoryMatchmakerStore {
    async fn insert(&self, entry: QueueEntry) -> Result<QueueEntry> {
        let mut state = self.state.lock().unwrap();
        state.by_token.insert(entry.queue_token.clone(), entry.id);
        if let Some(code) = &entry.match_code {
            state.by_match_code.insert(code.clone(), entry.id);
        }
        state.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_by_token(&self, queue_token: &str) -> Result<Option<QueueEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state.by_token.get(queue_token).and_then(|id| state.entries.get(id)).cloned())
    }

    async fn get(&self, id: QueueEntryId) -> Result<QueueEntry> {
        let state = self.state.lock().unwrap();
        state.entries.get(&id).cloned().ok_or(Error::QueueEntryNotFound)
    }

    async fn get_by_match_code(&self, match_code: &str) -> Result<Option<QueueEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state.by_match_code.get(match_code).and_then(|id| state.entries.get(id)).cloned())
    }

    async fn oldest_public_queued(&self, stake: Amount, exclude_player: PlayerId) -> Result<Option<QueueEntry>> {
        let state = self.state.lock().unwrap();
        let mut candidates: Vec<&QueueEntry> = state
            .entries
            .values()
            .filter(|e| {
                e.status == QueueStatus::Queued
                    && e.mode == QueueMode::Public
                    && e.stake == stake
                    && e.player_id != exclude_player
            })
            .collect();
        candidates.sort_by_key(|e| e.created_at);
        Ok(candidates.into_iter().next().cloned())
    }

    async fn set_status(&self, id: QueueEntryId, status: QueueStatus) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let entry = state.entries.get_mut(&id).ok_or(Error::QueueEntryNotFound)?;
        entry.status = status;
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<QueueEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entries
            .values()
            .filter(|e| e.status == QueueStatus::Queued && e.expires_at <= now)
            .cloned()
            .collect())
    }

    async fn has_live_entry(&self, player_id: PlayerId) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.entries.values().any(|e| e.player_id == player_id && e.status == QueueStatus::Queued))
    }

    async fn match_code_exists(&self, match_code: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.by_match_code.contains_key(match_code))
    }

    async fn record_pairing(&self, id: QueueEntryId, game_token: &str, player_token: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.pairings.insert(id, (game_token.to_owned(), player_token.to_owned()));
        Ok(())
    }

    async fn get_pairing(&self, id: QueueEntryId) -> Result<Option<(String, String)>> {
        let state = self.state.lock().unwrap();
        Ok(state.pairings.get(&id).cloned())
    }
}
