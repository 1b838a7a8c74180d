//! In-memory `MatchStore`, for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stakeboard_core::types::{Match, MatchId, PlayerId, WinType};
use stakeboard_core::{Error, Result};

use crate::store::MatchStore;

struct State {
    matches: HashMap<MatchId, Match>,
    by_game_token: HashMap<String, MatchId>,
    snapshots: HashMap<MatchId, Vec<(u64, Vec<u8>)>>,
}

pub struct MemoryMatchStore {
    state: Mutex<State>,
}

impl Default for MemoryMatchStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                matches: HashMap::new(),
                by_game_token: HashMap::new(),
                snapshots: HashMap::new(),
            }),
        }
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn create_match(&self, m: Match) -> Result<Match> {
        let mut state = self.state.lock().unwrap();
        state.by_game_token.insert(m.game_token.clone(), m.id);
        state.matches.insert(m.id, m.clone());
        Ok(m)
    }

    async fn get_match(&self, id: MatchId) -> Result<Match> {
        let state = self.state.lock().unwrap();
        state.matches.get(&id).cloned().ok_or(Error::MatchNotFound)
    }

    async fn get_by_game_token(&self, game_token: &str) -> Result<Option<Match>> {
        let state = self.state.lock().unwrap();
        Ok(state.by_game_token.get(game_token).and_then(|id| state.matches.get(id)).cloned())
    }

    async fn mark_active(&self, id: MatchId, started_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let m = state.matches.get_mut(&id).ok_or(Error::MatchNotFound)?;
        m.status = stakeboard_core::types::MatchStatus::Active;
        m.started_at = Some(started_at);
        Ok(())
    }

    async fn update_state_blob(&self, id: MatchId, state_blob: Vec<u8>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let m = state.matches.get_mut(&id).ok_or(Error::MatchNotFound)?;
        m.state_blob = state_blob;
        Ok(())
    }

    async fn save_snapshot(&self, id: MatchId, seq: u64, state_blob: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.snapshots.entry(id).or_default().push((seq, state_blob.to_vec()));
        Ok(())
    }

    async fn finish(
        &self,
        id: MatchId,
        winner_id: Option<PlayerId>,
        win_type: WinType,
        terminal_reason: Option<String>,
        finished_at: DateTime<Utc>,
    ) -> Result<Match> {
        let mut state = self.state.lock().unwrap();
        let m = state.matches.get_mut(&id).ok_or(Error::MatchNotFound)?;
        m.status = if matches!(win_type, WinType::Forfeit) && winner_id.is_none() {
            stakeboard_core::types::MatchStatus::Aborted
        } else {
            stakeboard_core::types::MatchStatus::Finished
        };
        m.winner_id = winner_id;
        m.win_type = Some(win_type);
        m.terminal_reason = terminal_reason;
        m.finished_at = Some(finished_at);
        Ok(m.clone())
    }
}
