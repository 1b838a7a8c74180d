//! In-memory `RegistryStore`, for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use stakeboard_core::types::{Player, PlayerId};
use stakeboard_core::{Error, Result};

use crate::service::ActionScope;
use crate::store::{ActionToken, RegistryStore, Session};

struct State {
    players: HashMap<PlayerId, Player>,
    phone_index: HashMap<String, PlayerId>,
    sessions: HashMap<String, Session>,
    action_tokens: HashMap<String, ActionToken>,
    otp_codes: HashMap<String, (String, DateTime<Utc>)>,
}

pub struct MemoryRegistryStore {
    state: Mutex<State>,
}

impl Default for MemoryRegistryStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                players: HashMap::new(),
                phone_index: HashMap::new(),
                sessions: HashMap::new(),
                action_tokens: HashMap::new(),
                otp_codes: HashMap::new(),
            }),
        }
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistryStore {
    async fn get_player(&self, player_id: PlayerId) -> Result<Player> {
        let state = self.state.lock().unwrap();
        state.players.get(&player_id).cloned().ok_or(Error::UnknownAccount)
    }

    async fn get_player_by_phone(&self, phone: &str) -> Result<Option<Player>> {
        let state = self.state.lock().unwrap();
        Ok(state.phone_index.get(phone).and_then(|id| state.players.get(id)).cloned())
    }

    async fn create_player(&self, phone: &str, display_name: &str) -> Result<Player> {
        let mut state = self.state.lock().unwrap();
        let id = Uuid::new_v4();
        let player = Player {
            id,
            phone: phone.to_owned(),
            display_name: display_name.to_owned(),
            pin_hash: None,
            pin_fail_count: 0,
            pin_fail_window_started_at: None,
            lockout_until: None,
            games_played: 0,
            games_won: 0,
            current_streak: 0,
            created_at: Utc::now(),
        };
        state.players.insert(id, player.clone());
        state.phone_index.insert(phone.to_owned(), id);
        Ok(player)
    }

    async fn touch_player(&self, player_id: PlayerId, display_name: Option<&str>) -> Result<Player> {
        let mut state = self.state.lock().unwrap();
        let player = state.players.get_mut(&player_id).ok_or(Error::UnknownAccount)?;
        if let Some(name) = display_name {
            player.display_name = name.to_owned();
        }
        Ok(player.clone())
    }

    async fn set_pin_hash(&self, player_id: PlayerId, pin_hash: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let player = state.players.get_mut(&player_id).ok_or(Error::UnknownAccount)?;
        player.pin_hash = Some(pin_hash.to_owned());
        Ok(())
    }

    async fn increment_pin_failures(&self, player_id: PlayerId, now: DateTime<Utc>, window: chrono::Duration) -> Result<u32> {
        let mut state = self.state.lock().unwrap();
        let player = state.players.get_mut(&player_id).ok_or(Error::UnknownAccount)?;
        let expired = player.pin_fail_window_started_at.is_none_or(|started_at| now - started_at > window);
        if expired {
            player.pin_fail_count = 1;
            player.pin_fail_window_started_at = Some(now);
        } else {
            player.pin_fail_count += 1;
        }
        Ok(player.pin_fail_count)
    }

    async fn clear_pin_failures(&self, player_id: PlayerId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let player = state.players.get_mut(&player_id).ok_or(Error::UnknownAccount)?;
        player.pin_fail_count = 0;
        player.pin_fail_window_started_at = None;
        Ok(())
    }

    async fn set_lockout(&self, player_id: PlayerId, until: Option<DateTime<Utc>>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let player = state.players.get_mut(&player_id).ok_or(Error::UnknownAccount)?;
        player.lockout_until = until;
        Ok(())
    }

    async fn record_match_result(&self, player_id: PlayerId, won: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let player = state.players.get_mut(&player_id).ok_or(Error::UnknownAccount)?;
        player.games_played += 1;
        if won {
            player.games_won += 1;
            player.current_streak = player.current_streak.max(0) + 1;
        } else {
            player.current_streak = player.current_streak.min(0) - 1;
        }
        Ok(())
    }

    async fn create_session(&self, token: &str, player_id: PlayerId, expires_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.sessions.insert(token.to_owned(), Session { player_id, expires_at });
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let state = self.state.lock().unwrap();
        Ok(state.sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.sessions.remove(token);
        Ok(())
    }

    async fn create_action_token(
        &self,
        token: &str,
        player_id: PlayerId,
        scope: ActionScope,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.action_tokens.insert(
            token.to_owned(),
            ActionToken {
                player_id,
                scope,
                expires_at,
                used: false,
            },
        );
        Ok(())
    }

    async fn consume_action_token(&self, token: &str, expected_scope: ActionScope) -> Result<PlayerId> {
        let mut state = self.state.lock().unwrap();
        let entry = state.action_tokens.get_mut(token).ok_or(Error::UnknownToken)?;
        if entry.used || entry.expires_at < Utc::now() {
            return Err(Error::UnknownToken);
        }
        if entry.scope != expected_scope {
            return Err(Error::TokenScopeMismatch);
        }
        entry.used = true;
        Ok(entry.player_id)
    }

    async fn store_otp(&self, phone: &str, code_hash: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.otp_codes.insert(phone.to_owned(), (code_hash.to_owned(), expires_at));
        Ok(())
    }

    async fn verify_and_consume_otp(&self, phone: &str, code_hash: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some((stored_hash, expires_at)) = state.otp_codes.get(phone).cloned() else {
            return Ok(false);
        };
        if expires_at < Utc::now() {
            state.otp_codes.remove(phone);
            return Ok(false);
        }
        let matches = stakeboard_core::crypto::constant_time_eq(stored_hash.as_bytes(), code_hash.as_bytes());
        if matches {
            state.otp_codes.remove(phone);
        }
        Ok(matches)
    }
}
