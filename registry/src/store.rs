use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stakeboard_core::types::{Player, PlayerId};
use stakeboard_core::Result;

use crate::service::ActionScope;

#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ActionToken {
    pub player_id: PlayerId,
    pub scope: ActionScope,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

/// Persistence seam for everything `registry` owns: the `players`,
/// `otp_codes`, and the session/action-token rows behind `sessions` /
/// `admin_sessions`-style tables in the data model. Mirrors the split
/// between `ledger`'s `LedgerStore` and its service: credential/lockout
/// policy lives in `Registry`, row access lives here.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn get_player(&self, player_id: PlayerId) -> Result<Player>;

    async fn get_player_by_phone(&self, phone: &str) -> Result<Option<Player>>;

    async fn create_player(&self, phone: &str, display_name: &str) -> Result<Player>;

    /// Updates display name if `Some`; always bumps nothing else. Used by
    /// `CreateOrTouch` when the player already exists.
    async fn touch_player(&self, player_id: PlayerId, display_name: Option<&str>) -> Result<Player>;

    async fn set_pin_hash(&self, player_id: PlayerId, pin_hash: &str) -> Result<()>;

    /// Increments the failure counter and returns the new count. If the
    /// current window's first failure was more than `window` before
    /// `now`, the count resets to 1 and the window restarts instead of
    /// accumulating — failures "within window W" per the lockout rule,
    /// not ever after.
    async fn increment_pin_failures(&self, player_id: PlayerId, now: DateTime<Utc>, window: chrono::Duration) -> Result<u32>;

    async fn clear_pin_failures(&self, player_id: PlayerId) -> Result<()>;

    async fn set_lockout(&self, player_id: PlayerId, until: Option<DateTime<Utc>>) -> Result<()>;

    /// Bumps `games_played`/`games_won`/`current_streak` on a terminal
    /// match transition. Called by the match runtime, not by Registry's
    /// own contract methods.
    async fn record_match_result(&self, player_id: PlayerId, won: bool) -> Result<()>;

    async fn create_session(&self, token: &str, player_id: PlayerId, expires_at: DateTime<Utc>) -> Result<()>;

    async fn get_session(&self, token: &str) -> Result<Option<Session>>;

    async fn delete_session(&self, token: &str) -> Result<()>;

    async fn create_action_token(
        &self,
        token: &str,
        player_id: PlayerId,
        scope: ActionScope,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Atomically validates scope + expiry + single-use, marks the token
    /// used, and returns the owning player id.
    async fn consume_action_token(&self, token: &str, expected_scope: ActionScope) -> Result<PlayerId>;

    async fn store_otp(&self, phone: &str, code_hash: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Validates `code_hash` against the most recent unexpired OTP hash
    /// stored for `phone`, consuming it on match. Callers hash the raw
    /// code before calling this; the store never sees the plaintext.
    async fn verify_and_consume_otp(&self, phone: &str, code_hash: &str) -> Result<bool>;
}
