use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PlayerId;

/// A phone-keyed identity. Created lazily on first staked game; never
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Normalized E.164 phone number; unique.
    pub phone: String,
    pub display_name: String,
    /// Present once the player has set a PIN. `None` means the player
    /// exists (has played staked games in the past via some other path,
    /// or was created by `CreateOrTouch`) but has no credential yet.
    pub pin_hash: Option<String>,
    pub pin_fail_count: u32,
    /// When the current run of consecutive failures started. A failure
    /// more than `RegistryConfig::lockout_window` after this resets the
    /// count instead of adding to it, so stale failures age out.
    pub pin_fail_window_started_at: Option<DateTime<Utc>>,
    pub lockout_until: Option<DateTime<Utc>>,
    pub games_played: u32,
    pub games_won: u32,
    pub current_streak: i32,
    pub created_at: DateTime<Utc>,
}

impl Player {
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.lockout_until.is_some_and(|until| until > now)
    }
}
