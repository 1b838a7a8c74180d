use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountType, Amount, PlayerId, QueueEntryId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    Public,
    PrivateHost,
    PrivateGuest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Queued,
    Matched,
    Expired,
    Cancelled,
    Refunded,
}

/// A player's intent to play at a given stake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    pub player_id: PlayerId,
    pub stake: Amount,
    pub mode: QueueMode,
    pub match_code: Option<String>,
    pub invite_phone: Option<String>,
    /// Which of the player's own accounts this stake was drawn from —
    /// the wallet (mobile-money funded) or winnings (re-staking a prior
    /// win), per the stake endpoint's `source` field.
    pub source: AccountType,
    pub status: QueueStatus,
    pub queue_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
