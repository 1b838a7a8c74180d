use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Amount, MatchId, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchVariant {
    Cards,
    Pool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    Active,
    Finished,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinType {
    Classic,
    Chop,
    Forfeit,
    Concede,
    Draw,
}

/// A single match between two players. `state_blob` is the
/// variant-specific authoritative state, opaque at this layer (owned and
/// interpreted by `match-runtime`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub game_token: String,
    pub player_ids: [PlayerId; 2],
    pub player_tokens: [String; 2],
    pub stake: Amount,
    /// Each player's commission contribution, frozen at pairing time so
    /// settlement never has to re-derive it from the matchmaker's
    /// (possibly since-changed) commission rate.
    pub commission_per_player: Amount,
    pub variant: MatchVariant,
    pub status: MatchStatus,
    pub state_blob: Vec<u8>,
    pub winner_id: Option<PlayerId>,
    pub win_type: Option<WinType>,
    pub terminal_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn player_token_for(&self, player_id: PlayerId) -> Option<&str> {
        self.player_ids
            .iter()
            .position(|id| *id == player_id)
            .map(|idx| self.player_tokens[idx].as_str())
    }

    pub fn opponent_of(&self, player_id: PlayerId) -> Option<PlayerId> {
        self.player_ids.iter().find(|id| **id != player_id).copied()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, MatchStatus::Finished | MatchStatus::Aborted)
    }
}
