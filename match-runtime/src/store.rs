use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stakeboard_core::types::{Match, MatchId, PlayerId, WinType};
use stakeboard_core::Result;

/// Persistence seam for match rows and their snapshots. `matchmaker`
/// calls `create_match` at pairing time; everything else is driven by
/// the per-match actor in this crate.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn create_match(&self, m: Match) -> Result<Match>;

    async fn get_match(&self, id: MatchId) -> Result<Match>;

    async fn get_by_game_token(&self, game_token: &str) -> Result<Option<Match>>;

    async fn mark_active(&self, id: MatchId, started_at: DateTime<Utc>) -> Result<()>;

    async fn update_state_blob(&self, id: MatchId, state_blob: Vec<u8>) -> Result<()>;

    /// Appends a row to `match_state_snapshots`, keyed by ascending
    /// `seq` per match, per the persistence layout's secondary index.
    async fn save_snapshot(&self, id: MatchId, seq: u64, state_blob: &[u8]) -> Result<()>;

    async fn finish(
        &self,
        id: MatchId,
        winner_id: Option<PlayerId>,
        win_type: WinType,
        terminal_reason: Option<String>,
        finished_at: DateTime<Utc>,
    ) -> Result<Match>;
}
