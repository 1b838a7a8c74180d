use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stakeboard_core::types::{Amount, PlayerId, QueueEntry, QueueEntryId, QueueStatus};
use stakeboard_core::Result;

/// Persistence seam for queue entries. Durable source of truth for the
/// `queue_entries` table; the in-process tier locks in `Matchmaker` are
/// the fast-path concurrency control, not a replacement for this.
#[async_trait]
pub trait MatchmakerStore: Send + Sync {
    async fn insert(&self, entry: QueueEntry) -> Result<QueueEntry>;

    async fn get_by_token(&self, queue_token: &str) -> Result<Option<QueueEntry>>;

    async fn get(&self, id: QueueEntryId) -> Result<QueueEntry>;

    async fn get_by_match_code(&self, match_code: &str) -> Result<Option<QueueEntry>>;

    /// The oldest still-`queued` public entry at `stake`, owned by
    /// someone other than `exclude_player`. This is the head-of-queue
    /// scan the pairing algorithm runs under a per-tier lock.
    async fn oldest_public_queued(&self, stake: Amount, exclude_player: PlayerId) -> Result<Option<QueueEntry>>;

    async fn set_status(&self, id: QueueEntryId, status: QueueStatus) -> Result<()>;

    /// Every `queued` entry whose `expires_at` has passed `now`. Callers
    /// are expected to transition each to `expired` themselves (not done
    /// atomically here) so the sweeper can run the same refund path used
    /// for every other expiry.
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<QueueEntry>>;

    /// `(player, status=queued)` uniqueness check.
    async fn has_live_entry(&self, player_id: PlayerId) -> Result<bool>;

    async fn match_code_exists(&self, match_code: &str) -> Result<bool>;

    /// Records which `(game_token, player_token)` a `matched` entry
    /// resolved to, so a later `PollStatus` on the same queue token can
    /// return it without needing a second index keyed by player.
    async fn record_pairing(&self, id: QueueEntryId, game_token: &str, player_token: &str) -> Result<()>;

    async fn get_pairing(&self, id: QueueEntryId) -> Result<Option<(String, String)>>;
}
