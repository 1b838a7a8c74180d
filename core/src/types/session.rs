use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MatchId, PlayerId};

/// The state of a player's live duplex connection to a match, as tracked
/// by the session hub. The connection object itself lives with the
/// session-hub crate; this is the presence-facing subset other
/// components (notably match-runtime) need to reason about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub last_activity: DateTime<Utc>,
    pub connected: bool,
}
