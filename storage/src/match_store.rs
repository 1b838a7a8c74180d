//! `MatchStore` over Postgres: match rows and their state snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use stakeboard_core::types::{Match, MatchId, MatchStatus, MatchVariant, PlayerId, WinType};
use stakeboard_core::{Error, Result};
use stakeboard_match_runtime::store::MatchStore;

use crate::pg::pg_err;

pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> PgMatchStore {
        PgMatchStore { pool }
    }
}

fn variant_str(v: MatchVariant) -> &'static str {
    match v {
        MatchVariant::Cards => "cards",
        MatchVariant::Pool => "pool",
    }
}

fn parse_variant(s: &str) -> Result<MatchVariant> {
    Ok(match s {
        "cards" => MatchVariant::Cards,
        "pool" => MatchVariant::Pool,
        other => return Err(Error::Storage(format!("unknown match variant {other}"))),
    })
}

fn status_str(s: MatchStatus) -> &'static str {
    match s {
        MatchStatus::Waiting => "waiting",
        MatchStatus::Active => "active",
        MatchStatus::Finished => "finished",
        MatchStatus::Aborted => "aborted",
    }
}

fn parse_status(s: &str) -> Result<MatchStatus> {
    Ok(match s {
        "waiting" => MatchStatus::Waiting,
        "active" => MatchStatus::Active,
        "finished" => MatchStatus::Finished,
        "aborted" => MatchStatus::Aborted,
        other => return Err(Error::Storage(format!("unknown match status {other}"))),
    })
}

fn win_type_str(w: WinType) -> &'static str {
    match w {
        WinType::Classic => "classic",
        WinType::Chop => "chop",
        WinType::Forfeit => "forfeit",
        WinType::Concede => "concede",
        WinType::Draw => "draw",
    }
}

fn parse_win_type(s: &str) -> Result<WinType> {
    Ok(match s {
        "classic" => WinType::Classic,
        "chop" => WinType::Chop,
        "forfeit" => WinType::Forfeit,
        "concede" => WinType::Concede,
        "draw" => WinType::Draw,
        other => return Err(Error::Storage(format!("unknown win type {other}"))),
    })
}

const MATCH_COLUMNS: &str = "id, game_token, player_id_1, player_id_2, player_token_1, player_token_2, stake, \
     commission_per_player, variant, status, state_blob, winner_id, win_type, terminal_reason, \
     created_at, started_at, finished_at";

fn match_from_row(row: &PgRow) -> Result<Match> {
    let win_type: Option<String> = row.try_get("win_type").map_err(pg_err)?;
    Ok(Match {
        id: row.try_get("id").map_err(pg_err)?,
        game_token: row.try_get("game_token").map_err(pg_err)?,
        player_ids: [row.try_get("player_id_1").map_err(pg_err)?, row.try_get("player_id_2").map_err(pg_err)?],
        player_tokens: [row.try_get("player_token_1").map_err(pg_err)?, row.try_get("player_token_2").map_err(pg_err)?],
        stake: row.try_get("stake").map_err(pg_err)?,
        commission_per_player: row.try_get("commission_per_player").map_err(pg_err)?,
        variant: parse_variant(row.try_get("variant").map_err(pg_err)?)?,
        status: parse_status(row.try_get("status").map_err(pg_err)?)?,
        state_blob: row.try_get("state_blob").map_err(pg_err)?,
        winner_id: row.try_get("winner_id").map_err(pg_err)?,
        win_type: win_type.map(|s| parse_win_type(&s)).transpose()?,
        terminal_reason: row.try_get("terminal_reason").map_err(pg_err)?,
        created_at: row.try_get("created_at").map_err(pg_err)?,
        started_at: row.try_get("started_at").map_err(pg_err)?,
        finished_at: row.try_get("finished_at").map_err(pg_err)?,
    })
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn create_match(&self, m: Match) -> Result<Match> {
        sqlx::query(&format!(
            "insert into matches ({MATCH_COLUMNS}) values \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        ))
        .bind(m.id)
        .bind(&m.game_token)
        .bind(m.player_ids[0])
        .bind(m.player_ids[1])
        .bind(&m.player_tokens[0])
        .bind(&m.player_tokens[1])
        .bind(m.stake)
        .bind(m.commission_per_player)
        .bind(variant_str(m.variant))
        .bind(status_str(m.status))
        .bind(&m.state_blob)
        .bind(m.winner_id)
        .bind(m.win_type.map(win_type_str))
        .bind(&m.terminal_reason)
        .bind(m.created_at)
        .bind(m.started_at)
        .bind(m.finished_at)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(m)
    }

    async fn get_match(&self, id: MatchId) -> Result<Match> {
        let row = sqlx::query(&format!("select {MATCH_COLUMNS} from matches where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or(Error::MatchNotFound)?;
        match_from_row(&row)
    }

    async fn get_by_game_token(&self, game_token: &str) -> Result<Option<Match>> {
        let row = sqlx::query(&format!("select {MATCH_COLUMNS} from matches where game_token = $1"))
            .bind(game_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        row.as_ref().map(match_from_row).transpose()
    }

    async fn mark_active(&self, id: MatchId, started_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("update matches set status = 'active', started_at = $2 where id = $1")
            .bind(id)
            .bind(started_at)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::MatchNotFound);
        }
        Ok(())
    }

    async fn update_state_blob(&self, id: MatchId, state_blob: Vec<u8>) -> Result<()> {
        let result = sqlx::query("update matches set state_blob = $2 where id = $1")
            .bind(id)
            .bind(&state_blob)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::MatchNotFound);
        }
        Ok(())
    }

    async fn save_snapshot(&self, id: MatchId, seq: u64, state_blob: &[u8]) -> Result<()> {
        sqlx::query("insert into match_state_snapshots (match_id, seq, state_blob) values ($1, $2, $3)")
            .bind(id)
            .bind(seq as i64)
            .bind(state_blob)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
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
        let status = if matches!(win_type, WinType::Forfeit) && winner_id.is_none() {
            MatchStatus::Aborted
        } else {
            MatchStatus::Finished
        };
        let row = sqlx::query(&format!(
            "update matches set status = $2, winner_id = $3, win_type = $4, terminal_reason = $5, finished_at = $6 \
             where id = $1 returning {MATCH_COLUMNS}"
        ))
        .bind(id)
        .bind(status_str(status))
        .bind(winner_id)
        .bind(win_type_str(win_type))
        .bind(&terminal_reason)
        .bind(finished_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?
        .ok_or(Error::MatchNotFound)?;
        match_from_row(&row)
    }
}
