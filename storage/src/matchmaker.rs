//! `MatchmakerStore` over Postgres: queue entries and their pairing
//! results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use stakeboard_core::types::{AccountType, Amount, PlayerId, QueueEntry, QueueEntryId, QueueMode, QueueStatus};
use stakeboard_core::{Error, Result};
use stakeboard_matchmaker::store::MatchmakerStore;

use crate::pg::pg_err;

pub struct PgMatchmakerStore {
    pool: PgPool,
}

impl PgMatchmakerStore {
    pub fn new(pool: PgPool) -> PgMatchmakerStore {
        PgMatchmakerStore { pool }
    }
}

fn mode_str(m: QueueMode) -> &'static str {
    match m {
        QueueMode::Public => "public",
        QueueMode::PrivateHost => "private_host",
        QueueMode::PrivateGuest => "private_guest",
    }
}

fn parse_mode(s: &str) -> Result<QueueMode> {
    Ok(match s {
        "public" => QueueMode::Public,
        "private_host" => QueueMode::PrivateHost,
        "private_guest" => QueueMode::PrivateGuest,
        other => return Err(Error::Storage(format!("unknown queue mode {other}"))),
    })
}

fn source_str(t: AccountType) -> &'static str {
    match t {
        AccountType::PlayerWinnings => "player_winnings",
        AccountType::PlayerWallet => "player_wallet",
        AccountType::Escrow => "escrow",
        AccountType::HouseCommission => "house_commission",
        AccountType::HouseExpense => "house_expense",
        AccountType::MobileMoneyProvider => "mobile_money_provider",
    }
}

fn parse_source(s: &str) -> Result<AccountType> {
    Ok(match s {
        "player_winnings" => AccountType::PlayerWinnings,
        "player_wallet" => AccountType::PlayerWallet,
        "escrow" => AccountType::Escrow,
        "house_commission" => AccountType::HouseCommission,
        "house_expense" => AccountType::HouseExpense,
        "mobile_money_provider" => AccountType::MobileMoneyProvider,
        other => return Err(Error::Storage(format!("unknown queue source {other}"))),
    })
}

fn status_str(s: QueueStatus) -> &'static str {
    match s {
        QueueStatus::Queued => "queued",
        QueueStatus::Matched => "matched",
        QueueStatus::Expired => "expired",
        QueueStatus::Cancelled => "cancelled",
        QueueStatus::Refunded => "refunded",
    }
}

fn parse_status(s: &str) -> Result<QueueStatus> {
    Ok(match s {
        "queued" => QueueStatus::Queued,
        "matched" => QueueStatus::Matched,
        "expired" => QueueStatus::Expired,
        "cancelled" => QueueStatus::Cancelled,
        "refunded" => QueueStatus::Refunded,
        other => return Err(Error::Storage(format!("unknown queue status {other}"))),
    })
}

const ENTRY_COLUMNS: &str =
    "id, player_id, stake, mode, match_code, invite_phone, source, status, queue_token, created_at, expires_at";

fn entry_from_row(row: &PgRow) -> Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.try_get("id").map_err(pg_err)?,
        player_id: row.try_get("player_id").map_err(pg_err)?,
        stake: row.try_get("stake").map_err(pg_err)?,
        mode: parse_mode(row.try_get("mode").map_err(pg_err)?)?,
        match_code: row.try_get("match_code").map_err(pg_err)?,
        invite_phone: row.try_get("invite_phone").map_err(pg_err)?,
        source: parse_source(row.try_get("source").map_err(pg_err)?)?,
        status: parse_status(row.try_get("status").map_err(pg_err)?)?,
        queue_token: row.try_get("queue_token").map_err(pg_err)?,
        created_at: row.try_get("created_at").map_err(pg_err)?,
        expires_at: row.try_get("expires_at").map_err(pg_err)?,
    })
}

#[async_trait]
impl MatchmakerStore for PgMatchmakerStore {
    async fn insert(&self, entry: QueueEntry) -> Result<QueueEntry> {
        sqlx::query(&format!(
            "insert into queue_entries ({ENTRY_COLUMNS}) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(entry.id)
        .bind(entry.player_id)
        .bind(entry.stake)
        .bind(mode_str(entry.mode))
        .bind(&entry.match_code)
        .bind(&entry.invite_phone)
        .bind(source_str(entry.source))
        .bind(status_str(entry.status))
        .bind(&entry.queue_token)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(entry)
    }

    async fn get_by_token(&self, queue_token: &str) -> Result<Option<QueueEntry>> {
        let row = sqlx::query(&format!("select {ENTRY_COLUMNS} from queue_entries where queue_token = $1"))
            .bind(queue_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn get(&self, id: QueueEntryId) -> Result<QueueEntry> {
        let row = sqlx::query(&format!("select {ENTRY_COLUMNS} from queue_entries where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or(Error::QueueEntryNotFound)?;
        entry_from_row(&row)
    }

    async fn get_by_match_code(&self, match_code: &str) -> Result<Option<QueueEntry>> {
        let row = sqlx::query(&format!("select {ENTRY_COLUMNS} from queue_entries where match_code = $1"))
            .bind(match_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn oldest_public_queued(&self, stake: Amount, exclude_player: PlayerId) -> Result<Option<QueueEntry>> {
        let row = sqlx::query(&format!(
            "select {ENTRY_COLUMNS} from queue_entries \
             where status = 'queued' and mode = 'public' and stake = $1 and player_id <> $2 \
             order by created_at asc limit 1"
        ))
        .bind(stake)
        .bind(exclude_player)
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn set_status(&self, id: QueueEntryId, status: QueueStatus) -> Result<()> {
        let result = sqlx::query("update queue_entries set status = $2 where id = $1")
            .bind(id)
            .bind(status_str(status))
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::QueueEntryNotFound);
        }
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<QueueEntry>> {
        let rows = sqlx::query(&format!("select {ENTRY_COLUMNS} from queue_entries where status = 'queued' and expires_at <= $1"))
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(pg_err)?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn has_live_entry(&self, player_id: PlayerId) -> Result<bool> {
        let row = sqlx::query("select exists(select 1 from queue_entries where player_id = $1 and status = 'queued') as live")
            .bind(player_id)
            .fetch_one(&self.pool)
            .await
            .map_err(pg_err)?;
        row.try_get("live").map_err(pg_err)
    }

    async fn match_code_exists(&self, match_code: &str) -> Result<bool> {
        let row = sqlx::query("select exists(select 1 from queue_entries where match_code = $1) as present")
            .bind(match_code)
            .fetch_one(&self.pool)
            .await
            .map_err(pg_err)?;
        row.try_get("present").map_err(pg_err)
    }

    async fn record_pairing(&self, id: QueueEntryId, game_token: &str, player_token: &str) -> Result<()> {
        sqlx::query(
            "insert into queue_pairings (queue_entry_id, game_token, player_token) values ($1, $2, $3) \
             on conflict (queue_entry_id) do update set game_token = excluded.game_token, player_token = excluded.player_token",
        )
        .bind(id)
        .bind(game_token)
        .bind(player_token)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(())
    }

    async fn get_pairing(&self, id: QueueEntryId) -> Result<Option<(String, String)>> {
        let row = sqlx::query("select game_token, player_token from queue_pairings where queue_entry_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        row.map(|r| -> Result<(String, String)> {
            Ok((r.try_get("game_token").map_err(pg_err)?, r.try_get("player_token").map_err(pg_err)?))
        })
        .transpose()
    }
}
