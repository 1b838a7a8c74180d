//! `WithdrawalStore` over Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use stakeboard_core::types::{LedgerTxId, PlayerId, WithdrawalId, WithdrawalRequest, WithdrawalStatus};
use stakeboard_core::{Error, Result};
use stakeboard_payment::withdrawal::WithdrawalStore;

use crate::pg::pg_err;

pub struct PgWithdrawalStore {
    pool: PgPool,
}

impl PgWithdrawalStore {
    pub fn new(pool: PgPool) -> PgWithdrawalStore {
        PgWithdrawalStore { pool }
    }
}

fn status_str(s: WithdrawalStatus) -> &'static str {
    match s {
        WithdrawalStatus::Pending => "pending",
        WithdrawalStatus::Approved => "approved",
        WithdrawalStatus::Dispatched => "dispatched",
        WithdrawalStatus::Settled => "settled",
        WithdrawalStatus::Failed => "failed",
        WithdrawalStatus::Rejected => "rejected",
    }
}

fn parse_status(s: &str) -> Result<WithdrawalStatus> {
    Ok(match s {
        "pending" => WithdrawalStatus::Pending,
        "approved" => WithdrawalStatus::Approved,
        "dispatched" => WithdrawalStatus::Dispatched,
        "settled" => WithdrawalStatus::Settled,
        "failed" => WithdrawalStatus::Failed,
        "rejected" => WithdrawalStatus::Rejected,
        other => return Err(Error::Storage(format!("unknown withdrawal status {other}"))),
    })
}

const COLUMNS: &str = "id, player_id, gross_amount, provider_fee, net_amount, destination_msisdn, status, ledger_tx_ids, created_at";

fn from_row(row: &PgRow) -> Result<WithdrawalRequest> {
    Ok(WithdrawalRequest {
        id: row.try_get("id").map_err(pg_err)?,
        player_id: row.try_get("player_id").map_err(pg_err)?,
        gross_amount: row.try_get("gross_amount").map_err(pg_err)?,
        provider_fee: row.try_get("provider_fee").map_err(pg_err)?,
        net_amount: row.try_get("net_amount").map_err(pg_err)?,
        destination_msisdn: row.try_get("destination_msisdn").map_err(pg_err)?,
        status: parse_status(row.try_get("status").map_err(pg_err)?)?,
        ledger_tx_ids: row.try_get::<Vec<LedgerTxId>, _>("ledger_tx_ids").map_err(pg_err)?,
        created_at: row.try_get("created_at").map_err(pg_err)?,
    })
}

#[async_trait]
impl WithdrawalStore for PgWithdrawalStore {
    async fn create(&self, req: WithdrawalRequest) -> Result<WithdrawalRequest> {
        sqlx::query(&format!("insert into withdrawals ({COLUMNS}) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)"))
            .bind(req.id)
            .bind(req.player_id)
            .bind(req.gross_amount)
            .bind(req.provider_fee)
            .bind(req.net_amount)
            .bind(&req.destination_msisdn)
            .bind(status_str(req.status))
            .bind(&req.ledger_tx_ids)
            .bind(req.created_at)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(req)
    }

    async fn get(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let row = sqlx::query(&format!("select {COLUMNS} from withdrawals where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or_else(|| Error::Internal("withdrawal request not found".into()))?;
        from_row(&row)
    }

    async fn set_status(&self, id: WithdrawalId, status: WithdrawalStatus) -> Result<()> {
        sqlx::query("update withdrawals set status = $2 where id = $1")
            .bind(id)
            .bind(status_str(status))
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(())
    }

    async fn append_ledger_tx_ids(&self, id: WithdrawalId, tx_ids: &[LedgerTxId]) -> Result<()> {
        sqlx::query("update withdrawals set ledger_tx_ids = ledger_tx_ids || $2 where id = $1")
            .bind(id)
            .bind(tx_ids)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(())
    }

    async fn list_for_player(&self, player_id: PlayerId, limit: u32, before: Option<DateTime<Utc>>) -> Result<Vec<WithdrawalRequest>> {
        let rows = sqlx::query(&format!(
            "select {COLUMNS} from withdrawals where player_id = $1 and ($2::timestamptz is null or created_at < $2) \
             order by created_at desc limit $3"
        ))
        .bind(player_id)
        .bind(before)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        rows.iter().map(from_row).collect()
    }
}
