//! `PaymentStore` over Postgres: payment intents and the sweeper's
//! stale-pending query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use stakeboard_core::types::LedgerTxId;
use stakeboard_core::{Error, Result};
use stakeboard_payment::{IntentKind, IntentStatus, PaymentIntent, PaymentStore};

use crate::pg::pg_err;

pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> PgPaymentStore {
        PgPaymentStore { pool }
    }
}

fn kind_str(k: IntentKind) -> &'static str {
    match k {
        IntentKind::Collection => "collection",
        IntentKind::Disbursement => "disbursement",
    }
}

fn parse_kind(s: &str) -> Result<IntentKind> {
    Ok(match s {
        "collection" => IntentKind::Collection,
        "disbursement" => IntentKind::Disbursement,
        other => return Err(Error::Storage(format!("unknown intent kind {other}"))),
    })
}

fn status_str(s: IntentStatus) -> &'static str {
    match s {
        IntentStatus::Pending => "pending",
        IntentStatus::Succeeded => "succeeded",
        IntentStatus::Failed => "failed",
    }
}

fn parse_status(s: &str) -> Result<IntentStatus> {
    Ok(match s {
        "pending" => IntentStatus::Pending,
        "succeeded" => IntentStatus::Succeeded,
        "failed" => IntentStatus::Failed,
        other => return Err(Error::Storage(format!("unknown intent status {other}"))),
    })
}

const INTENT_COLUMNS: &str = "id, kind, player_id, phone, amount, reference_id, status, provider_ref, ledger_tx_ids, created_at";

fn intent_from_row(row: &PgRow) -> Result<PaymentIntent> {
    Ok(PaymentIntent {
        id: row.try_get("id").map_err(pg_err)?,
        kind: parse_kind(row.try_get("kind").map_err(pg_err)?)?,
        player_id: row.try_get("player_id").map_err(pg_err)?,
        phone: row.try_get("phone").map_err(pg_err)?,
        amount: row.try_get("amount").map_err(pg_err)?,
        reference_id: row.try_get("reference_id").map_err(pg_err)?,
        status: parse_status(row.try_get("status").map_err(pg_err)?)?,
        provider_ref: row.try_get("provider_ref").map_err(pg_err)?,
        ledger_tx_ids: row.try_get::<Vec<LedgerTxId>, _>("ledger_tx_ids").map_err(pg_err)?,
        created_at: row.try_get("created_at").map_err(pg_err)?,
    })
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn create_intent(&self, intent: PaymentIntent) -> Result<PaymentIntent> {
        sqlx::query(&format!(
            "insert into payment_intents ({INTENT_COLUMNS}) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(intent.id)
        .bind(kind_str(intent.kind))
        .bind(intent.player_id)
        .bind(&intent.phone)
        .bind(intent.amount)
        .bind(&intent.reference_id)
        .bind(status_str(intent.status))
        .bind(&intent.provider_ref)
        .bind(&intent.ledger_tx_ids)
        .bind(intent.created_at)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(intent)
    }

    async fn get_intent(&self, id: Uuid) -> Result<PaymentIntent> {
        let row = sqlx::query(&format!("select {INTENT_COLUMNS} from payment_intents where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or_else(|| Error::Internal("payment intent not found".into()))?;
        intent_from_row(&row)
    }

    async fn transition_status(&self, id: Uuid, new_status: IntentStatus, provider_ref: Option<String>) -> Result<bool> {
        let result = sqlx::query(
            "update payment_intents set status = $2, provider_ref = coalesce($3, provider_ref) \
             where id = $1 and status = 'pending'",
        )
        .bind(id)
        .bind(status_str(new_status))
        .bind(&provider_ref)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_ledger_tx_ids(&self, id: Uuid, tx_ids: Vec<LedgerTxId>) -> Result<()> {
        sqlx::query("update payment_intents set ledger_tx_ids = $2 where id = $1")
            .bind(id)
            .bind(&tx_ids)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(())
    }

    async fn list_stale_pending(&self, older_than: DateTime<Utc>) -> Result<Vec<PaymentIntent>> {
        let rows = sqlx::query(&format!(
            "select {INTENT_COLUMNS} from payment_intents where status = 'pending' and created_at < $1"
        ))
        .bind(older_than)
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        rows.iter().map(intent_from_row).collect()
    }
}
