//! `WithdrawalRequest` persistence. The orchestrator drives status
//! transitions (`Pending -> Dispatched -> Settled`/`Failed`) alongside
//! the `PaymentIntent` that actually moves the money; this store just
//! holds the player-facing record `GET /me/withdraws` reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use stakeboard_core::types::{LedgerTxId, PlayerId, WithdrawalId, WithdrawalRequest, WithdrawalStatus};
use stakeboard_core::{Error, Result};

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    async fn create(&self, req: WithdrawalRequest) -> Result<WithdrawalRequest>;

    async fn get(&self, id: WithdrawalId) -> Result<WithdrawalRequest>;

    async fn set_status(&self, id: WithdrawalId, status: WithdrawalStatus) -> Result<()>;

    async fn append_ledger_tx_ids(&self, id: WithdrawalId, tx_ids: &[LedgerTxId]) -> Result<()>;

    async fn list_for_player(&self, player_id: PlayerId, limit: u32, before: Option<DateTime<Utc>>) -> Result<Vec<WithdrawalRequest>>;
}

#[derive(Default)]
pub struct MemoryWithdrawalStore {
    requests: Mutex<HashMap<WithdrawalId, WithdrawalRequest>>,
}

#[async_trait]
impl WithdrawalStore for MemoryWithdrawalStore {
    async fn create(&self, req: WithdrawalRequest) -> Result<WithdrawalRequest> {
        let mut requests = self.requests.lock().unwrap();
        requests.insert(req.id, req.clone());
        Ok(req)
    }

    async fn get(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        let requests = self.requests.lock().unwrap();
        requests.get(&id).cloned().ok_or_else(|| Error::Internal("withdrawal request not found".into()))
    }

    async fn set_status(&self, id: WithdrawalId, status: WithdrawalStatus) -> Result<()> {
        let mut requests = self.requests.lock().unwrap();
        let req = requests.get_mut(&id).ok_or_else(|| Error::Internal("withdrawal request not found".into()))?;
        req.status = status;
        Ok(())
    }

    async fn append_ledger_tx_ids(&self, id: WithdrawalId, tx_ids: &[LedgerTxId]) -> Result<()> {
        let mut requests = self.requests.lock().unwrap();
        let req = requests.get_mut(&id).ok_or_else(|| Error::Internal("withdrawal request not found".into()))?;
        req.ledger_tx_ids.extend_from_slice(tx_ids);
        Ok(())
    }

    async fn list_for_player(&self, player_id: PlayerId, limit: u32, before: Option<DateTime<Utc>>) -> Result<Vec<WithdrawalRequest>> {
        let requests = self.requests.lock().unwrap();
        let mut rows: Vec<WithdrawalRequest> = requests
            .values()
            .filter(|r| r.player_id == player_id)
            .filter(|r| before.map_or(true, |b| r.created_at < b))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
