use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Amount, LedgerTxId, PlayerId, WithdrawalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Dispatched,
    Settled,
    Failed,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub player_id: PlayerId,
    pub gross_amount: Amount,
    pub provider_fee: Amount,
    pub net_amount: Amount,
    pub destination_msisdn: String,
    pub status: WithdrawalStatus,
    pub ledger_tx_ids: Vec<LedgerTxId>,
    pub created_at: DateTime<Utc>,
}
