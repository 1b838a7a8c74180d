use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Amount, LedgerTxId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Stake,
    Payout,
    Commission,
    Refund,
    Withdraw,
    Deposit,
    NoShowFee,
}

/// An immutable double-entry row. Every mutation of any account balance
/// is accompanied by exactly one of these whose debit and credit arms
/// sum to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: LedgerTxId,
    pub debit_account_id: AccountId,
    pub credit_account_id: AccountId,
    pub amount: Amount,
    pub reference_kind: ReferenceKind,
    pub reference_id: String,
    pub created_at: DateTime<Utc>,
}
