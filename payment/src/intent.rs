//! `PaymentIntent`: one row per collection or disbursement attempt, and
//! `PaymentStore`, the persistence seam the Orchestrator drives it
//! through. Status transitions are the idempotency boundary: a
//! `transition_status` call only ever moves `Pending` to a terminal
//! state, and reports whether it was the one that did so — callbacks
//! and sweeper polls alike check that before touching the ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use stakeboard_core::types::{Amount, LedgerTxId, PlayerId};
use stakeboard_core::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Collection,
    Disbursement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub kind: IntentKind,
    pub player_id: PlayerId,
    pub phone: String,
    pub amount: Amount,
    /// The queue entry id (collection) or withdrawal id (disbursement)
    /// this intent exists to fund.
    pub reference_id: String,
    pub status: IntentStatus,
    pub provider_ref: Option<String>,
    pub ledger_tx_ids: Vec<LedgerTxId>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create_intent(&self, intent: PaymentIntent) -> Result<PaymentIntent>;

    async fn get_intent(&self, id: Uuid) -> Result<PaymentIntent>;

    /// Applies status-precedence idempotently: only a `Pending` intent
    /// can transition, and only to a terminal status. Returns `true`
    /// only when this call performed the transition — a replayed or
    /// out-of-order callback against an already-terminal intent returns
    /// `false` without touching anything.
    async fn transition_status(&self, id: Uuid, new_status: IntentStatus, provider_ref: Option<String>) -> Result<bool>;

    async fn set_ledger_tx_ids(&self, id: Uuid, tx_ids: Vec<LedgerTxId>) -> Result<()>;

    /// Every `Pending` intent created before `older_than` — the
    /// sweeper's input, per the concurrency model's "periodic sweeper
    /// that queries the provider for stale pending intents".
    async fn list_stale_pending(&self, older_than: DateTime<Utc>) -> Result<Vec<PaymentIntent>>;
}
