use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stakeboard_core::types::{Account, AccountId, AccountType, Amount, LedgerTransaction, PlayerId, ReferenceKind};
use stakeboard_core::Result;

/// One leg of a transfer: move `amount` out of `from` and into `to`.
#[derive(Debug, Clone, Copy)]
pub struct TransferLeg {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
}

/// The persistence seam for the ledger. Implementations are responsible
/// for the locking algorithm in the spec's Ledger contract: lock every
/// account row touched by a group in deterministic ascending-id order,
/// re-read balances, reject if any source would go negative, write the
/// ledger rows and update balances, all inside one atomic transaction.
///
/// `apply_transfer_group` is the only mutation entry point; everything
/// else is a read.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_account(&self, id: AccountId) -> Result<Account>;

    /// Idempotent: returns the existing account if one of this type
    /// already exists for this player, otherwise creates it with a zero
    /// balance.
    async fn ensure_player_account(&self, player_id: PlayerId, account_type: AccountType) -> Result<Account>;

    /// Idempotent: returns the existing singleton account (escrow,
    /// house buckets, mobile-money provider) or creates it.
    async fn ensure_singleton_account(&self, account_type: AccountType) -> Result<Account>;

    /// Apply every leg in `legs` atomically: all succeed or none do.
    /// Rejects (without partial effect) if any leg's source account
    /// would go negative once every leg referencing it is applied.
    async fn apply_transfer_group(
        &self,
        legs: &[TransferLeg],
        reference_kind: ReferenceKind,
        reference_id: &str,
    ) -> Result<Vec<LedgerTransaction>>;

    async fn balance(&self, account_id: AccountId) -> Result<Amount>;

    async fn history(
        &self,
        account_id: AccountId,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerTransaction>>;
}
