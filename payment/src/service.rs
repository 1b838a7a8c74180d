//! The `PaymentOrchestrator` contract: `InitiateCollection`,
//! `OnCollectionCallback`, `InitiateDisbursement`,
//! `OnDisbursementCallback`, plus the stale-intent sweeper.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use stakeboard_core::types::{Account, AccountType, Amount, PlayerId, ReferenceKind, WithdrawalId, WithdrawalRequest, WithdrawalStatus};
use stakeboard_core::{Error, Result};
use stakeboard_ledger::Ledger;

use crate::intent::{IntentKind, IntentStatus, PaymentIntent, PaymentStore};
use crate::provider::{CollectionProvider, DisbursementProvider, ProviderStatus};
use crate::withdrawal::WithdrawalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOutcome {
    Credited,
    /// A replayed callback, an out-of-order pending re-delivery, or a
    /// failed collection — nothing further to do.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisbursementOutcome {
    Settled,
    Reversed,
    Ignored,
}

impl From<ProviderStatus> for IntentStatus {
    fn from(s: ProviderStatus) -> IntentStatus {
        match s {
            ProviderStatus::Pending => IntentStatus::Pending,
            ProviderStatus::Succeeded => IntentStatus::Succeeded,
            ProviderStatus::Failed => IntentStatus::Failed,
        }
    }
}

pub struct PaymentOrchestrator {
    store: Arc<dyn PaymentStore>,
    withdrawals: Arc<dyn WithdrawalStore>,
    ledger: Ledger,
    collection: Arc<dyn CollectionProvider>,
    disbursement: Arc<dyn DisbursementProvider>,
    /// Provider cut on a withdrawal's gross amount, in basis points.
    provider_fee_bps: u32,
}

impl PaymentOrchestrator {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        withdrawals: Arc<dyn WithdrawalStore>,
        ledger: Ledger,
        collection: Arc<dyn CollectionProvider>,
        disbursement: Arc<dyn DisbursementProvider>,
        provider_fee_bps: u32,
    ) -> PaymentOrchestrator {
        PaymentOrchestrator { store, withdrawals, ledger, collection, disbursement, provider_fee_bps }
    }

    /// Creates the player-facing `WithdrawalRequest` record, computes
    /// the provider fee, then drives the same hold-then-dispatch path
    /// `initiate_disbursement` uses for the net amount — linking the two
    /// by stashing the withdrawal id as the intent's reference id.
    pub async fn request_withdrawal(&self, player_id: PlayerId, gross_amount: Amount, destination_msisdn: &str) -> Result<WithdrawalId> {
        if gross_amount <= 0 {
            return Err(Error::NonPositiveAmount);
        }
        let provider_fee = gross_amount * self.provider_fee_bps as i64 / 10_000;
        let net_amount = gross_amount - provider_fee;

        let req = WithdrawalRequest {
            id: Uuid::new_v4(),
            player_id,
            gross_amount,
            provider_fee,
            net_amount,
            destination_msisdn: destination_msisdn.to_owned(),
            status: WithdrawalStatus::Pending,
            ledger_tx_ids: Vec::new(),
            created_at: Utc::now(),
        };
        let req = self.withdrawals.create(req).await?;

        let intent_id = self.initiate_disbursement(player_id, destination_msisdn, net_amount, &req.id.to_string()).await?;
        let intent = self.store.get_intent(intent_id).await?;
        self.withdrawals.append_ledger_tx_ids(req.id, &intent.ledger_tx_ids).await?;
        self.withdrawals.set_status(req.id, WithdrawalStatus::Dispatched).await?;
        Ok(req.id)
    }

    pub async fn list_withdrawals(&self, player_id: PlayerId, limit: u32, before: Option<DateTime<Utc>>) -> Result<Vec<WithdrawalRequest>> {
        self.withdrawals.list_for_player(player_id, limit, before).await
    }

    async fn house_account(&self, account_type: AccountType) -> Result<Account> {
        self.ledger.ensure_singleton_account(account_type).await
    }

    pub async fn initiate_collection(&self, player_id: PlayerId, phone: &str, amount: Amount, reference_id: &str) -> Result<Uuid> {
        let provider_ref = self.collection.initiate_collection(phone, amount, reference_id).await?;
        let intent = PaymentIntent {
            id: Uuid::new_v4(),
            kind: IntentKind::Collection,
            player_id,
            phone: phone.to_owned(),
            amount,
            reference_id: reference_id.to_owned(),
            status: IntentStatus::Pending,
            provider_ref: Some(provider_ref),
            ledger_tx_ids: Vec::new(),
            created_at: Utc::now(),
        };
        let intent = self.store.create_intent(intent).await?;
        Ok(intent.id)
    }

    /// Credits the player's wallet the first time a collection settles
    /// successfully; any replay of the same `(intentId, status)`, or a
    /// callback against an already-terminal intent, is a no-op.
    pub async fn on_collection_callback(&self, intent_id: Uuid, status: ProviderStatus, provider_tx_id: Option<String>) -> Result<CollectionOutcome> {
        if !self.store.transition_status(intent_id, status.into(), provider_tx_id).await? {
            return Ok(CollectionOutcome::Ignored);
        }
        if status != ProviderStatus::Succeeded {
            return Ok(CollectionOutcome::Ignored);
        }

        let intent = self.store.get_intent(intent_id).await?;
        let provider = self.house_account(AccountType::MobileMoneyProvider).await?;
        let (_, wallet) = self.ledger.ensure_player_accounts(intent.player_id).await?;
        let tx = self.ledger.transfer(provider.id, wallet.id, intent.amount, ReferenceKind::Deposit, &intent.reference_id).await?;
        self.store.set_ledger_tx_ids(intent_id, vec![tx.id]).await?;
        Ok(CollectionOutcome::Credited)
    }

    /// Moves `net_amount` from the player's winnings into the house's
    /// expense-hold immediately (so a concurrent withdrawal request
    /// can't double-spend the same winnings), then asks the provider to
    /// pay it out.
    pub async fn initiate_disbursement(&self, player_id: PlayerId, phone: &str, net_amount: Amount, reference_id: &str) -> Result<Uuid> {
        let (winnings, _) = self.ledger.ensure_player_accounts(player_id).await?;
        let expense_hold = self.house_account(AccountType::HouseExpense).await?;
        let hold_tx = self.ledger.transfer(winnings.id, expense_hold.id, net_amount, ReferenceKind::Withdraw, reference_id).await?;

        let provider_ref = self.disbursement.initiate_disbursement(phone, net_amount, reference_id).await?;
        let intent = PaymentIntent {
            id: Uuid::new_v4(),
            kind: IntentKind::Disbursement,
            player_id,
            phone: phone.to_owned(),
            amount: net_amount,
            reference_id: reference_id.to_owned(),
            status: IntentStatus::Pending,
            provider_ref: Some(provider_ref),
            ledger_tx_ids: vec![hold_tx.id],
            created_at: Utc::now(),
        };
        let intent = self.store.create_intent(intent).await?;
        Ok(intent.id)
    }

    /// On success, moves the held funds from expense-hold to the
    /// provider account (they already left the player's balance at
    /// request time). On failure, reverses the hold back to winnings.
    pub async fn on_disbursement_callback(&self, intent_id: Uuid, status: ProviderStatus) -> Result<DisbursementOutcome> {
        if !self.store.transition_status(intent_id, status.into(), None).await? {
            return Ok(DisbursementOutcome::Ignored);
        }

        let intent = self.store.get_intent(intent_id).await?;
        let expense_hold = self.house_account(AccountType::HouseExpense).await?;
        let outcome = match status {
            ProviderStatus::Succeeded => {
                let provider = self.house_account(AccountType::MobileMoneyProvider).await?;
                self.ledger.transfer(expense_hold.id, provider.id, intent.amount, ReferenceKind::Withdraw, &intent.reference_id).await?;
                DisbursementOutcome::Settled
            }
            ProviderStatus::Failed => {
                let (winnings, _) = self.ledger.ensure_player_accounts(intent.player_id).await?;
                self.ledger.transfer(expense_hold.id, winnings.id, intent.amount, ReferenceKind::Refund, &intent.reference_id).await?;
                DisbursementOutcome::Reversed
            }
            ProviderStatus::Pending => DisbursementOutcome::Ignored,
        };

        if let Ok(withdrawal_id) = Uuid::parse_str(&intent.reference_id) {
            let withdrawal_status = match outcome {
                DisbursementOutcome::Settled => Some(WithdrawalStatus::Settled),
                DisbursementOutcome::Reversed => Some(WithdrawalStatus::Failed),
                DisbursementOutcome::Ignored => None,
            };
            if let Some(s) = withdrawal_status {
                self.withdrawals.set_status(withdrawal_id, s).await?;
            }
        }

        Ok(outcome)
    }

    /// Polls the provider for every intent still `Pending` past
    /// `older_than`, feeding any now-terminal result through the same
    /// callback path a real webhook would take.
    pub async fn sweep_stale(&self, older_than: DateTime<Utc>) -> Result<usize> {
        let stale = self.store.list_stale_pending(older_than).await?;
        let mut swept = 0;
        for intent in stale {
            let Some(provider_ref) = intent.provider_ref.as_deref() else { continue };
            let status = match intent.kind {
                IntentKind::Collection => self.collection.poll_status(provider_ref).await?,
                IntentKind::Disbursement => self.disbursement.poll_status(provider_ref).await?,
            };
            if status == ProviderStatus::Pending {
                continue;
            }
            match intent.kind {
                IntentKind::Collection => {
                    self.on_collection_callback(intent.id, status, None).await?;
                }
                IntentKind::Disbursement => {
                    self.on_disbursement_callback(intent.id, status).await?;
                }
            }
            swept += 1;
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use stakeboard_core::types::{AccountType, ReferenceKind, WithdrawalStatus};
    use stakeboard_ledger::{Ledger, MemoryLedgerStore};

    use crate::fake::FakeProvider;
    use crate::memory::MemoryPaymentStore;
    use crate::provider::ProviderStatus;
    use crate::withdrawal::MemoryWithdrawalStore;

    use super::{CollectionOutcome, DisbursementOutcome, PaymentOrchestrator};

    const PROVIDER_FEE_BPS: u32 = 150; // 1.5%

    fn orchestrator() -> (PaymentOrchestrator, Ledger) {
        let ledger = Ledger::new(Arc::new(MemoryLedgerStore::default()));
        let orchestrator = PaymentOrchestrator::new(
            Arc::new(MemoryPaymentStore::default()),
            Arc::new(MemoryWithdrawalStore::default()),
            ledger.clone(),
            Arc::new(FakeProvider),
            Arc::new(FakeProvider),
            PROVIDER_FEE_BPS,
        );
        (orchestrator, ledger)
    }

    #[tokio::test]
    async fn successful_collection_credits_the_wallet_exactly_once() {
        let (orchestrator, ledger) = orchestrator();
        let player = Uuid::new_v4();
        let (_, wallet) = ledger.ensure_player_accounts(player).await.unwrap();

        let intent_id = orchestrator.initiate_collection(player, "0700000000", 500, "q1").await.unwrap();
        let first = orchestrator.on_collection_callback(intent_id, ProviderStatus::Succeeded, None).await.unwrap();
        assert_eq!(first, CollectionOutcome::Credited);
        assert_eq!(ledger.balance(wallet.id).await.unwrap(), 500);

        // Replay of the same terminal callback must not double-credit.
        let second = orchestrator.on_collection_callback(intent_id, ProviderStatus::Succeeded, None).await.unwrap();
        assert_eq!(second, CollectionOutcome::Ignored);
        assert_eq!(ledger.balance(wallet.id).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn failed_disbursement_reverses_the_hold_to_winnings() {
        let (orchestrator, ledger) = orchestrator();
        let player = Uuid::new_v4();
        let (winnings, wallet) = ledger.ensure_player_accounts(player).await.unwrap();
        let provider = ledger.ensure_singleton_account(AccountType::MobileMoneyProvider).await.unwrap();
        ledger.transfer(provider.id, wallet.id, 10_000, ReferenceKind::Deposit, "seed").await.unwrap();
        // seed winnings directly for the test via a payout-shaped transfer
        ledger.transfer(provider.id, winnings.id, 2000, ReferenceKind::Payout, "seed-winnings").await.unwrap();

        let intent_id = orchestrator.initiate_disbursement(player, "0700000000", 2000, "w1").await.unwrap();
        assert_eq!(ledger.balance(winnings.id).await.unwrap(), 0);

        let outcome = orchestrator.on_disbursement_callback(intent_id, ProviderStatus::Failed).await.unwrap();
        assert_eq!(outcome, DisbursementOutcome::Reversed);
        assert_eq!(ledger.balance(winnings.id).await.unwrap(), 2000);
    }

    #[tokio::test]
    async fn successful_disbursement_settles_expense_hold_to_provider() {
        let (orchestrator, ledger) = orchestrator();
        let player = Uuid::new_v4();
        let (winnings, _) = ledger.ensure_player_accounts(player).await.unwrap();
        let provider = ledger.ensure_singleton_account(AccountType::MobileMoneyProvider).await.unwrap();
        ledger.transfer(provider.id, winnings.id, 2000, ReferenceKind::Payout, "seed-winnings").await.unwrap();

        let intent_id = orchestrator.initiate_disbursement(player, "0700000000", 2000, "w2").await.unwrap();
        let outcome = orchestrator.on_disbursement_callback(intent_id, ProviderStatus::Succeeded).await.unwrap();
        assert_eq!(outcome, DisbursementOutcome::Settled);

        let expense_hold = ledger.ensure_singleton_account(AccountType::HouseExpense).await.unwrap();
        assert_eq!(ledger.balance(expense_hold.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sweep_stale_credits_a_pending_collection_the_provider_now_reports_settled() {
        let (orchestrator, ledger) = orchestrator();
        let player = Uuid::new_v4();
        let (_, wallet) = ledger.ensure_player_accounts(player).await.unwrap();

        let intent_id = orchestrator.initiate_collection(player, "0700000000", 300, "q2").await.unwrap();
        let swept = orchestrator.sweep_stale(chrono::Utc::now() + chrono::Duration::seconds(1)).await.unwrap();
        assert_eq!(swept, 1);
        assert_eq!(ledger.balance(wallet.id).await.unwrap(), 300);

        let _ = intent_id;
    }

    #[tokio::test]
    async fn request_withdrawal_deducts_the_provider_fee_and_settles_on_success() {
        let (orchestrator, ledger) = orchestrator();
        let player = Uuid::new_v4();
        let (winnings, _) = ledger.ensure_player_accounts(player).await.unwrap();
        let provider = ledger.ensure_singleton_account(AccountType::MobileMoneyProvider).await.unwrap();
        ledger.transfer(provider.id, winnings.id, 10_000, ReferenceKind::Payout, "seed-winnings").await.unwrap();

        let withdrawal_id = orchestrator.request_withdrawal(player, 10_000, "0711000000").await.unwrap();
        // 1.5% of 10_000 = 150, net 9850 moves to the hold, leaving winnings at 0.
        assert_eq!(ledger.balance(winnings.id).await.unwrap(), 0);

        // FakeProvider settles immediately; find its intent and replay the
        // callback the way a real webhook would deliver it.
        let swept = orchestrator.sweep_stale(chrono::Utc::now() + chrono::Duration::seconds(1)).await.unwrap();
        assert_eq!(swept, 1);

        let req = orchestrator.withdrawals.get(withdrawal_id).await.unwrap();
        assert_eq!(req.status, WithdrawalStatus::Settled);
        assert_eq!(req.provider_fee, 150);
        assert_eq!(req.net_amount, 9850);
    }
}
