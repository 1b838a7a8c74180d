//! The `Matchmaker` contract: `Enqueue`, `PollStatus`, `CancelQueue`,
//! `Requeue`, `RedeemPrivateInvite`, plus an expiry sweep.
//!
//! Concurrency follows spec.md §5 literally: one `tokio::sync::Mutex`
//! per stake tier guards the scan-then-transition sequence of the
//! public pairing algorithm, so two concurrent `Enqueue` calls at the
//! same stake can never both see the same oldest waiter and double-pair
//! it. The store itself stays simple (no compare-and-swap) because the
//! tier lock is what actually serializes access.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use stakeboard_core::types::{AccountType, Amount, Match, MatchStatus, MatchVariant, PlayerId, QueueEntry, QueueMode, QueueStatus};
use stakeboard_core::{token, Error, Result};
use stakeboard_ledger::Ledger;
use stakeboard_match_runtime::MatchStore;

use crate::store::MatchmakerStore;

#[derive(Debug, Clone)]
pub struct MatchmakerConfig {
    pub commission_bps: u32,
    pub queue_ttl: Duration,
    /// Variant new public/private-host entries at this stake spawn into.
    /// A single deployment picks one variant per stake tier in practice;
    /// kept simple here as a single global default.
    pub variant: MatchVariant,
}

impl Default for MatchmakerConfig {
    fn default() -> Self {
        Self {
            commission_bps: 1000, // 10%
            queue_ttl: Duration::minutes(3),
            variant: MatchVariant::Cards,
        }
    }
}

#[derive(Debug)]
pub enum PollOutcome {
    Queued,
    Matched { game_token: String, player_token: String },
    Expired,
    Cancelled,
}

pub struct EnqueueOutcome {
    pub queue_token: String,
    pub match_code: Option<String>,
    /// `Some` when this enqueue immediately paired with a waiter.
    pub matched: Option<MatchPairing>,
}

pub struct MatchPairing {
    pub game_token: String,
    pub player_token: String,
}

pub struct InviteDetails {
    pub stake: Amount,
    pub status: QueueStatus,
}

pub struct Matchmaker {
    store: Arc<dyn MatchmakerStore>,
    match_store: Arc<dyn MatchStore>,
    ledger: Ledger,
    config: MatchmakerConfig,
    tier_locks: AsyncMutex<HashMap<Amount, Arc<AsyncMutex<()>>>>,
}

impl Matchmaker {
    pub fn new(store: Arc<dyn MatchmakerStore>, match_store: Arc<dyn MatchStore>, ledger: Ledger, config: MatchmakerConfig) -> Self {
        Self {
            store,
            match_store,
            ledger,
            config,
            tier_locks: AsyncMutex::new(HashMap::new()),
        }
    }

    fn commission_for(&self, stake: Amount) -> Amount {
        (stake * self.config.commission_bps as i64) / 10_000
    }

    async fn tier_lock(&self, stake: Amount) -> Arc<AsyncMutex<()>> {
        let mut locks = self.tier_locks.lock().await;
        locks.entry(stake).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    pub async fn enqueue(
        &self,
        player_id: PlayerId,
        stake: Amount,
        mode: QueueMode,
        invite_phone: Option<String>,
        source: AccountType,
    ) -> Result<EnqueueOutcome> {
        if stake <= 0 {
            return Err(Error::StakeOutOfRange);
        }
        if self.store.has_live_entry(player_id).await? {
            return Err(Error::AlreadyQueued);
        }

        let commission = self.commission_for(stake);
        match source {
            AccountType::PlayerWinnings => {
                self.ledger.stake_and_enqueue_from_winnings(player_id, stake, commission, &player_id.to_string()).await?;
            }
            _ => {
                self.ledger.stake_and_enqueue(player_id, stake, commission, &player_id.to_string()).await?;
            }
        }

        let match_code = if mode == QueueMode::PrivateHost {
            Some(self.mint_match_code().await?)
        } else {
            None
        };

        let now = Utc::now();
        let entry = QueueEntry {
            id: Uuid::new_v4(),
            player_id,
            stake,
            mode,
            match_code: match_code.clone(),
            invite_phone,
            source,
            status: QueueStatus::Queued,
            queue_token: token::opaque_token(),
            created_at: now,
            expires_at: now + self.config.queue_ttl,
        };
        let entry = self.store.insert(entry).await?;

        let matched = if mode == QueueMode::Public {
            self.try_pair_public(&entry).await?
        } else {
            None
        };

        Ok(EnqueueOutcome {
            queue_token: entry.queue_token,
            match_code,
            matched,
        })
    }

    async fn mint_match_code(&self) -> Result<String> {
        for _ in 0..8 {
            let code = token::match_code();
            if !self.store.match_code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(Error::Internal("match code space exhausted".into()))
    }

    /// Scans the tier for a waiter and pairs with the new entry if one
    /// exists. Held entirely under the stake's tier lock.
    async fn try_pair_public(&self, new_entry: &QueueEntry) -> Result<Option<MatchPairing>> {
        let lock = self.tier_lock(new_entry.stake).await;
        let _guard = lock.lock().await;

        let Some(waiter) = self.store.oldest_public_queued(new_entry.stake, new_entry.player_id).await? else {
            return Ok(None);
        };
        // re-fetch the new entry under the lock in case something else raced it
        let fresh = self.store.get(new_entry.id).await?;
        if fresh.status != QueueStatus::Queued {
            return Ok(None);
        }

        let pairing = self.pair(&waiter, &fresh).await?;
        Ok(Some(pairing))
    }

    async fn pair(&self, host: &QueueEntry, guest: &QueueEntry) -> Result<MatchPairing> {
        let game_token = token::opaque_token();
        let player_tokens = [token::opaque_token(), token::opaque_token()];
        let m = Match {
            id: Uuid::new_v4(),
            game_token: game_token.clone(),
            player_ids: [host.player_id, guest.player_id],
            player_tokens: player_tokens.clone(),
            stake: host.stake,
            commission_per_player: self.commission_for(host.stake),
            variant: self.config.variant,
            status: MatchStatus::Waiting,
            state_blob: Vec::new(),
            winner_id: None,
            win_type: None,
            terminal_reason: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        self.match_store.create_match(m).await?;

        self.store.set_status(host.id, QueueStatus::Matched).await?;
        self.store.set_status(guest.id, QueueStatus::Matched).await?;
        self.store.record_pairing(host.id, &game_token, &player_tokens[0]).await?;
        self.store.record_pairing(guest.id, &game_token, &player_tokens[1]).await?;

        Ok(MatchPairing {
            game_token,
            player_token: player_tokens[1].clone(),
        })
    }

    pub async fn poll_status(&self, queue_token: &str) -> Result<PollOutcome> {
        let entry = self.store.get_by_token(queue_token).await?.ok_or(Error::QueueEntryNotFound)?;
        match entry.status {
            QueueStatus::Queued => Ok(PollOutcome::Queued),
            QueueStatus::Matched => match self.store.get_pairing(entry.id).await? {
                Some((game_token, player_token)) => Ok(PollOutcome::Matched { game_token, player_token }),
                // Transition and pairing record are written in the same
                // lock-held section in `pair`, so this should be
                // unreachable in practice; treat it as still-settling.
                None => Ok(PollOutcome::Queued),
            },
            QueueStatus::Expired => Ok(PollOutcome::Expired),
            QueueStatus::Cancelled | QueueStatus::Refunded => Ok(PollOutcome::Cancelled),
        }
    }

    pub async fn cancel_queue(&self, queue_token: &str) -> Result<()> {
        let entry = self.store.get_by_token(queue_token).await?.ok_or(Error::QueueEntryNotFound)?;
        if entry.status != QueueStatus::Queued {
            return Err(Error::QueueEntryNotLive);
        }
        let commission = self.commission_for(entry.stake);
        self.ledger
            .refund_stake_full(entry.player_id, entry.source, entry.stake, commission, &entry.id.to_string())
            .await?;
        self.store.set_status(entry.id, QueueStatus::Cancelled).await
    }

    pub async fn requeue(&self, player_id: PlayerId, previous_entry_id: uuid::Uuid) -> Result<EnqueueOutcome> {
        let previous = self.store.get(previous_entry_id).await?;
        if previous.player_id != player_id {
            return Err(Error::QueueEntryNotFound);
        }
        if previous.status != QueueStatus::Expired && previous.status != QueueStatus::Cancelled {
            return Err(Error::QueueEntryNotLive);
        }
        self.enqueue(player_id, previous.stake, previous.mode, previous.invite_phone.clone(), previous.source).await
    }

    pub async fn invite_details(&self, match_code: &str) -> Result<InviteDetails> {
        let entry = self.store.get_by_match_code(match_code).await?.ok_or(Error::MatchCodeNotLive)?;
        Ok(InviteDetails { stake: entry.stake, status: entry.status })
    }

    /// Declines a private invite: refunds the host's stake and commission
    /// in full and retires the match code, the same settlement
    /// `cancel_queue` gives a player backing out of their own entry.
    pub async fn decline_invite(&self, match_code: &str) -> Result<()> {
        let entry = self.store.get_by_match_code(match_code).await?.ok_or(Error::MatchCodeNotLive)?;
        if entry.status != QueueStatus::Queued {
            return Err(Error::MatchCodeNotLive);
        }
        let commission = self.commission_for(entry.stake);
        self.ledger
            .refund_stake_full(entry.player_id, entry.source, entry.stake, commission, &entry.id.to_string())
            .await?;
        self.store.set_status(entry.id, QueueStatus::Cancelled).await
    }

    pub async fn redeem_private_invite(&self, match_code: &str, joining_player_id: PlayerId, stake: Amount) -> Result<MatchPairing> {
        let host = self.store.get_by_match_code(match_code).await?.ok_or(Error::MatchCodeNotLive)?;
        if host.status != QueueStatus::Queued {
            return Err(Error::MatchCodeNotLive);
        }
        if host.stake != stake {
            return Err(Error::StakeMismatch);
        }
        if self.store.has_live_entry(joining_player_id).await? {
            return Err(Error::AlreadyQueued);
        }

        let lock = self.tier_lock(stake).await;
        let _guard = lock.lock().await;

        // Re-check liveness under the lock: redemption is single-use.
        let fresh_host = self.store.get(host.id).await?;
        if fresh_host.status != QueueStatus::Queued {
            return Err(Error::MatchCodeNotLive);
        }

        let commission = self.commission_for(stake);
        self.ledger
            .stake_and_enqueue(joining_player_id, stake, commission, &joining_player_id.to_string())
            .await?;

        let now = Utc::now();
        let guest_entry = QueueEntry {
            id: Uuid::new_v4(),
            player_id: joining_player_id,
            stake,
            mode: QueueMode::PrivateGuest,
            match_code: Some(match_code.to_owned()),
            invite_phone: None,
            source: AccountType::PlayerWallet,
            status: QueueStatus::Queued,
            queue_token: token::opaque_token(),
            created_at: now,
            expires_at: now + self.config.queue_ttl,
        };
        let guest_entry = self.store.insert(guest_entry).await?;

        self.pair(&fresh_host, &guest_entry).await
    }

    /// Periodic sweep: every expired `queued` entry is refunded (minus
    /// the no-show fee, per the Ledger's `expire_stake`) and flipped to
    /// `expired`. Intended to be called on a timer by the `server`
    /// binary, mirroring the Payment Orchestrator's stale-intent
    /// sweeper.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let expired = self.store.list_expired(now).await?;
        let count = expired.len();
        for entry in expired {
            let commission = self.commission_for(entry.stake);
            self.ledger
                .expire_stake(entry.player_id, entry.source, entry.stake, commission, &entry.id.to_string())
                .await?;
            self.store.set_status(entry.id, QueueStatus::Expired).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use stakeboard_core::types::{AccountType, QueueMode, ReferenceKind};
    use stakeboard_ledger::{Ledger, MemoryLedgerStore};
    use stakeboard_match_runtime::memory::MemoryMatchStore;

    use crate::memory::MemoryMatchmakerStore;

    use super::{Matchmaker, MatchmakerConfig};

    async fn seeded_matchmaker() -> (Matchmaker, Ledger, [Uuid; 2]) {
        let ledger = Ledger::new(Arc::new(MemoryLedgerStore::default()));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let provider = ledger.ensure_singleton_account(AccountType::MobileMoneyProvider).await.unwrap();
        for player in [a, b] {
            let (_, wallet) = ledger.ensure_player_accounts(player).await.unwrap();
            ledger.transfer(provider.id, wallet.id, 10_000, ReferenceKind::Deposit, "seed").await.unwrap();
        }
        let mm = Matchmaker::new(
            Arc::new(MemoryMatchmakerStore::default()),
            Arc::new(MemoryMatchStore::default()),
            ledger.clone(),
            MatchmakerConfig::default(),
        );
        (mm, ledger, [a, b])
    }

    #[tokio::test]
    async fn two_public_entries_at_same_stake_pair() {
        let (mm, _ledger, [a, b]) = seeded_matchmaker().await;
        let first = mm.enqueue(a, 1000, QueueMode::Public, None, AccountType::PlayerWallet).await.unwrap();
        assert!(first.matched.is_none());

        let second = mm.enqueue(b, 1000, QueueMode::Public, None, AccountType::PlayerWallet).await.unwrap();
        assert!(second.matched.is_some());

        let polled = match mm.poll_status(&first.queue_token).await.unwrap() {
            super::PollOutcome::Matched { .. } => true,
            _ => false,
        };
        assert!(polled);
    }

    #[tokio::test]
    async fn second_enqueue_from_same_player_rejected() {
        let (mm, _ledger, [a, _b]) = seeded_matchmaker().await;
        mm.enqueue(a, 1000, QueueMode::Public, None, AccountType::PlayerWallet).await.unwrap();
        let err = mm.enqueue(a, 1000, QueueMode::Public, None, AccountType::PlayerWallet).await.unwrap_err();
        assert!(matches!(err, stakeboard_core::Error::AlreadyQueued));
    }

    #[tokio::test]
    async fn private_invite_redeems_with_matching_stake() {
        let (mm, _ledger, [a, b]) = seeded_matchmaker().await;
        let host = mm.enqueue(a, 1000, QueueMode::PrivateHost, None, AccountType::PlayerWallet).await.unwrap();
        let code = host.match_code.unwrap();

        let pairing = mm.redeem_private_invite(&code, b, 1000).await.unwrap();
        assert!(!pairing.game_token.is_empty());

        let err = mm.redeem_private_invite(&code, Uuid::new_v4(), 1000).await.unwrap_err();
        assert!(matches!(err, stakeboard_core::Error::MatchCodeNotLive));
    }

    #[tokio::test]
    async fn private_invite_rejects_stake_mismatch() {
        let (mm, _ledger, [a, b]) = seeded_matchmaker().await;
        let host = mm.enqueue(a, 1000, QueueMode::PrivateHost, None, AccountType::PlayerWallet).await.unwrap();
        let code = host.match_code.unwrap();

        let err = mm.redeem_private_invite(&code, b, 500).await.unwrap_err();
        assert!(matches!(err, stakeboard_core::Error::StakeMismatch));
    }

    #[tokio::test]
    async fn cancel_refunds_stake_and_commission_in_full() {
        let (mm, ledger, [a, _b]) = seeded_matchmaker().await;
        let (_, wallet) = ledger.ensure_player_accounts(a).await.unwrap();
        let before = ledger.balance(wallet.id).await.unwrap();

        let outcome = mm.enqueue(a, 1000, QueueMode::Public, None, AccountType::PlayerWallet).await.unwrap();
        mm.cancel_queue(&outcome.queue_token).await.unwrap();

        assert_eq!(ledger.balance(wallet.id).await.unwrap(), before);
    }
}
