//! An in-memory `LedgerStore`, for unit tests and for exercising the
//! ledger's invariants without a database. Mirrors the role
//! `race-test`'s in-memory fakes play for the teacher's `StorageT` /
//! `TransportT` traits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use stakeboard_core::types::{Account, AccountId, AccountType, Amount, LedgerTransaction, PlayerId, ReferenceKind};
use stakeboard_core::{Error, Result};

use crate::store::{LedgerStore, TransferLeg};

struct State {
    accounts: HashMap<AccountId, Account>,
    singletons: HashMap<AccountType, AccountId>,
    player_accounts: HashMap<(PlayerId, AccountType), AccountId>,
    transactions: Vec<LedgerTransaction>,
}

pub struct MemoryLedgerStore {
    state: Mutex<State>,
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                accounts: HashMap::new(),
                singletons: HashMap::new(),
                player_accounts: HashMap::new(),
                transactions: Vec::new(),
            }),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_account(&self, id: AccountId) -> Result<Account> {
        let state = self.state.lock().unwrap();
        state.accounts.get(&id).cloned().ok_or(Error::UnknownAccount)
    }

    async fn ensure_player_account(&self, player_id: PlayerId, account_type: AccountType) -> Result<Account> {
        let mut state = self.state.lock().unwrap();
        if let Some(id) = state.player_accounts.get(&(player_id, account_type)) {
            return Ok(state.accounts[id].clone());
        }
        let id = Uuid::new_v4();
        let account = Account {
            id,
            account_type,
            owner: Some(player_id),
            balance: 0,
        };
        state.accounts.insert(id, account.clone());
        state.player_accounts.insert((player_id, account_type), id);
        Ok(account)
    }

    async fn ensure_singleton_account(&self, account_type: AccountType) -> Result<Account> {
        let mut state = self.state.lock().unwrap();
        if let Some(id) = state.singletons.get(&account_type) {
            return Ok(state.accounts[id].clone());
        }
        let id = Uuid::new_v4();
        let account = Account {
            id,
            account_type,
            owner: None,
            balance: 0,
        };
        state.accounts.insert(id, account.clone());
        state.singletons.insert(account_type, id);
        Ok(account)
    }

    async fn apply_transfer_group(
        &self,
        legs: &[TransferLeg],
        reference_kind: ReferenceKind,
        reference_id: &str,
    ) -> Result<Vec<LedgerTransaction>> {
        let mut state = self.state.lock().unwrap();

        // Deterministic lock ordering: touch accounts in ascending id
        // order. A single mutex already serializes us, but we compute
        // projected balances in this order so error messages are stable
        // and so the real (DB-backed) implementation's behavior is
        // faithfully mirrored in tests.
        let mut touched: Vec<AccountId> = legs.iter().flat_map(|l| [l.from, l.to]).collect();
        touched.sort();
        touched.dedup();
        for id in &touched {
            if !state.accounts.contains_key(id) {
                return Err(Error::UnknownAccount);
            }
        }

        let mut projected: HashMap<AccountId, Amount> = HashMap::new();
        for leg in legs {
            if leg.amount <= 0 {
                return Err(Error::NonPositiveAmount);
            }
            *projected.entry(leg.from).or_insert_with(|| state.accounts[&leg.from].balance) -= leg.amount;
            *projected.entry(leg.to).or_insert_with(|| state.accounts[&leg.to].balance) += leg.amount;
        }
        for (id, balance) in &projected {
            if *balance < 0 {
                let _ = id;
                return Err(Error::InsufficientFunds);
            }
        }

        for (id, balance) in projected {
            state.accounts.get_mut(&id).unwrap().balance = balance;
        }

        let now = Utc::now();
        let mut txs = Vec::with_capacity(legs.len());
        for leg in legs {
            let tx = LedgerTransaction {
                id: Uuid::new_v4(),
                debit_account_id: leg.from,
                credit_account_id: leg.to,
                amount: leg.amount,
                reference_kind,
                reference_id: reference_id.to_owned(),
                created_at: now,
            };
            state.transactions.push(tx.clone());
            txs.push(tx);
        }
        Ok(txs)
    }

    async fn balance(&self, account_id: AccountId) -> Result<Amount> {
        let state = self.state.lock().unwrap();
        state
            .accounts
            .get(&account_id)
            .map(|a| a.balance)
            .ok_or(Error::UnknownAccount)
    }

    async fn history(
        &self,
        account_id: AccountId,
        limit: u32,
        before: Option<chrono::DateTime<Utc>>,
    ) -> Result<Vec<LedgerTransaction>> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<LedgerTransaction> = state
            .transactions
            .iter()
            .filter(|t| t.debit_account_id == account_id || t.credit_account_id == account_id)
            .filter(|t| before.map_or(true, |b| t.created_at < b))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
