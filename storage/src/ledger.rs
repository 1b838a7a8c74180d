//! `LedgerStore` over Postgres. `apply_transfer_group` is the only
//! writer: it takes `FOR UPDATE` locks on every touched account in
//! ascending id order (the deterministic lock order `MemoryLedgerStore`
//! already documents), re-reads balances under that lock, rejects the
//! whole group if any leg would take a balance negative, then writes
//! every leg's ledger row and balance update in the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use stakeboard_core::types::{Account, AccountId, AccountType, Amount, LedgerTransaction, PlayerId, ReferenceKind};
use stakeboard_core::{Error, Result};
use stakeboard_ledger::store::{LedgerStore, TransferLeg};

use crate::pg::pg_err;

pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> PgLedgerStore {
        PgLedgerStore { pool }
    }
}

fn account_type_str(t: AccountType) -> &'static str {
    match t {
        AccountType::PlayerWinnings => "player_winnings",
        AccountType::PlayerWallet => "player_wallet",
        AccountType::Escrow => "escrow",
        AccountType::HouseCommission => "house_commission",
        AccountType::HouseExpense => "house_expense",
        AccountType::MobileMoneyProvider => "mobile_money_provider",
    }
}

fn parse_account_type(s: &str) -> Result<AccountType> {
    Ok(match s {
        "player_winnings" => AccountType::PlayerWinnings,
        "player_wallet" => AccountType::PlayerWallet,
        "escrow" => AccountType::Escrow,
        "house_commission" => AccountType::HouseCommission,
        "house_expense" => AccountType::HouseExpense,
        "mobile_money_provider" => AccountType::MobileMoneyProvider,
        other => return Err(Error::Storage(format!("unknown account_type {other}"))),
    })
}

fn reference_kind_str(k: ReferenceKind) -> &'static str {
    match k {
        ReferenceKind::Stake => "stake",
        ReferenceKind::Payout => "payout",
        ReferenceKind::Commission => "commission",
        ReferenceKind::Refund => "refund",
        ReferenceKind::Withdraw => "withdraw",
        ReferenceKind::Deposit => "deposit",
        ReferenceKind::NoShowFee => "no_show_fee",
    }
}

fn parse_reference_kind(s: &str) -> Result<ReferenceKind> {
    Ok(match s {
        "stake" => ReferenceKind::Stake,
        "payout" => ReferenceKind::Payout,
        "commission" => ReferenceKind::Commission,
        "refund" => ReferenceKind::Refund,
        "withdraw" => ReferenceKind::Withdraw,
        "deposit" => ReferenceKind::Deposit,
        "no_show_fee" => ReferenceKind::NoShowFee,
        other => return Err(Error::Storage(format!("unknown reference_kind {other}"))),
    })
}

fn account_from_row(row: &sqlx::postgres::PgRow) -> Result<Account> {
    Ok(Account {
        id: row.try_get("id").map_err(pg_err)?,
        account_type: parse_account_type(row.try_get("account_type").map_err(pg_err)?)?,
        owner: row.try_get("owner").map_err(pg_err)?,
        balance: row.try_get("balance").map_err(pg_err)?,
    })
}

fn tx_from_row(row: &sqlx::postgres::PgRow) -> Result<LedgerTransaction> {
    Ok(LedgerTransaction {
        id: row.try_get("id").map_err(pg_err)?,
        debit_account_id: row.try_get("debit_account_id").map_err(pg_err)?,
        credit_account_id: row.try_get("credit_account_id").map_err(pg_err)?,
        amount: row.try_get("amount").map_err(pg_err)?,
        reference_kind: parse_reference_kind(row.try_get("reference_kind").map_err(pg_err)?)?,
        reference_id: row.try_get("reference_id").map_err(pg_err)?,
        created_at: row.try_get("created_at").map_err(pg_err)?,
    })
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_account(&self, id: AccountId) -> Result<Account> {
        let row = sqlx::query("select id, account_type, owner, balance from accounts where id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or(Error::UnknownAccount)?;
        account_from_row(&row)
    }

    async fn ensure_player_account(&self, player_id: PlayerId, account_type: AccountType) -> Result<Account> {
        let row = sqlx::query(
            "insert into accounts (id, account_type, owner, balance) values ($1, $2, $3, 0) \
             on conflict (account_type, owner) do update set account_type = excluded.account_type \
             returning id, account_type, owner, balance",
        )
        .bind(Uuid::new_v4())
        .bind(account_type_str(account_type))
        .bind(player_id)
        .fetch_one(&self.pool)
        .await
        .map_err(pg_err)?;
        account_from_row(&row)
    }

    async fn ensure_singleton_account(&self, account_type: AccountType) -> Result<Account> {
        let row = sqlx::query(
            "insert into accounts (id, account_type, owner, balance) values ($1, $2, null, 0) \
             on conflict (account_type) where owner is null do update set account_type = excluded.account_type \
             returning id, account_type, owner, balance",
        )
        .bind(Uuid::new_v4())
        .bind(account_type_str(account_type))
        .fetch_one(&self.pool)
        .await
        .map_err(pg_err)?;
        account_from_row(&row)
    }

    async fn apply_transfer_group(
        &self,
        legs: &[TransferLeg],
        reference_kind: ReferenceKind,
        reference_id: &str,
    ) -> Result<Vec<LedgerTransaction>> {
        let mut touched: Vec<AccountId> = legs.iter().flat_map(|l| [l.from, l.to]).collect();
        touched.sort();
        touched.dedup();

        let mut txn = self.pool.begin().await.map_err(pg_err)?;

        let mut balances = std::collections::HashMap::new();
        for id in &touched {
            let row = sqlx::query("select balance from accounts where id = $1 for update")
                .bind(id)
                .fetch_optional(&mut *txn)
                .await
                .map_err(pg_err)?
                .ok_or(Error::UnknownAccount)?;
            let balance: Amount = row.try_get("balance").map_err(pg_err)?;
            balances.insert(*id, balance);
        }

        for leg in legs {
            if leg.amount <= 0 {
                return Err(Error::NonPositiveAmount);
            }
            *balances.get_mut(&leg.from).unwrap() -= leg.amount;
            *balances.get_mut(&leg.to).unwrap() += leg.amount;
        }
        for balance in balances.values() {
            if *balance < 0 {
                return Err(Error::InsufficientFunds);
            }
        }

        for (id, balance) in &balances {
            sqlx::query("update accounts set balance = $1 where id = $2")
                .bind(balance)
                .bind(id)
                .execute(&mut *txn)
                .await
                .map_err(pg_err)?;
        }

        let now: DateTime<Utc> = Utc::now();
        let mut txs = Vec::with_capacity(legs.len());
        for leg in legs {
            let id = Uuid::new_v4();
            sqlx::query(
                "insert into ledger_transactions (id, debit_account_id, credit_account_id, amount, reference_kind, reference_id, created_at) \
                 values ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(id)
            .bind(leg.from)
            .bind(leg.to)
            .bind(leg.amount)
            .bind(reference_kind_str(reference_kind))
            .bind(reference_id)
            .bind(now)
            .execute(&mut *txn)
            .await
            .map_err(pg_err)?;
            txs.push(LedgerTransaction {
                id,
                debit_account_id: leg.from,
                credit_account_id: leg.to,
                amount: leg.amount,
                reference_kind,
                reference_id: reference_id.to_owned(),
                created_at: now,
            });
        }

        txn.commit().await.map_err(pg_err)?;
        Ok(txs)
    }

    async fn balance(&self, account_id: AccountId) -> Result<Amount> {
        let row = sqlx::query("select balance from accounts where id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or(Error::UnknownAccount)?;
        row.try_get("balance").map_err(pg_err)
    }

    async fn history(&self, account_id: AccountId, limit: u32, before: Option<DateTime<Utc>>) -> Result<Vec<LedgerTransaction>> {
        let rows = sqlx::query(
            "select id, debit_account_id, credit_account_id, amount, reference_kind, reference_id, created_at \
             from ledger_transactions \
             where (debit_account_id = $1 or credit_account_id = $1) and ($2::timestamptz is null or created_at < $2) \
             order by created_at desc limit $3",
        )
        .bind(account_id)
        .bind(before)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        rows.iter().map(tx_from_row).collect()
    }
}
