//! `RegistryStore` over Postgres: players, sessions, scoped action
//! tokens, and OTP codes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use stakeboard_core::types::{Player, PlayerId};
use stakeboard_core::{Error, Result};
use stakeboard_registry::service::ActionScope;
use stakeboard_registry::store::{ActionToken, RegistryStore, Session};

use crate::pg::pg_err;

pub struct PgRegistryStore {
    pool: PgPool,
}

impl PgRegistryStore {
    pub fn new(pool: PgPool) -> PgRegistryStore {
        PgRegistryStore { pool }
    }
}

fn scope_str(s: ActionScope) -> &'static str {
    match s {
        ActionScope::ViewProfile => "view_profile",
        ActionScope::StakeWinnings => "stake_winnings",
        ActionScope::Requeue => "requeue",
        ActionScope::Rematch => "rematch",
        ActionScope::ResetPin => "reset_pin",
    }
}

fn parse_scope(s: &str) -> Result<ActionScope> {
    Ok(match s {
        "view_profile" => ActionScope::ViewProfile,
        "stake_winnings" => ActionScope::StakeWinnings,
        "requeue" => ActionScope::Requeue,
        "rematch" => ActionScope::Rematch,
        "reset_pin" => ActionScope::ResetPin,
        other => return Err(Error::Storage(format!("unknown action scope {other}"))),
    })
}

fn player_from_row(row: &PgRow) -> Result<Player> {
    Ok(Player {
        id: row.try_get("id").map_err(pg_err)?,
        phone: row.try_get("phone").map_err(pg_err)?,
        display_name: row.try_get("display_name").map_err(pg_err)?,
        pin_hash: row.try_get("pin_hash").map_err(pg_err)?,
        pin_fail_count: row.try_get::<i32, _>("pin_fail_count").map_err(pg_err)? as u32,
        pin_fail_window_started_at: row.try_get("pin_fail_window_started_at").map_err(pg_err)?,
        lockout_until: row.try_get("lockout_until").map_err(pg_err)?,
        games_played: row.try_get::<i32, _>("games_played").map_err(pg_err)? as u32,
        games_won: row.try_get::<i32, _>("games_won").map_err(pg_err)? as u32,
        current_streak: row.try_get("current_streak").map_err(pg_err)?,
        created_at: row.try_get("created_at").map_err(pg_err)?,
    })
}

const PLAYER_COLUMNS: &str = "id, phone, display_name, pin_hash, pin_fail_count, pin_fail_window_started_at, \
     lockout_until, games_played, games_won, current_streak, created_at";

#[async_trait]
impl RegistryStore for PgRegistryStore {
    async fn get_player(&self, player_id: PlayerId) -> Result<Player> {
        let row = sqlx::query(&format!("select {PLAYER_COLUMNS} from players where id = $1"))
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or(Error::UnknownToken)?;
        player_from_row(&row)
    }

    async fn get_player_by_phone(&self, phone: &str) -> Result<Option<Player>> {
        let row = sqlx::query(&format!("select {PLAYER_COLUMNS} from players where phone = $1"))
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        row.as_ref().map(player_from_row).transpose()
    }

    async fn create_player(&self, phone: &str, display_name: &str) -> Result<Player> {
        let row = sqlx::query(&format!(
            "insert into players (id, phone, display_name) values ($1, $2, $3) returning {PLAYER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(phone)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(pg_err)?;
        player_from_row(&row)
    }

    async fn touch_player(&self, player_id: PlayerId, display_name: Option<&str>) -> Result<Player> {
        let row = sqlx::query(&format!(
            "update players set display_name = coalesce($2, display_name) where id = $1 returning {PLAYER_COLUMNS}"
        ))
        .bind(player_id)
        .bind(display_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?
        .ok_or(Error::UnknownToken)?;
        player_from_row(&row)
    }

    async fn set_pin_hash(&self, player_id: PlayerId, pin_hash: &str) -> Result<()> {
        sqlx::query("update players set pin_hash = $2 where id = $1")
            .bind(player_id)
            .bind(pin_hash)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(())
    }

    async fn increment_pin_failures(&self, player_id: PlayerId, now: DateTime<Utc>, window: chrono::Duration) -> Result<u32> {
        // A single statement decides reset-vs-increment so concurrent
        // failures against the same player can't race past each other.
        let row = sqlx::query(
            "update players set \
             pin_fail_count = case when pin_fail_window_started_at is null \
                 or $2 - pin_fail_window_started_at > make_interval(secs => $3) then 1 else pin_fail_count + 1 end, \
             pin_fail_window_started_at = case when pin_fail_window_started_at is null \
                 or $2 - pin_fail_window_started_at > make_interval(secs => $3) then $2 else pin_fail_window_started_at end \
             where id = $1 returning pin_fail_count",
        )
        .bind(player_id)
        .bind(now)
        .bind(window.num_seconds() as f64)
        .fetch_one(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(row.try_get::<i32, _>("pin_fail_count").map_err(pg_err)? as u32)
    }

    async fn clear_pin_failures(&self, player_id: PlayerId) -> Result<()> {
        sqlx::query("update players set pin_fail_count = 0, pin_fail_window_started_at = null where id = $1")
            .bind(player_id)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(())
    }

    async fn set_lockout(&self, player_id: PlayerId, until: Option<DateTime<Utc>>) -> Result<()> {
        sqlx::query("update players set lockout_until = $2 where id = $1")
            .bind(player_id)
            .bind(until)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(())
    }

    async fn record_match_result(&self, player_id: PlayerId, won: bool) -> Result<()> {
        sqlx::query(
            "update players set games_played = games_played + 1, \
             games_won = games_won + case when $2 then 1 else 0 end, \
             current_streak = case when $2 then greatest(current_streak, 0) + 1 else least(current_streak, 0) - 1 end \
             where id = $1",
        )
        .bind(player_id)
        .bind(won)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(())
    }

    async fn create_session(&self, token: &str, player_id: PlayerId, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("insert into sessions (token, player_id, expires_at) values ($1, $2, $3)")
            .bind(token)
            .bind(player_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let row = sqlx::query("select player_id, expires_at from sessions where token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;
        row.map(|r| {
            Ok(Session {
                player_id: r.try_get("player_id").map_err(pg_err)?,
                expires_at: r.try_get("expires_at").map_err(pg_err)?,
            })
        })
        .transpose()
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("delete from sessions where token = $1").bind(token).execute(&self.pool).await.map_err(pg_err)?;
        Ok(())
    }

    async fn create_action_token(
        &self,
        token: &str,
        player_id: PlayerId,
        scope: ActionScope,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("insert into action_tokens (token, player_id, scope, expires_at, used) values ($1, $2, $3, $4, false)")
            .bind(token)
            .bind(player_id)
            .bind(scope_str(scope))
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(())
    }

    async fn consume_action_token(&self, token: &str, expected_scope: ActionScope) -> Result<PlayerId> {
        let mut txn = self.pool.begin().await.map_err(pg_err)?;
        let row = sqlx::query("select player_id, scope, expires_at, used from action_tokens where token = $1 for update")
            .bind(token)
            .fetch_optional(&mut *txn)
            .await
            .map_err(pg_err)?
            .ok_or(Error::UnknownToken)?;

        let scope = parse_scope(row.try_get("scope").map_err(pg_err)?)?;
        let expires_at: DateTime<Utc> = row.try_get("expires_at").map_err(pg_err)?;
        let used: bool = row.try_get("used").map_err(pg_err)?;
        if used || scope != expected_scope || expires_at <= Utc::now() {
            return Err(Error::TokenScopeMismatch);
        }

        sqlx::query("update action_tokens set used = true where token = $1").bind(token).execute(&mut *txn).await.map_err(pg_err)?;
        txn.commit().await.map_err(pg_err)?;
        row.try_get("player_id").map_err(pg_err)
    }

    async fn store_otp(&self, phone: &str, code_hash: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("insert into otp_codes (id, phone, code_hash, expires_at, consumed) values ($1, $2, $3, $4, false)")
            .bind(Uuid::new_v4())
            .bind(phone)
            .bind(code_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        Ok(())
    }

    async fn verify_and_consume_otp(&self, phone: &str, code_hash: &str) -> Result<bool> {
        let mut txn = self.pool.begin().await.map_err(pg_err)?;
        let row = sqlx::query(
            "select id from otp_codes where phone = $1 and code_hash = $2 and consumed = false and expires_at > now() \
             order by created_at desc limit 1 for update",
        )
        .bind(phone)
        .bind(code_hash)
        .fetch_optional(&mut *txn)
        .await
        .map_err(pg_err)?;

        let Some(row) = row else {
            txn.commit().await.map_err(pg_err)?;
            return Ok(false);
        };
        let id: Uuid = row.try_get("id").map_err(pg_err)?;
        sqlx::query("update otp_codes set consumed = true where id = $1").bind(id).execute(&mut *txn).await.map_err(pg_err)?;
        txn.commit().await.map_err(pg_err)?;
        Ok(true)
    }
}
