//! The `Registry` contract: `CheckStatus`, `CreateOrTouch`, `SetPIN`,
//! `VerifyPIN`, `ResetPIN`, `EndSession`, plus the OTP path used to
//! mint a `reset_pin`-scoped action token without a PIN.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use stakeboard_core::types::{Player, PlayerId};
use stakeboard_core::{phone, token, Error, Result};

use crate::otp::{generate_code, SmsProvider};
use crate::store::RegistryStore;

/// Named intents an action token can be scoped to. `VerifyPIN` and
/// `VerifyOTP` both mint one of these alongside (for `VerifyPIN`) a
/// session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionScope {
    ViewProfile,
    StakeWinnings,
    Requeue,
    Rematch,
    ResetPin,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub pin_failure_limit: u32,
    pub lockout_window: Duration,
    pub lockout_duration: Duration,
    pub session_ttl: Duration,
    pub action_token_ttl: Duration,
    pub otp_ttl: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pin_failure_limit: 5,
            lockout_window: Duration::minutes(15),
            lockout_duration: Duration::minutes(15),
            session_ttl: Duration::days(30),
            action_token_ttl: Duration::minutes(5),
            otp_ttl: Duration::minutes(5),
        }
    }
}

pub struct CheckStatus {
    pub exists: bool,
    pub has_pin: bool,
    pub display_name: Option<String>,
}

/// The public-facing slice of a player's record for `GET
/// /player/{phone}/stats` — no `pin_hash` or `lockout_until`.
pub struct PublicStats {
    pub display_name: String,
    pub games_played: u32,
    pub games_won: u32,
    pub current_streak: i32,
}

pub struct VerifyOutcome {
    pub session_token: String,
    pub action_token: String,
    pub player: Player,
}

#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn RegistryStore>,
    sms: Arc<dyn SmsProvider>,
    config: RegistryConfig,
    hasher: Argon2<'static>,
}

impl Registry {
    pub fn new(store: Arc<dyn RegistryStore>, sms: Arc<dyn SmsProvider>, config: RegistryConfig) -> Self {
        Self {
            store,
            sms,
            config,
            hasher: Argon2::default(),
        }
    }

    pub async fn check_status(&self, raw_phone: &str) -> Result<CheckStatus> {
        let normalized = phone::normalize(raw_phone)?;
        match self.store.get_player_by_phone(&normalized).await? {
            Some(player) => Ok(CheckStatus {
                exists: true,
                has_pin: player.pin_hash.is_some(),
                display_name: Some(player.display_name),
            }),
            None => Ok(CheckStatus {
                exists: false,
                has_pin: false,
                display_name: None,
            }),
        }
    }

    pub async fn create_or_touch(&self, raw_phone: &str, display_name: Option<&str>) -> Result<Player> {
        let normalized = phone::normalize(raw_phone)?;
        match self.store.get_player_by_phone(&normalized).await? {
            Some(player) => self.store.touch_player(player.id, display_name).await,
            None => self.store.create_player(&normalized, display_name.unwrap_or("Player")).await,
        }
    }

    pub async fn set_pin(&self, player_id: PlayerId, pin: &str) -> Result<()> {
        validate_pin(pin)?;
        let hash = self.hash_pin(pin)?;
        self.store.set_pin_hash(player_id, &hash).await
    }

    fn hash_pin(&self, pin: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(pin.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| Error::Internal(format!("pin hash: {e}")))
    }

    /// `Invalid` is returned for both an unknown phone and a wrong PIN,
    /// so a caller cannot enumerate registered numbers.
    pub async fn verify_pin(&self, raw_phone: &str, pin: &str, scope: ActionScope) -> Result<VerifyOutcome> {
        validate_pin(pin)?;
        let normalized = phone::normalize(raw_phone)?;
        let player = self
            .store
            .get_player_by_phone(&normalized)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        let now = Utc::now();
        if let Some(until) = player.lockout_until {
            if until > now {
                return Err(Error::AccountLocked(until.timestamp()));
            }
        }

        let Some(stored_hash) = player.pin_hash.as_deref() else {
            return Err(Error::InvalidCredentials);
        };
        let parsed = PasswordHash::new(stored_hash).map_err(|e| Error::Internal(format!("pin hash: {e}")))?;
        let matches = self.hasher.verify_password(pin.as_bytes(), &parsed).is_ok();

        if !matches {
            let failures = self.store.increment_pin_failures(player.id, now, self.config.lockout_window).await?;
            if failures >= self.config.pin_failure_limit {
                let until = now + self.config.lockout_duration;
                self.store.set_lockout(player.id, Some(until)).await?;
                return Err(Error::AccountLocked(until.timestamp()));
            }
            return Err(Error::InvalidCredentials);
        }

        self.store.clear_pin_failures(player.id).await?;
        self.store.set_lockout(player.id, None).await?;

        let session_token = token::opaque_token();
        self.store
            .create_session(&session_token, player.id, now + self.config.session_ttl)
            .await?;

        let action_token = token::opaque_token();
        self.store
            .create_action_token(&action_token, player.id, scope, now + self.config.action_token_ttl)
            .await?;

        Ok(VerifyOutcome {
            session_token,
            action_token,
            player,
        })
    }

    pub async fn request_otp(&self, raw_phone: &str) -> Result<()> {
        let normalized = phone::normalize(raw_phone)?;
        let code = generate_code();
        self.store
            .store_otp(&normalized, &otp_hash(&code), Utc::now() + self.config.otp_ttl)
            .await?;
        self.sms.send_otp(&normalized, &code).await
    }

    pub async fn verify_otp(&self, raw_phone: &str, code: &str, scope: ActionScope) -> Result<String> {
        let normalized = phone::normalize(raw_phone)?;
        let player = self
            .store
            .get_player_by_phone(&normalized)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        let matched = self.store.verify_and_consume_otp(&normalized, &otp_hash(code)).await?;
        if !matched {
            return Err(Error::InvalidCredentials);
        }

        let action_token = token::opaque_token();
        self.store
            .create_action_token(&action_token, player.id, scope, Utc::now() + self.config.action_token_ttl)
            .await?;
        Ok(action_token)
    }

    pub async fn reset_pin(&self, raw_phone: &str, new_pin: &str, otp_action_token: &str) -> Result<()> {
        validate_pin(new_pin)?;
        let normalized = phone::normalize(raw_phone)?;
        let player = self
            .store
            .get_player_by_phone(&normalized)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        let token_owner = self.store.consume_action_token(otp_action_token, ActionScope::ResetPin).await?;
        if token_owner != player.id {
            return Err(Error::TokenScopeMismatch);
        }

        let hash = self.hash_pin(new_pin)?;
        self.store.set_pin_hash(player.id, &hash).await?;
        self.store.clear_pin_failures(player.id).await?;
        self.store.set_lockout(player.id, None).await
    }

    pub async fn end_session(&self, session_token: &str) -> Result<()> {
        self.store.delete_session(session_token).await
    }

    pub async fn authenticate_session(&self, session_token: &str) -> Result<PlayerId> {
        let session = self.store.get_session(session_token).await?.ok_or(Error::UnknownToken)?;
        if session.expires_at < Utc::now() {
            return Err(Error::UnknownToken);
        }
        Ok(session.player_id)
    }

    pub async fn authenticate_action(&self, action_token: &str, scope: ActionScope) -> Result<PlayerId> {
        self.store.consume_action_token(action_token, scope).await
    }

    pub async fn get_player(&self, player_id: PlayerId) -> Result<Player> {
        self.store.get_player(player_id).await
    }

    pub async fn public_stats(&self, raw_phone: &str) -> Result<PublicStats> {
        let normalized = phone::normalize(raw_phone)?;
        let player = self
            .store
            .get_player_by_phone(&normalized)
            .await?
            .ok_or(Error::InvalidCredentials)?;
        Ok(PublicStats {
            display_name: player.display_name,
            games_played: player.games_played,
            games_won: player.games_won,
            current_streak: player.current_streak,
        })
    }
}

fn validate_pin(pin: &str) -> Result<()> {
    if pin.len() != 4 || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedPin);
    }
    Ok(())
}

fn otp_hash(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::memory::MemoryRegistryStore;
    use crate::otp::SmsProvider;

    use super::{ActionScope, Registry, RegistryConfig};

    struct CapturingSms {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SmsProvider for CapturingSms {
        async fn send_otp(&self, phone: &str, code: &str) -> stakeboard_core::Result<()> {
            self.sent.lock().unwrap().push((phone.to_owned(), code.to_owned()));
            Ok(())
        }
    }

    fn registry() -> (Registry, Arc<CapturingSms>) {
        let sms = Arc::new(CapturingSms { sent: Mutex::new(Vec::new()) });
        let registry = Registry::new(Arc::new(MemoryRegistryStore::default()), sms.clone(), RegistryConfig::default());
        (registry, sms)
    }

    #[tokio::test]
    async fn create_set_verify_round_trip() {
        let (registry, _sms) = registry();
        let player = registry.create_or_touch("+15555550100", Some("Ada")).await.unwrap();
        registry.set_pin(player.id, "1234").await.unwrap();

        let status = registry.check_status("+15555550100").await.unwrap();
        assert!(status.exists);
        assert!(status.has_pin);

        let outcome = registry
            .verify_pin("+15555550100", "1234", ActionScope::ViewProfile)
            .await
            .unwrap();
        assert_eq!(outcome.player.id, player.id);
    }

    #[tokio::test]
    async fn wrong_pin_and_unknown_phone_are_indistinguishable() {
        let (registry, _sms) = registry();
        let player = registry.create_or_touch("+15555550101", None).await.unwrap();
        registry.set_pin(player.id, "1234").await.unwrap();

        let wrong = registry
            .verify_pin("+15555550101", "0000", ActionScope::ViewProfile)
            .await
            .unwrap_err();
        let unknown = registry
            .verify_pin("+15555559999", "0000", ActionScope::ViewProfile)
            .await
            .unwrap_err();
        assert!(matches!(wrong, stakeboard_core::Error::InvalidCredentials));
        assert!(matches!(unknown, stakeboard_core::Error::InvalidCredentials));
    }

    #[tokio::test]
    async fn lockout_after_failure_limit() {
        let (registry, _sms) = registry();
        let player = registry.create_or_touch("+15555550102", None).await.unwrap();
        registry.set_pin(player.id, "1234").await.unwrap();

        for _ in 0..4 {
            let _ = registry.verify_pin("+15555550102", "0000", ActionScope::ViewProfile).await;
        }
        let err = registry
            .verify_pin("+15555550102", "0000", ActionScope::ViewProfile)
            .await
            .unwrap_err();
        assert!(matches!(err, stakeboard_core::Error::AccountLocked(_)));

        let still_locked = registry
            .verify_pin("+15555550102", "1234", ActionScope::ViewProfile)
            .await
            .unwrap_err();
        assert!(matches!(still_locked, stakeboard_core::Error::AccountLocked(_)));
    }

    #[tokio::test]
    async fn otp_reset_flow() {
        let (registry, sms) = registry();
        let player = registry.create_or_touch("+15555550103", None).await.unwrap();
        registry.set_pin(player.id, "1234").await.unwrap();

        registry.request_otp("+15555550103").await.unwrap();
        let code = sms.sent.lock().unwrap().last().unwrap().1.clone();

        let reset_token = registry
            .verify_otp("+15555550103", &code, ActionScope::ResetPin)
            .await
            .unwrap();
        registry.reset_pin("+15555550103", "4321", &reset_token).await.unwrap();

        let outcome = registry
            .verify_pin("+15555550103", "4321", ActionScope::ViewProfile)
            .await
            .unwrap();
        assert_eq!(outcome.player.id, player.id);
    }
}
