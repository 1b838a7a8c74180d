//! Process configuration, loaded once at startup from a TOML file.

use std::path::Path;

use serde::Deserialize;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    /// Ephemeral presence/queue-fast-path cache. Absent means every read
    /// falls straight through to the database.
    pub redis_url: Option<String>,

    pub public: PublicConfig,
    #[serde(default)]
    pub registry: RegistryTuning,
    #[serde(default)]
    pub matchmaker: MatchmakerTuning,
    #[serde(default)]
    pub runtime: RuntimeTuning,
    #[serde(default)]
    pub session_hub: SessionHubTuning,
    pub payment: PaymentConfig,
}

/// Mirrors `GET /config`'s response body: every constant a client needs
/// before it can stake a game.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct PublicConfig {
    pub commission_bps: u32,
    pub min_stake: i64,
    pub min_withdraw: i64,
    pub stake_tiers: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryTuning {
    pub pin_failure_limit: u32,
    pub lockout_window_minutes: i64,
    pub lockout_duration_minutes: i64,
    pub session_ttl_days: i64,
    pub action_token_ttl_minutes: i64,
    pub otp_ttl_minutes: i64,
}

impl Default for RegistryTuning {
    fn default() -> Self {
        let d = stakeboard_registry::RegistryConfig::default();
        Self {
            pin_failure_limit: d.pin_failure_limit,
            lockout_window_minutes: d.lockout_window.num_minutes(),
            lockout_duration_minutes: d.lockout_duration.num_minutes(),
            session_ttl_days: d.session_ttl.num_days(),
            action_token_ttl_minutes: d.action_token_ttl.num_minutes(),
            otp_ttl_minutes: d.otp_ttl.num_minutes(),
        }
    }
}

impl From<RegistryTuning> for stakeboard_registry::RegistryConfig {
    fn from(t: RegistryTuning) -> Self {
        Self {
            pin_failure_limit: t.pin_failure_limit,
            lockout_window: chrono::Duration::minutes(t.lockout_window_minutes),
            lockout_duration: chrono::Duration::minutes(t.lockout_duration_minutes),
            session_ttl: chrono::Duration::days(t.session_ttl_days),
            action_token_ttl: chrono::Duration::minutes(t.action_token_ttl_minutes),
            otp_ttl: chrono::Duration::minutes(t.otp_ttl_minutes),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchmakerTuning {
    pub commission_bps: u32,
    pub queue_ttl_minutes: i64,
}

impl Default for MatchmakerTuning {
    fn default() -> Self {
        let d = stakeboard_matchmaker::MatchmakerConfig::default();
        Self { commission_bps: d.commission_bps, queue_ttl_minutes: d.queue_ttl.num_minutes() }
    }
}

impl MatchmakerTuning {
    fn into_config(self, variant: stakeboard_core::types::MatchVariant) -> stakeboard_matchmaker::MatchmakerConfig {
        stakeboard_matchmaker::MatchmakerConfig {
            commission_bps: self.commission_bps,
            queue_ttl: chrono::Duration::minutes(self.queue_ttl_minutes),
            variant,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeTuning {
    pub turn_timeout_secs: u64,
    pub idle_warning_lead_secs: u64,
}

impl Default for RuntimeTuning {
    fn default() -> Self {
        let d = stakeboard_match_runtime::RuntimeConfig::default();
        Self { turn_timeout_secs: d.turn_timeout.as_secs(), idle_warning_lead_secs: d.idle_warning_lead.as_secs() }
    }
}

impl From<RuntimeTuning> for stakeboard_match_runtime::RuntimeConfig {
    fn from(t: RuntimeTuning) -> Self {
        Self {
            turn_timeout: std::time::Duration::from_secs(t.turn_timeout_secs),
            idle_warning_lead: std::time::Duration::from_secs(t.idle_warning_lead_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionHubTuning {
    pub grace_period_secs: u64,
}

impl Default for SessionHubTuning {
    fn default() -> Self {
        let d = stakeboard_session_hub::GraceConfig::default();
        Self { grace_period_secs: d.grace_period.as_secs() }
    }
}

impl From<SessionHubTuning> for stakeboard_session_hub::GraceConfig {
    fn from(t: SessionHubTuning) -> Self {
        Self { grace_period: std::time::Duration::from_secs(t.grace_period_secs) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// `"fake"` for local/dev runs, anything else is a base URL fed to
    /// `HttpProvider`.
    pub provider: String,
    pub provider_fee_bps: u32,
    pub stale_after_minutes: i64,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub async fn from_path(path: &Path) -> anyhow::Result<Config> {
        tracing::info!("loading configuration from {}", path.display());
        let mut buf = Vec::with_capacity(1024);
        let mut f = File::open(path).await?;
        f.read_to_end(&mut buf).await?;
        Ok(toml::from_slice(&buf)?)
    }

    pub fn matchmaker_config(&self, variant: stakeboard_core::types::MatchVariant) -> stakeboard_matchmaker::MatchmakerConfig {
        self.matchmaker.clone().into_config(variant)
    }
}
