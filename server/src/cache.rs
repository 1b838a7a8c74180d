//! The ephemeral hint cache described by the concurrency model's
//! shared-resource policy: Redis is never the source of truth for
//! anything here, only a fast path in front of the database. Losing it
//! (connection error, eviction, a cold start with no `redis_url`
//! configured) degrades silently to a database read; it can never hand
//! back stale-but-wrong data that corrupts a decision, only a cache
//! miss.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct PresenceCache {
    manager: Option<ConnectionManager>,
}

impl PresenceCache {
    pub async fn connect(redis_url: Option<&str>) -> PresenceCache {
        let Some(url) = redis_url else {
            return PresenceCache { manager: None };
        };
        match redis::Client::open(url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(manager) => PresenceCache { manager: Some(manager) },
                Err(e) => {
                    tracing::warn!("redis connection failed, continuing without the presence cache: {e}");
                    PresenceCache { manager: None }
                }
            },
            Err(e) => {
                tracing::warn!("invalid redis url, continuing without the presence cache: {e}");
                PresenceCache { manager: None }
            }
        }
    }

    /// Caches a queue token's poll-status body for a few seconds, cheap
    /// insurance against a hot-polling client hammering the database
    /// while a stake queue entry is still waiting to pair.
    pub async fn cache_queue_status(&self, queue_token: &str, body: &str) {
        let Some(mut manager) = self.manager.clone() else { return };
        let key = format!("queue_status:{queue_token}");
        let _: Result<(), redis::RedisError> = manager.set_ex(key, body, 3).await;
    }

    pub async fn get_queue_status(&self, queue_token: &str) -> Option<String> {
        let mut manager = self.manager.clone()?;
        let key = format!("queue_status:{queue_token}");
        manager.get(key).await.ok()
    }

    /// Marks a match as having at least one live connection, so a cold
    /// snapshot request can skip spawning a worker for a match that's
    /// actually idle between ticks. Best-effort only — a miss just means
    /// the caller falls back to `MatchRegistry::load_or_spawn`.
    pub async fn mark_match_present(&self, match_id: uuid::Uuid) {
        let Some(mut manager) = self.manager.clone() else { return };
        let key = format!("match_present:{match_id}");
        let _: Result<(), redis::RedisError> = manager.set_ex(key, 1, Duration::from_secs(3600).as_secs()).await;
    }
}
