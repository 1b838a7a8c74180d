//! Background sweeps: expired queue entries and stale payment intents
//! are both the same pattern — a periodic poll that tolerates being
//! thoroughly unsurprising if nothing is due. Spawned once at startup,
//! run for the lifetime of the process.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::state::AppState;

pub fn spawn(state: Arc<AppState>) {
    spawn_queue_sweep(state.clone());
    spawn_payment_sweep(state);
}

fn spawn_queue_sweep(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(30));
        loop {
            tick.tick().await;
            match state.matchmaker.sweep_expired().await {
                Ok(0) => {}
                Ok(n) => info!("queue sweep: expired and refunded {n} entries"),
                Err(e) => warn!("queue sweep failed: {e}"),
            }
        }
    });
}

fn spawn_payment_sweep(state: Arc<AppState>) {
    let interval = Duration::from_secs(state.config.payment.sweep_interval_secs);
    let stale_after = chrono::Duration::minutes(state.config.payment.stale_after_minutes);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        loop {
            tick.tick().await;
            let older_than = Utc::now() - stale_after;
            match state.payment.sweep_stale(older_than).await {
                Ok(0) => {}
                Ok(n) => info!("payment sweep: resolved {n} stale intents"),
                Err(e) => warn!("payment sweep failed: {e}"),
            }
        }
    });
}
