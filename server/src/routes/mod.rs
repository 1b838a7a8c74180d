//! Route assembly. Each submodule owns one area of the external
//! interface's endpoint table; `router()` wires them onto a single
//! `axum::Router<Arc<AppState>>`.

mod auth;
mod game;
mod payments;
mod profile;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/config", get(public_config))
        .route("/healthz", get(healthz))
        .route("/auth/check-status", post(auth::check_status))
        .route("/auth/verify-pin", post(auth::verify_pin))
        .route("/auth/request-otp", post(auth::request_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/reset-pin", post(auth::reset_pin))
        .route("/auth/logout", post(auth::logout))
        .route("/me", get(profile::me))
        .route("/me/withdraws", get(profile::withdraws))
        .route("/me/withdraw", post(profile::withdraw))
        .route("/player/:phone/stats", get(profile::stats))
        .route("/game/stake", post(game::stake))
        .route("/game/queue/status", get(game::queue_status))
        .route("/game/queue/cancel", post(game::queue_cancel))
        .route("/game/queue/requeue", post(game::queue_requeue))
        .route("/game/match/:code", get(game::match_details))
        .route("/game/match/:code/join", post(game::match_join))
        .route("/game/match/:code/decline", post(game::match_decline))
        .route("/game/:game_token", get(game::snapshot))
        .route("/game/:game_token/ws", get(game::ws_upgrade))
        .route("/payments/collection-callback", post(payments::collection_callback))
        .route("/payments/disbursement-callback", post(payments::disbursement_callback))
        .with_state(state)
}

async fn public_config(axum::extract::State(state): axum::extract::State<Arc<AppState>>) -> Json<crate::config::PublicConfig> {
    Json(state.config.public.clone())
}

/// Liveness probe: confirms the database pool can still answer, not
/// that every external provider is reachable — the same scope the
/// teacher's own server binary gives a health check.
async fn healthz(axum::extract::State(state): axum::extract::State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match sqlx::query("select 1").execute(&state.pool).await {
        Ok(_) => (StatusCode::OK, "ok"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "db unavailable"),
    }
}
