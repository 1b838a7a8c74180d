//! `GET /me`, `GET /me/withdraws`, `POST /me/withdraw`, `GET
//! /player/{phone}/stats`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stakeboard_core::Error;

use crate::auth::SessionPlayer;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    phone: String,
    display_name: String,
    has_pin: bool,
    games_played: u32,
    games_won: u32,
    current_streak: i32,
}

pub async fn me(State(state): State<Arc<AppState>>, SessionPlayer(player_id): SessionPlayer) -> ApiResult<Json<MeResponse>> {
    let player = state.registry.get_player(player_id).await?;
    Ok(Json(MeResponse {
        phone: player.phone,
        display_name: player.display_name,
        has_pin: player.pin_hash.is_some(),
        games_played: player.games_played,
        games_won: player.games_won,
        current_streak: player.current_streak,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawsQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    before: Option<DateTime<Utc>>,
}

fn default_limit() -> u32 {
    20
}

pub async fn withdraws(
    State(state): State<Arc<AppState>>,
    SessionPlayer(player_id): SessionPlayer,
    Query(q): Query<WithdrawsQuery>,
) -> ApiResult<Json<Vec<stakeboard_core::types::WithdrawalRequest>>> {
    let list = state.payment.list_withdrawals(player_id, q.limit, q.before).await?;
    Ok(Json(list))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequestBody {
    amount: i64,
    destination_msisdn: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    withdrawal_id: uuid::Uuid,
}

pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    SessionPlayer(player_id): SessionPlayer,
    Json(body): Json<WithdrawRequestBody>,
) -> ApiResult<Json<WithdrawResponse>> {
    if body.amount < state.config.public.min_withdraw {
        return Err(Error::WithdrawalBelowMinimum.into());
    }
    let withdrawal_id = state.payment.request_withdrawal(player_id, body.amount, &body.destination_msisdn).await?;
    Ok(Json(WithdrawResponse { withdrawal_id }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    display_name: String,
    games_played: u32,
    games_won: u32,
    current_streak: i32,
}

pub async fn stats(State(state): State<Arc<AppState>>, Path(phone): Path<String>) -> ApiResult<Json<StatsResponse>> {
    let stats = state.registry.public_stats(&phone).await?;
    Ok(Json(StatsResponse {
        display_name: stats.display_name,
        games_played: stats.games_played,
        games_won: stats.games_won,
        current_streak: stats.current_streak,
    }))
}
