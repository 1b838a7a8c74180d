//! `/game/*`: staking into the queue, polling and leaving it, private
//! invite resolution, and the two ways into a live match — the
//! authoritative HTTP snapshot and the WebSocket upgrade.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use stakeboard_core::types::{AccountType, QueueMode, QueueStatus};
use stakeboard_core::Error;
use stakeboard_matchmaker::{EnqueueOutcome, MatchPairing, PollOutcome};
use stakeboard_session_hub::{handle_socket, resolve};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeRequest {
    phone: String,
    stake: i64,
    display_name: Option<String>,
    mode: Option<QueueMode>,
    invite_phone: Option<String>,
    source: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingDto {
    game_token: String,
    player_token: String,
}

impl From<MatchPairing> for PairingDto {
    fn from(p: MatchPairing) -> Self {
        Self { game_token: p.game_token, player_token: p.player_token }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    queue_token: String,
    match_code: Option<String>,
    matched: Option<PairingDto>,
}

impl From<EnqueueOutcome> for EnqueueResponse {
    fn from(o: EnqueueOutcome) -> Self {
        Self { queue_token: o.queue_token, match_code: o.match_code, matched: o.matched.map(PairingDto::from) }
    }
}

fn account_source(raw: Option<&str>) -> AccountType {
    match raw {
        Some("winnings") => AccountType::PlayerWinnings,
        _ => AccountType::PlayerWallet,
    }
}

pub async fn stake(State(state): State<Arc<AppState>>, Json(body): Json<StakeRequest>) -> ApiResult<Json<EnqueueResponse>> {
    let player = state.registry.create_or_touch(&body.phone, body.display_name.as_deref()).await?;
    let mode = body.mode.unwrap_or(QueueMode::Public);
    let source = account_source(body.source.as_deref());
    let outcome = state.matchmaker.enqueue(player.id, body.stake, mode, body.invite_phone, source).await?;
    Ok(Json(EnqueueResponse::from(outcome)))
}

#[derive(Deserialize)]
pub struct QueueTokenQuery {
    token: String,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum QueueStatusResponse {
    Queued,
    Matched { game_token: String, player_token: String },
    Expired,
    Cancelled,
}

impl From<PollOutcome> for QueueStatusResponse {
    fn from(o: PollOutcome) -> Self {
        match o {
            PollOutcome::Queued => QueueStatusResponse::Queued,
            PollOutcome::Matched { game_token, player_token } => QueueStatusResponse::Matched { game_token, player_token },
            PollOutcome::Expired => QueueStatusResponse::Expired,
            PollOutcome::Cancelled => QueueStatusResponse::Cancelled,
        }
    }
}

/// Checks the presence cache before falling through to the matchmaker
/// store, per the shared-resource policy: Redis is a fast path in
/// front of the queue poll, never its source of truth.
pub async fn queue_status(State(state): State<Arc<AppState>>, Query(q): Query<QueueTokenQuery>) -> ApiResult<Response> {
    if let Some(cached) = state.cache.get_queue_status(&q.token).await {
        return Ok((axum::http::StatusCode::OK, [(axum::http::header::CONTENT_TYPE, "application/json")], cached).into_response());
    }
    let outcome = state.matchmaker.poll_status(&q.token).await?;
    let body = QueueStatusResponse::from(outcome);
    let json = serde_json::to_string(&body).map_err(|e| Error::Internal(e.to_string()))?;
    state.cache.cache_queue_status(&q.token, &json).await;
    Ok((axum::http::StatusCode::OK, [(axum::http::header::CONTENT_TYPE, "application/json")], json).into_response())
}

#[derive(Deserialize)]
pub struct QueueTokenBody {
    token: String,
}

pub async fn queue_cancel(State(state): State<Arc<AppState>>, Json(body): Json<QueueTokenBody>) -> ApiResult<()> {
    state.matchmaker.cancel_queue(&body.token).await?;
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequeueRequest {
    phone: String,
    previous_entry_id: uuid::Uuid,
}

pub async fn queue_requeue(State(state): State<Arc<AppState>>, Json(body): Json<RequeueRequest>) -> ApiResult<Json<EnqueueResponse>> {
    let player = state.registry.create_or_touch(&body.phone, None).await?;
    let outcome = state.matchmaker.requeue(player.id, body.previous_entry_id).await?;
    Ok(Json(EnqueueResponse::from(outcome)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetailsResponse {
    stake: i64,
    status: QueueStatus,
}

pub async fn match_details(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> ApiResult<Json<MatchDetailsResponse>> {
    let details = state.matchmaker.invite_details(&code).await?;
    Ok(Json(MatchDetailsResponse { stake: details.stake, status: details.status }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    phone: String,
    stake: i64,
    display_name: Option<String>,
}

pub async fn match_join(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(body): Json<JoinRequest>,
) -> ApiResult<Json<PairingDto>> {
    let player = state.registry.create_or_touch(&body.phone, body.display_name.as_deref()).await?;
    let pairing = state.matchmaker.redeem_private_invite(&code, player.id, body.stake).await?;
    Ok(Json(PairingDto::from(pairing)))
}

pub async fn match_decline(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> ApiResult<()> {
    state.matchmaker.decline_invite(&code).await?;
    Ok(())
}

#[derive(Deserialize)]
pub struct PlayerTokenQuery {
    pt: String,
}

pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Path(game_token): Path<String>,
    Query(q): Query<PlayerTokenQuery>,
) -> ApiResult<Json<stakeboard_match_runtime::event::PlayerView>> {
    let (match_id, seat) = resolve(state.match_store.as_ref(), &game_token, &q.pt).await?;
    let handle = state.match_registry.load_or_spawn(match_id).await;
    let view = handle.snapshot(seat).await?;
    state.cache.mark_match_present(match_id).await;
    Ok(Json(view))
}

pub async fn ws_upgrade(
    State(state): State<Arc<AppState>>,
    Path(game_token): Path<String>,
    Query(q): Query<PlayerTokenQuery>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let (match_id, seat) = resolve(state.match_store.as_ref(), &game_token, &q.pt).await?;
    let handle = state.match_registry.load_or_spawn(match_id).await;
    let connections = state.connections.clone();
    let grace = state.grace;
    Ok(ws
        .on_upgrade(move |socket| async move {
            handle_socket(socket, match_id, seat, handle, connections, grace).await;
        })
        .into_response())
}
