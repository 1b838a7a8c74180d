//! `POST /auth/*`: phone-keyed identity and credential flows. None of
//! these require a bearer token — they're how one is obtained.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use stakeboard_core::Error;
use stakeboard_registry::ActionScope;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatusRequest {
    phone: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatusResponse {
    exists: bool,
    has_pin: bool,
    display_name: Option<String>,
}

pub async fn check_status(State(state): State<Arc<AppState>>, Json(body): Json<CheckStatusRequest>) -> ApiResult<Json<CheckStatusResponse>> {
    let status = state.registry.check_status(&body.phone).await?;
    Ok(Json(CheckStatusResponse { exists: status.exists, has_pin: status.has_pin, display_name: status.display_name }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPinRequest {
    phone: String,
    pin: String,
    action_scope: ActionScope,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPinResponse {
    session_token: String,
    action_token: String,
    display_name: String,
}

pub async fn verify_pin(State(state): State<Arc<AppState>>, Json(body): Json<VerifyPinRequest>) -> ApiResult<Json<VerifyPinResponse>> {
    let outcome = state.registry.verify_pin(&body.phone, &body.pin, body.action_scope).await?;
    Ok(Json(VerifyPinResponse {
        session_token: outcome.session_token,
        action_token: outcome.action_token,
        display_name: outcome.player.display_name,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpRequest {
    phone: String,
}

pub async fn request_otp(State(state): State<Arc<AppState>>, Json(body): Json<RequestOtpRequest>) -> ApiResult<()> {
    state.registry.request_otp(&body.phone).await?;
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    phone: String,
    otp: String,
    action_scope: ActionScope,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    action_token: String,
}

pub async fn verify_otp(State(state): State<Arc<AppState>>, Json(body): Json<VerifyOtpRequest>) -> ApiResult<Json<VerifyOtpResponse>> {
    let action_token = state.registry.verify_otp(&body.phone, &body.otp, body.action_scope).await?;
    Ok(Json(VerifyOtpResponse { action_token }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPinRequest {
    phone: String,
    new_pin: String,
    otp_action_token: String,
}

pub async fn reset_pin(State(state): State<Arc<AppState>>, Json(body): Json<ResetPinRequest>) -> ApiResult<()> {
    state.registry.reset_pin(&body.phone, &body.new_pin, &body.otp_action_token).await?;
    Ok(())
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<()> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(Error::UnknownToken)?;
    state.registry.end_session(token).await?;
    Ok(())
}
