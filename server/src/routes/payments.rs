//! Provider webhook callbacks. These endpoints are the mobile-money
//! provider's, not a player's — no bearer token, just the intent id the
//! provider was given when the collection or disbursement was opened.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use stakeboard_payment::ProviderStatus;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCallbackRequest {
    intent_id: Uuid,
    status: ProviderStatus,
    provider_tx_id: Option<String>,
}

pub async fn collection_callback(State(state): State<Arc<AppState>>, Json(body): Json<CollectionCallbackRequest>) -> ApiResult<()> {
    state.payment.on_collection_callback(body.intent_id, body.status, body.provider_tx_id).await?;
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisbursementCallbackRequest {
    intent_id: Uuid,
    status: ProviderStatus,
}

pub async fn disbursement_callback(State(state): State<Arc<AppState>>, Json(body): Json<DisbursementCallbackRequest>) -> ApiResult<()> {
    state.payment.on_disbursement_callback(body.intent_id, body.status).await?;
    Ok(())
}
