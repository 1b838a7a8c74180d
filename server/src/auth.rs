//! Bearer authentication: a session cookie-or-header for `/me`-style
//! routes, and a short-lived, scope-checked action token for the
//! sensitive ones (reset PIN, stake from winnings, requeue, rematch).
//! Both are opaque strings per the external interface's token design;
//! neither is ever parsed, only looked up.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::async_trait;

use stakeboard_core::types::PlayerId;
use stakeboard_core::Error;
use stakeboard_registry::ActionScope;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated player behind a `GET /me`-style request's bearer
/// token (`Authorization: Bearer <session_token>`).
pub struct SessionPlayer(pub PlayerId);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionPlayer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(Error::UnknownToken)?;
        let player_id = state.registry.authenticate_session(&token).await?;
        Ok(SessionPlayer(player_id))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.to_owned())
}

/// Pulls the `X-Action-Token` header and redeems it for the given
/// scope. Unlike `SessionPlayer` this isn't a `FromRequestParts` impl,
/// since the scope varies per route rather than being fixed by type.
pub async fn authenticate_action(state: &AppState, headers: &HeaderMap, scope: ActionScope) -> Result<PlayerId, ApiError> {
    let token = headers
        .get("x-action-token")
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::UnknownToken)?;
    Ok(state.registry.authenticate_action(token, scope).await?)
}
