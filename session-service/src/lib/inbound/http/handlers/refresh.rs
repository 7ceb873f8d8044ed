use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::SessionTokens;
use crate::domain::session::ports::SessionServicePort;
use crate::inbound::http::router::AppState;

pub async fn refresh<S: SessionServicePort>(
    State(state): State<AppState<S>>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<ApiSuccess<SessionTokens>, ApiError> {
    let token_id =
        RefreshTokenId::from_string(&body.refresh_token_id).map_err(|_| ApiError::unauthorized())?;

    state
        .session_service
        .refresh(&token_id, &body.refresh_token)
        .await
        .map_err(ApiError::from)
        .map(|tokens| ApiSuccess::new(StatusCode::OK, tokens))
}

/// Refresh token pair as handed out by login, registration or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token_id: String,
    pub refresh_token: String,
}
