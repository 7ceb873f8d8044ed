use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::refresh::RefreshTokenRequest;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::ports::SessionServicePort;
use crate::inbound::http::router::AppState;

pub async fn logout<S: SessionServicePort>(
    State(state): State<AppState<S>>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<ApiSuccess<()>, ApiError> {
    // An unparseable id names no session; logging it out is a no-op.
    let Ok(token_id) = RefreshTokenId::from_string(&body.refresh_token_id) else {
        return Ok(ApiSuccess::new(StatusCode::NO_CONTENT, ()));
    };

    state
        .session_service
        .logout(&token_id, &body.refresh_token)
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::NO_CONTENT, ()))
}
