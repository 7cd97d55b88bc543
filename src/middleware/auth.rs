//! Bearer-token authentication against the external user directory. The
//! resolved identity is inserted into request extensions for handlers.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::AppState;

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))?;

    let user = state
        .identity
        .resolve_bearer(token)
        .await
        .map_err(|err| AppError::Internal(format!("identity lookup failed: {err}")))?
        .ok_or_else(|| AppError::Unauthorized("invalid or expired token".to_string()))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
