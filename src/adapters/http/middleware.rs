use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use crate::{
    adapters::http::app_state::AppState, app_error::AppError,
    infra::stripe_client::constant_time_compare,
};

/// Guards the admin surface with a static bearer token.
pub async fn require_admin_token(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(provided) = provided else {
        tracing::debug!("Admin request without bearer token");
        return Err(AppError::Unauthorized);
    };

    let expected = app_state.config.admin_api_token.expose_secret();
    if expected.is_empty() || !constant_time_compare(provided, expected) {
        tracing::warn!("Admin request with invalid token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
