use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use hydroreport_utils::{ErrorResponse, ReportError};
use tracing::warn;

use crate::AppState;

/// Inbound API key check for the parse endpoint.
///
/// The key value itself is never logged.
pub async fn require_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if key == state.config.server.inbound_api_key => Ok(next.run(request).await),
        Some(_) => {
            warn!("request rejected: invalid API key");
            Err(unauthorized("Invalid API key"))
        }
        None => Err(unauthorized("Missing X-API-Key header")),
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ReportError::authentication(message).into()),
    )
}
