//! Hydroreport Parser Service
//!
//! Accepts a bilingual hydropower PDF report upload, extracts the report date
//! and the national aggregate energy-production figure, and forwards the
//! record to the external collector.

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use hydroreport_models::ForwardPayload;
use hydroreport_utils::{init_logging, AppConfig, ErrorResponse, ReportError};

mod auth;
mod extraction;
mod forward_client;
mod pdf_source;
mod pipeline;

use pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<Pipeline>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|_| {
        eprintln!("Failed to load configuration, using defaults");
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting Hydroreport Parser Service");

    let pipeline = Pipeline::from_config(&config)?;
    let state = AppState {
        config: Arc::new(config.clone()),
        pipeline: Arc::new(pipeline),
    };

    let app = create_app(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Hydroreport Parser Service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_app(state: AppState, config: &AppConfig) -> Router {
    let protected = Router::new()
        .route("/api/v1/reports/parse", post(parse_report))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "hydroreport-parser",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Successful parse-and-forward response
#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub status: String,
    pub data: ForwardPayload,
    pub forward_response: serde_json::Value,
}

/// Parse an uploaded PDF report and forward the extracted record.
async fn parse_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParseResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = Uuid::new_v4();

    let field = multipart
        .next_field()
        .await
        .map_err(|e| to_http(ReportError::validation("file", format!("Upload error: {}", e))))?
        .ok_or_else(|| to_http(ReportError::validation("file", "No file provided")))?;

    let filename = field
        .file_name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(to_http(ReportError::validation(
            "file",
            "Only PDF files are allowed",
        )));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| to_http(ReportError::validation("file", format!("Read error: {}", e))))?;

    if data.len() > state.config.server.max_upload_bytes {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(
                ReportError::validation(
                    "file",
                    format!(
                        "File size ({} bytes) exceeds maximum allowed size ({} bytes)",
                        data.len(),
                        state.config.server.max_upload_bytes
                    ),
                )
                .into(),
            ),
        ));
    }

    info!(%request_id, %filename, size_bytes = data.len(), "parse request received");

    let report = state
        .pipeline
        .process(&data, request_id)
        .await
        .map_err(to_http)?;

    // The collector's body is opaque; pass it through as JSON when it
    // parses, as a plain string otherwise.
    let forward_response = serde_json::from_str(&report.forward_response)
        .unwrap_or(serde_json::Value::String(report.forward_response));

    Ok(Json(ParseResponse {
        status: "success".to_string(),
        data: ForwardPayload::from(&report.record),
        forward_response,
    }))
}

fn to_http(error: ReportError) -> (StatusCode, Json<ErrorResponse>) {
    let status = StatusCode::from_u16(error.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error.into()))
}
