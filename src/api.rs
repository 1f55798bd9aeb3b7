//! REST API server for the financial health monitor
//!
//! Exposes the monitor as a single serverless-style function endpoint.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::error::MonitorError;
use crate::monitor::FinancialHealthMonitor;
use crate::store::IdentityResolver;

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub monitor: Arc<FinancialHealthMonitor>,
    pub identity: Arc<dyn IdentityResolver>,
}

/// =============================
/// Helpers
/// =============================

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn unauthorized() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "Unauthorized" })),
    )
}

fn failure(err: MonitorError) -> (StatusCode, Json<serde_json::Value>) {
    if matches!(err, MonitorError::Unauthorized) {
        return unauthorized();
    }

    error!("Financial health check failed: {}", err);
    (
        err.status_code(),
        Json(serde_json::json!({
            "success": false,
            "error": err.to_string(),
        })),
    )
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Monitor Endpoint
/// =============================

async fn monitor_financial_health(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(token) = bearer_token(&headers) else {
        warn!("Missing bearer token");
        return unauthorized();
    };

    let caller = match state.identity.resolve(token).await {
        Ok(Some(caller)) => caller,
        Ok(None) => return unauthorized(),
        Err(e) => return failure(e),
    };

    info!(user_id = %caller.id, "Received financial health request");

    let report = match state.monitor.run(&caller).await {
        Ok(report) => report,
        Err(e) => return failure(e),
    };

    match serde_json::to_value(report) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => failure(e.into()),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/functions/monitorFinancialHealth",
            post(monitor_financial_health),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
