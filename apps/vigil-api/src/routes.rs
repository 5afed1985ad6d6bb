//! Run-now HTTP surface.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info};
use vigil_sync::RunSummary;

use crate::settings::Settings;

/// Successful synchronise response.
#[derive(Debug, Serialize)]
struct SyncResponse {
    status: &'static str,
    #[serde(flatten)]
    summary: RunSummary,
}

/// Error body for a failed pass.
#[derive(Debug, Serialize)]
struct SyncFailure {
    error: String,
}

/// Build the application router.
pub fn router(settings: Arc<Settings>) -> Router {
    Router::new()
        .route("/api/synchronise", get(synchronise_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(settings)
}

/// Bind and serve until the process is stopped.
pub async fn serve(settings: Arc<Settings>, listen: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(listen, "serving synchronise endpoint");
    axum::serve(listener, router(settings)).await
}

async fn healthz_handler() -> &'static str {
    "ok"
}

/// One reconciliation pass per request; 503 on any fatal engine error.
async fn synchronise_handler(State(settings): State<Arc<Settings>>) -> impl IntoResponse {
    match settings.reconcile().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(SyncResponse {
                status: "ok",
                summary,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "synchronise failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(SyncFailure {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
