//! Health HTTP endpoint.
//!
//! Enabled by a `[server]` section. Keeps a port open for hosts that expect
//! one and exposes the scheduler state for monitoring.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Version, scheduler state, last cycle outcome, stored record count |

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use listing_watch_core::store::Store;

use crate::scheduler::{SchedulerSnapshot, SchedulerState};

#[derive(Clone)]
struct AppState {
    scheduler: Arc<SchedulerState>,
    store: Arc<dyn Store>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    records: Option<u64>,
    scheduler: SchedulerSnapshot,
}

pub fn router(scheduler: Arc<SchedulerState>, store: Arc<dyn Store>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .with_state(AppState { scheduler, store })
}

/// Bind and serve until the task is aborted.
pub async fn run_server(
    bind: &str,
    scheduler: Arc<SchedulerState>,
    store: Arc<dyn Store>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(bind = %bind, "health server listening");
    axum::serve(listener, router(scheduler, store)).await?;
    Ok(())
}

async fn handle_health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let records = match state.store.count().await {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not count records");
            None
        }
    };
    let status = if records.is_some() { "ok" } else { "degraded" };
    let code = if records.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            records,
            scheduler: state.scheduler.snapshot(),
        }),
    )
}
