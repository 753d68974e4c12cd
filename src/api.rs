//! HTTP surface over the ledger.
//!
//! Read endpoints plus a thin append pass-through and an on-demand
//! verification trigger. Handlers carry no domain logic.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::config::AppConfig;
use crate::database::Database;
use crate::error::LedgerError;
use crate::ledger::{ChainVerifier, LedgerEntryFactory};
use crate::scheduler::VerificationScheduler;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub database: Database,
    pub factory: Arc<LedgerEntryFactory>,
    pub verifier: ChainVerifier,
    pub scheduler: Arc<VerificationScheduler>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status_endpoint))
        .route("/ledger", get(list_entries))
        .route("/ledger/stats", get(ledger_stats))
        .route("/ledger/entries", post(record_event))
        .route("/ledger/verify", post(trigger_verification))
        .route("/ledger/events/:event_id", get(entries_for_event))
        .route("/ledger/:index", get(entry_by_index))
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "inventory-ledger",
        "timestamp": chrono::Utc::now()
    }))
}

async fn status_endpoint(State(state): State<AppState>) -> Json<Value> {
    let mut status = json!({
        "status": "healthy",
        "service": "inventory-ledger",
        "timestamp": chrono::Utc::now(),
        "features": {
            "alerting": state.config.alert.is_some(),
            "scheduled_verification": state.scheduler.is_running()
        }
    });

    match state.database.stats().await {
        Ok(stats) => {
            status["ledger"] = json!({
                "status": "healthy",
                "total_entries": stats.total_entries,
                "flagged_entries": stats.flagged_entries
            });
        }
        Err(_) => {
            status["ledger"] = json!({
                "status": "error"
            });
        }
    }

    Json(status)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    limit: Option<i64>,
}

async fn list_entries(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> (StatusCode, Json<Value>) {
    let result = match params.limit {
        Some(limit) => state.database.recent_entries(limit.max(0)).await,
        None => state.database.all_entries().await,
    };

    match result {
        Ok(entries) => (
            StatusCode::OK,
            Json(json!({ "count": entries.len(), "entries": entries })),
        ),
        Err(e) => storage_error(e),
    }
}

async fn ledger_stats(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.database.stats().await {
        Ok(stats) => (StatusCode::OK, Json(json!(stats))),
        Err(e) => storage_error(e),
    }
}

async fn entry_by_index(
    State(state): State<AppState>,
    Path(index): Path<i64>,
) -> (StatusCode, Json<Value>) {
    match state.database.entry_by_index(index).await {
        Ok(Some(entry)) => (StatusCode::OK, Json(json!({ "entry": entry }))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no ledger entry at index {}", index) })),
        ),
        Err(e) => storage_error(e),
    }
}

async fn entries_for_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.database.entries_by_event(&event_id).await {
        Ok(entries) => (
            StatusCode::OK,
            Json(json!({
                "event_id": event_id,
                "count": entries.len(),
                "entries": entries
            })),
        ),
        Err(e) => storage_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub event_type: String,
    pub event_id: String,
    pub collection_name: String,
    pub payload: Value,
    #[serde(default)]
    pub user_id: Option<String>,
}

async fn record_event(
    State(state): State<AppState>,
    Json(request): Json<RecordEventRequest>,
) -> (StatusCode, Json<Value>) {
    match state
        .factory
        .append(
            &request.event_type,
            &request.event_id,
            &request.collection_name,
            request.payload,
            request.user_id.as_deref(),
        )
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(json!({ "entry": entry }))),
        Err(e) => storage_error(e),
    }
}

async fn trigger_verification(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.verifier.verify().await {
        Ok(report) => (StatusCode::OK, Json(json!(report))),
        Err(e) => storage_error(e),
    }
}

fn storage_error(e: LedgerError) -> (StatusCode, Json<Value>) {
    error!("ledger request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
}
