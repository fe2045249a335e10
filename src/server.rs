//! Giveaway Picker Server
//!
//! HTTP server for draw and history endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::picker::{GiveawayPicker, PickRequest, PickResponse};

const DEFAULT_HISTORY_LIMIT: u32 = 20;
const MAX_HISTORY_LIMIT: u32 = 200;

pub struct AppState {
    pub picker: GiveawayPicker,
    pub started_at: std::time::Instant,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/pick_winner", post(pick_winner_handler))
        .route("/history", get(history_handler))
        .route("/history/:id", get(draw_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index_handler() -> &'static str {
    concat!(
        "giveaway-picker ",
        env!("CARGO_PKG_VERSION"),
        "\nPOST /pick_winner to draw winners, GET /history for past draws.\n"
    )
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub uptime_secs: u64,
    pub version: String,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// POST /pick_winner - always 200; callers check `success`
// ============================================================================

async fn pick_winner_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PickRequest>, JsonRejection>,
) -> Json<PickResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return Json(PickResponse::failure(format!(
                "Invalid request body: {}",
                rejection.body_text()
            )));
        }
    };

    let start = std::time::Instant::now();
    let response = state.picker.pick_winner(request).await;
    info!(
        "pick_winner finished in {}ms (success={})",
        start.elapsed().as_millis(),
        response.success
    );
    Json(response)
}

// ============================================================================
// GET /history - recorded fresh draws, newest first
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<serde_json::Value> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let ledger = state.picker.ledger();

    let result = ledger
        .history(limit)
        .and_then(|draws| Ok((draws, ledger.total_draws()?)));

    match result {
        Ok((draws, total_draws)) => Json(serde_json::json!({
            "success": true,
            "draws": draws,
            "total_draws": total_draws,
        })),
        Err(e) => {
            error!("Failed to load history: {:#}", e);
            Json(serde_json::json!({ "success": false, "error": "Failed to load draw history." }))
        }
    }
}

async fn draw_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Json<serde_json::Value> {
    match state.picker.ledger().draw_with_winners(id) {
        Ok(Some(draw)) => Json(serde_json::json!({ "success": true, "draw": draw })),
        Ok(None) => Json(serde_json::json!({
            "success": false,
            "error": format!("Draw {} not found.", id)
        })),
        Err(e) => {
            error!("Failed to load draw {}: {:#}", id, e);
            Json(serde_json::json!({ "success": false, "error": "Failed to load draw." }))
        }
    }
}

/// Run the server
pub async fn run_server(addr: &str, picker: GiveawayPicker) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        picker,
        started_at: std::time::Instant::now(),
    });

    let app = create_router(state);

    info!("Starting Giveaway Picker server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
