// =============================================================================
// REST API Endpoints — Axum
// =============================================================================
//
// All endpoints live under `/api/v1/`.  The health probe is public; every
// other endpoint requires a valid Bearer token via the `AuthBearer`
// extractor.  CORS is permissive for development.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::runtime_config::{ScannerConfig, CONFIG_PATH};
use crate::signals::ScanError;

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/scan", post(scan))
        .route("/api/v1/signal", get(last_signal))
        .route("/api/v1/series", get(display_series))
        .route("/api/v1/config", get(get_config).post(update_config))
        // ── WebSocket ───────────────────────────────────────────────
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    feed_connected: bool,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        feed_connected: *state.feed_connected.read(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Full state snapshot (authenticated)
// =============================================================================

async fn full_state(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

// =============================================================================
// Scan (authenticated)
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ScanRequest {
    /// Signal validity timeframe; falls back to the configured default.
    #[serde(default)]
    timeframe_minutes: Option<u32>,
}

async fn scan(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    body: Option<Json<ScanRequest>>,
) -> impl IntoResponse {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let minutes = request
        .timeframe_minutes
        .unwrap_or_else(|| state.config.read().default_timeframe_minutes);

    match state.scan(minutes) {
        Ok(ranked) => {
            info!(
                symbol = %ranked.result.symbol,
                call = %ranked.result.call,
                confidence = ranked.result.confidence,
                "scan produced ranked signal"
            );
            let body = serde_json::json!({
                "signal": ranked,
                "server_time": chrono::Utc::now().timestamp_millis(),
            });
            Json(body).into_response()
        }
        Err(ScanError::InsufficientData) => {
            let body = serde_json::json!({
                "error": "insufficient_data",
                "message": ScanError::InsufficientData.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
    }
}

// =============================================================================
// Last signal (authenticated)
// =============================================================================

async fn last_signal(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.last_signal.read().clone() {
        Some(signal) => Json(serde_json::json!({ "signal": signal })).into_response(),
        None => {
            let body = serde_json::json!({ "signal": null, "message": "No scan has run yet" });
            Json(body).into_response()
        }
    }
}

// =============================================================================
// Display indicator series (authenticated)
// =============================================================================

async fn display_series(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.display_series() {
        Some((symbol, series)) => {
            let body = serde_json::json!({ "symbol": symbol, "series": series });
            Json(body).into_response()
        }
        None => {
            let body = serde_json::json!({
                "symbol": state.config.read().display_symbol,
                "series": null,
                "message": "No ticks received yet",
            });
            Json(body).into_response()
        }
    }
}

// =============================================================================
// Config (authenticated)
// =============================================================================

async fn get_config(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.read().clone())
}

/// Runtime-tunable settings.  The tracked symbol set and feed endpoint are
/// fixed for the lifetime of the process; only fields that do not require a
/// feed reconnect can change here.
#[derive(Debug, Default, Deserialize)]
struct ConfigUpdate {
    #[serde(default)]
    display_symbol: Option<String>,
    #[serde(default)]
    default_timeframe_minutes: Option<u32>,
}

/// Apply an update to a config in place, returning a change list for the
/// response, or the reason the update is invalid.  Pure so it can be tested
/// without the filesystem.
fn apply_config_update(
    config: &mut ScannerConfig,
    update: &ConfigUpdate,
) -> Result<Vec<String>, String> {
    let mut changes = Vec::new();

    if let Some(symbol) = &update.display_symbol {
        if !config.symbols.contains(symbol) {
            return Err(format!("unknown display symbol: {symbol}"));
        }
        if *symbol != config.display_symbol {
            changes.push(format!(
                "display_symbol: {} -> {}",
                config.display_symbol, symbol
            ));
            config.display_symbol = symbol.clone();
        }
    }

    if let Some(minutes) = update.default_timeframe_minutes {
        if minutes == 0 {
            return Err("default_timeframe_minutes must be at least 1".to_string());
        }
        if minutes != config.default_timeframe_minutes {
            changes.push(format!(
                "default_timeframe_minutes: {} -> {}",
                config.default_timeframe_minutes, minutes
            ));
            config.default_timeframe_minutes = minutes;
        }
    }

    Ok(changes)
}

async fn update_config(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> impl IntoResponse {
    let config = {
        let mut config = state.config.write();
        match apply_config_update(&mut config, &update) {
            Ok(changes) => {
                for change in &changes {
                    info!(change = %change, "config updated");
                }
                Ok((config.clone(), changes))
            }
            Err(reason) => Err(reason),
        }
    };

    match config {
        Ok((config, changes)) => {
            if let Err(e) = config.save(CONFIG_PATH) {
                warn!(error = %e, "failed to persist updated config");
                state.push_error(format!("Config save failed: {e}"));
            }
            state.increment_version();

            let body = serde_json::json!({ "config": config, "changes": changes });
            Json(body).into_response()
        }
        Err(reason) => {
            let body = serde_json::json!({ "error": "invalid_config", "message": reason });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_update_changes_display_symbol() {
        let mut config = ScannerConfig::default();
        let update = ConfigUpdate {
            display_symbol: Some("R_50".to_string()),
            default_timeframe_minutes: None,
        };

        let changes = apply_config_update(&mut config, &update).unwrap();
        assert_eq!(config.display_symbol, "R_50");
        assert_eq!(changes, vec!["display_symbol: R_75 -> R_50"]);
    }

    #[test]
    fn config_update_rejects_untracked_display_symbol() {
        let mut config = ScannerConfig::default();
        let update = ConfigUpdate {
            display_symbol: Some("R_999".to_string()),
            default_timeframe_minutes: None,
        };

        assert!(apply_config_update(&mut config, &update).is_err());
        assert_eq!(config.display_symbol, "R_75");
    }

    #[test]
    fn config_update_rejects_zero_timeframe() {
        let mut config = ScannerConfig::default();
        let update = ConfigUpdate {
            display_symbol: None,
            default_timeframe_minutes: Some(0),
        };

        assert!(apply_config_update(&mut config, &update).is_err());
        assert_eq!(config.default_timeframe_minutes, 5);
    }

    #[test]
    fn config_update_noop_reports_no_changes() {
        let mut config = ScannerConfig::default();
        let update = ConfigUpdate {
            display_symbol: Some("R_75".to_string()),
            default_timeframe_minutes: Some(5),
        };

        let changes = apply_config_update(&mut config, &update).unwrap();
        assert!(changes.is_empty());
    }
}
