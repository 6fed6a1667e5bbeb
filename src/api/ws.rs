// =============================================================================
// WebSocket Handler — push-based state updates
// =============================================================================
//
// Clients connect to `/api/v1/ws?token=<token>` and receive:
//   1. An immediate full StateSnapshot on connect.
//   2. A fresh snapshot every 500 ms whenever the state_version has changed
//      since the last push (new ticks, scans, errors).
//
// Each outbound message carries a monotonically increasing sequence number.
// The snapshot includes the last ranked signal with its `valid_for_secs`, so
// a dashboard can drive its own countdown without further requests.
// =============================================================================

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::api::auth::check_token;
use crate::app_state::AppState;

/// Interval between push checks.
const PUSH_INTERVAL_MS: u64 = 500;

#[derive(Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Axum handler for the WebSocket upgrade request.  Validates the token from
/// the `?token=` query parameter before upgrading.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    if check_token(query.token.as_deref()).is_err() {
        warn!("WebSocket connection rejected: invalid token");
        return (
            axum::http::StatusCode::FORBIDDEN,
            "Invalid or missing token",
        )
            .into_response();
    }

    info!("WebSocket connection accepted — upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
        .into_response()
}

/// Manages a single WebSocket connection lifecycle: initial snapshot, then a
/// version-gated push loop alongside incoming-message handling.
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Initial full snapshot straight away.
    let mut last_sent_version = match send_snapshot(&mut sender, &state).await {
        Ok(version) => version,
        Err(e) => {
            warn!(error = %e, "failed to send initial WebSocket snapshot");
            return;
        }
    };

    let mut push_timer = interval(Duration::from_millis(PUSH_INTERVAL_MS));

    loop {
        tokio::select! {
            _ = push_timer.tick() => {
                let current = state.current_state_version();
                if current != last_sent_version {
                    match send_snapshot(&mut sender, &state).await {
                        Ok(version) => last_sent_version = version,
                        Err(e) => {
                            debug!(error = %e, "WebSocket push failed — closing");
                            break;
                        }
                    }
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(payload))) => {
                        if sender.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Text/Binary/Pong from clients are ignored.
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

/// Serialise and send the current snapshot, returning the version it
/// captured so the caller can gate the next push.
async fn send_snapshot(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &Arc<AppState>,
) -> anyhow::Result<u64> {
    let snapshot = state.build_snapshot();
    let version = snapshot.state_version;
    let sequence = state.ws_sequence_number.fetch_add(1, Ordering::Relaxed);

    let envelope = serde_json::json!({
        "type": "snapshot",
        "seq": sequence,
        "data": snapshot,
    });

    sender
        .send(Message::Text(serde_json::to_string(&envelope)?))
        .await?;

    Ok(version)
}
