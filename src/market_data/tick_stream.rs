// =============================================================================
// Deriv Tick Stream — live quote ingestion
// =============================================================================
//
// Connects to the Deriv WebSocket API, optionally authorises with an API
// token, subscribes to ticks for every configured instrument and feeds each
// quote into the shared [`PriceBook`].
//
// Runs until the stream disconnects or an error occurs, then returns so that
// the caller (main.rs) can handle reconnection.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::PriceBook;

/// A single parsed tick event.
#[derive(Debug, Clone, PartialEq)]
pub struct TickEvent {
    pub symbol: String,
    pub quote: f64,
}

/// Build the full WebSocket URL for the given endpoint and application id.
pub fn build_stream_url(endpoint: &str, app_id: &str) -> String {
    format!("{endpoint}?app_id={app_id}")
}

/// Parse one message from the Deriv stream.
///
/// Returns `Ok(Some(tick))` for tick payloads, `Ok(None)` for every other
/// well-formed message (authorize responses, subscription echoes, ping) and
/// an error for malformed JSON or an API-level error object.
///
/// Expected tick shape:
/// ```json
/// { "msg_type": "tick", "tick": { "symbol": "R_75", "quote": 6301.42 } }
/// ```
pub fn parse_tick_message(text: &str) -> Result<Option<TickEvent>> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse stream JSON")?;

    if let Some(err) = root.get("error") {
        let code = err.get("code").and_then(|v| v.as_str()).unwrap_or("?");
        let message = err
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        anyhow::bail!("API error {code}: {message}");
    }

    let Some(tick) = root.get("tick") else {
        return Ok(None);
    };

    let symbol = tick["symbol"]
        .as_str()
        .context("missing field tick.symbol")?
        .to_string();
    let quote = tick["quote"]
        .as_f64()
        .context("missing field tick.quote")?;

    Ok(Some(TickEvent { symbol, quote }))
}

/// Connect to the Deriv tick stream and pump quotes into `book`.
///
/// `on_connected` fires once the handshake has succeeded and every
/// subscription has been sent, so callers can flip a connected flag only
/// when the feed is actually up.
///
/// ```ignore
/// let book = Arc::new(PriceBook::new(&symbols));
/// loop {
///     let up = || state.set_feed_connected(true);
///     if let Err(e) = run_tick_stream(&url, token.as_deref(), &symbols, &book, up).await {
///         error!("stream error: {e}");
///     }
///     state.set_feed_connected(false);
///     tokio::time::sleep(Duration::from_secs(5)).await;
/// }
/// ```
pub async fn run_tick_stream(
    url: &str,
    api_token: Option<&str>,
    symbols: &[String],
    book: &Arc<PriceBook>,
    on_connected: impl FnOnce(),
) -> Result<()> {
    info!(url = %url, "connecting to tick WebSocket");

    let (ws_stream, _response) = connect_async(url)
        .await
        .context("failed to connect to tick WebSocket")?;

    info!(symbols = ?symbols, "tick WebSocket connected");
    let (mut write, mut read) = ws_stream.split();

    // Authorise first when a token is configured; public volatility-index
    // ticks also stream without one.
    if let Some(token) = api_token {
        let auth = json!({ "authorize": token }).to_string();
        write
            .send(Message::Text(auth))
            .await
            .context("failed to send authorize request")?;
    }

    // Subscribe to every tracked instrument.
    for symbol in symbols {
        let sub = json!({ "ticks": symbol, "subscribe": 1 }).to_string();
        write
            .send(Message::Text(sub))
            .await
            .with_context(|| format!("failed to subscribe to {symbol}"))?;
    }

    on_connected();

    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match parse_tick_message(&text) {
                Ok(Some(tick)) => {
                    debug!(symbol = %tick.symbol, quote = tick.quote, "tick");
                    book.record(&tick.symbol, tick.quote);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "failed to parse stream message");
                }
            },
            Some(Ok(_)) => {
                // Ping / Pong / Binary / Close frames -- tungstenite handles
                // pong replies automatically.
            }
            Some(Err(e)) => {
                error!(error = %e, "tick WebSocket read error");
                return Err(e.into());
            }
            None => {
                warn!("tick WebSocket stream ended");
                return Ok(());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
