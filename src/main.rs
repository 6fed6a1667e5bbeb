// =============================================================================
// VoltScan Signal Engine — Main Entry Point
// =============================================================================
//
// Live signal scanner for Deriv volatility indices: streams ticks into
// per-instrument rolling windows, and serves ranked multi-indicator signals
// plus chart-ready indicator series over the REST/WebSocket API.
// =============================================================================

mod api;
mod app_state;
mod indicators;
mod market_data;
mod runtime_config;
mod signals;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::tick_stream;
use crate::runtime_config::{ScannerConfig, CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║          VoltScan Signal Engine — Starting Up            ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = ScannerConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        ScannerConfig::default()
    });

    // Override symbols from env if available.
    if let Ok(syms) = std::env::var("VOLTSCAN_SYMBOLS") {
        let parsed: Vec<String> = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if !parsed.is_empty() {
            config.symbols = parsed;
        }
    }
    if !config.symbols.contains(&config.display_symbol) {
        let fallback = config.symbols.first().cloned().unwrap_or_default();
        warn!(
            display = %config.display_symbol,
            fallback = %fallback,
            "display symbol not tracked — falling back to first symbol"
        );
        config.display_symbol = fallback;
    }

    info!(symbols = ?config.symbols, display = %config.display_symbol, "Tracked instruments");

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config));

    // ── 3. Spawn the tick feed (with reconnect loop) ─────────────────────
    let feed_state = state.clone();
    tokio::spawn(async move {
        let api_token = std::env::var("DERIV_API_TOKEN").ok();
        loop {
            let (url, symbols) = {
                let config = feed_state.config.read();
                (
                    tick_stream::build_stream_url(&config.deriv_endpoint, &config.deriv_app_id),
                    config.symbols.clone(),
                )
            };

            // The flag flips only once the handshake and subscriptions have
            // gone through; health reads false during backoff.
            let connected_state = feed_state.clone();
            if let Err(e) = tick_stream::run_tick_stream(
                &url,
                api_token.as_deref(),
                &symbols,
                &feed_state.price_book,
                move || connected_state.set_feed_connected(true),
            )
            .await
            {
                error!(error = %e, "Tick stream error — reconnecting in 5s");
                feed_state.push_error(format!("tick stream: {e}"));
            }
            feed_state.set_feed_connected(false);
            tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
        }
    });

    // ── 4. Start the API server ──────────────────────────────────────────
    let api_state = state.clone();
    let bind_addr = std::env::var("VOLTSCAN_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr, "API server listening");
        axum::serve(listener, app).await.expect("API server failed");
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save scanner config on shutdown");
    }

    info!("VoltScan shut down complete.");
    Ok(())
}
