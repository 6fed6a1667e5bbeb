// =============================================================================
// Central Application State — VoltScan Signal Engine
// =============================================================================
//
// The single source of truth for the scanner.  The tick stream is the only
// writer of price data; scans and the API read snapshots.  All async tasks
// share this via `Arc<AppState>`.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for mutable shared collections.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::indicators::IndicatorSeries;
use crate::market_data::PriceBook;
use crate::runtime_config::ScannerConfig;
use crate::signals::{RankedSignal, ScanError, SignalAggregator, MIN_SCAN_POINTS};

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Central application state shared across all async tasks.
pub struct AppState {
    /// Monotonically increasing version counter, incremented on every
    /// meaningful mutation.  The WebSocket feed uses this to detect changes
    /// and push updates.
    pub state_version: AtomicU64,

    /// WebSocket message sequence number (incremented per message sent).
    pub ws_sequence_number: AtomicU64,

    pub config: Arc<RwLock<ScannerConfig>>,

    /// Rolling tick windows, one per tracked instrument.
    pub price_book: Arc<PriceBook>,

    /// The most recent ranked scan result, kept for the dashboard.
    pub last_signal: RwLock<Option<RankedSignal>>,

    /// Whether the upstream tick feed is currently connected.
    pub feed_connected: RwLock<bool>,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    /// Instant when the engine was started.  Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given configuration.  The price
    /// book is created with one empty buffer per configured symbol; the
    /// returned value is typically wrapped in `Arc` immediately.
    pub fn new(config: ScannerConfig) -> Self {
        let price_book = Arc::new(PriceBook::new(&config.symbols));

        Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),
            config: Arc::new(RwLock::new(config)),
            price_book,
            last_signal: RwLock::new(None),
            feed_connected: RwLock::new(false),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version.  Call after every meaningful
    /// mutation so WebSocket clients see fresh data.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.  The price book
    /// keeps its own accepted-tick counter, folded in here so that incoming
    /// ticks count as state changes and reach WebSocket clients without the
    /// tick stream needing a handle on this struct.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst) + self.price_book.version()
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message.  The ring is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted at the limit.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }

    /// Flip the feed-connected flag (called by the reconnect loop).
    pub fn set_feed_connected(&self, connected: bool) {
        *self.feed_connected.write() = connected;
        self.increment_version();
    }

    // ── Scanning ────────────────────────────────────────────────────────

    /// Run a ranked scan over all tracked instruments and remember the
    /// result for the dashboard.  Insufficient data is a recoverable
    /// condition passed back to the caller, not an engine error.
    pub fn scan(&self, validity_minutes: u32) -> Result<RankedSignal, ScanError> {
        let symbols = self.config.read().symbols.clone();
        let ranked = SignalAggregator::scan(&self.price_book, &symbols, validity_minutes)?;

        *self.last_signal.write() = Some(ranked.clone());
        self.increment_version();

        Ok(ranked)
    }

    /// Full indicator series for the configured display instrument, for the
    /// chart collaborator.  `None` until at least one tick has arrived.
    pub fn display_series(&self) -> Option<(String, IndicatorSeries)> {
        let symbol = self.config.read().display_symbol.clone();
        let prices = self.price_book.snapshot(&symbol);
        if prices.is_empty() {
            return None;
        }
        Some((symbol, IndicatorSeries::compute(&prices)))
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Build a complete, serialisable snapshot of the engine state: the
    /// payload for `GET /api/v1/state` and the WebSocket push feed.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let config = self.config.read();

        let mut instruments = HashMap::new();
        for symbol in &config.symbols {
            let buffered = self.price_book.len(symbol);
            instruments.insert(
                symbol.clone(),
                InstrumentSnapshot {
                    last_price: self.price_book.last_price(symbol),
                    buffered_ticks: buffered,
                    scan_ready: buffered >= MIN_SCAN_POINTS,
                },
            );
        }

        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            feed_connected: *self.feed_connected.read(),
            symbols: config.symbols.clone(),
            display_symbol: config.display_symbol.clone(),
            instruments,
            last_signal: self.last_signal.read().clone(),
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

// =============================================================================
// Serialisable snapshot types
// =============================================================================

/// Per-instrument tick-window status.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentSnapshot {
    pub last_price: Option<f64>,
    pub buffered_ticks: usize,
    /// True once the instrument has enough ticks to be scored by a scan.
    pub scan_ready: bool,
}

/// Full engine state snapshot sent to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub feed_connected: bool,
    pub symbols: Vec<String>,
    pub display_symbol: String,
    pub instruments: HashMap<String, InstrumentSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_signal: Option<RankedSignal>,
    pub recent_errors: Vec<ErrorRecord>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_ticks() -> AppState {
        let state = AppState::new(ScannerConfig::default());
        for i in 0..30 {
            let price = 100.0 + (i % 2) as f64;
            state.price_book.record("R_10", price);
        }
        state
    }

    #[test]
    fn push_error_caps_the_ring() {
        let state = AppState::new(ScannerConfig::default());
        for i in 0..60 {
            state.push_error(format!("error {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors.first().unwrap().message, "error 10");
    }

    #[test]
    fn scan_updates_last_signal_and_version() {
        let state = state_with_ticks();
        let before = state.current_state_version();

        let ranked = state.scan(5).unwrap();
        assert_eq!(ranked.valid_for_secs, 300);
        assert!(state.last_signal.read().is_some());
        assert!(state.current_state_version() > before);
    }

    #[test]
    fn tick_ingestion_bumps_state_version() {
        let state = AppState::new(ScannerConfig::default());
        let before = state.current_state_version();

        assert!(state.price_book.record("R_10", 6300.5));
        let after_tick = state.current_state_version();
        assert!(after_tick > before);

        // Rejected ticks must not advance the version.
        assert!(!state.price_book.record("R_10", f64::NAN));
        assert!(!state.price_book.record("R_999", 1.0));
        assert_eq!(state.current_state_version(), after_tick);
    }

    #[test]
    fn scan_without_data_reports_insufficient() {
        let state = AppState::new(ScannerConfig::default());
        assert_eq!(state.scan(5), Err(ScanError::InsufficientData));
        assert!(state.last_signal.read().is_none());
    }

    #[test]
    fn snapshot_reflects_buffer_readiness() {
        let state = state_with_ticks();
        let snapshot = state.build_snapshot();

        assert_eq!(snapshot.symbols.len(), 5);
        let r10 = &snapshot.instruments["R_10"];
        assert!(r10.scan_ready);
        assert_eq!(r10.buffered_ticks, 30);
        let r25 = &snapshot.instruments["R_25"];
        assert!(!r25.scan_ready);
        assert_eq!(r25.last_price, None);
    }

    #[test]
    fn display_series_requires_ticks() {
        let state = AppState::new(ScannerConfig::default());
        assert!(state.display_series().is_none());

        state.price_book.record("R_75", 6301.0);
        let (symbol, series) = state.display_series().unwrap();
        assert_eq!(symbol, "R_75");
        assert_eq!(series.prices, vec![6301.0]);
    }
}
