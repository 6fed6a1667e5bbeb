// =============================================================================
// Price Buffers — rolling tick windows per instrument
// =============================================================================

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

/// Number of recent ticks retained per instrument.
pub const PRICE_BUFFER_CAPACITY: usize = 50;

// ---------------------------------------------------------------------------
// PriceBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity rolling window of recent prices for one instrument,
/// oldest first.  When the buffer is full the oldest entry is evicted before
/// the new one is appended (strict FIFO).
#[derive(Debug, Clone)]
pub struct PriceBuffer {
    prices: VecDeque<f64>,
    capacity: usize,
}

impl PriceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            prices: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new observation, evicting the oldest one at capacity.
    pub fn append(&mut self, price: f64) {
        if self.prices.len() == self.capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Current contents in chronological order (oldest first).
    pub fn snapshot(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }

    pub fn last(&self) -> Option<f64> {
        self.prices.back().copied()
    }
}

// ---------------------------------------------------------------------------
// PriceBook -- thread-safe buffer map over a fixed instrument set
// ---------------------------------------------------------------------------

/// Owns one [`PriceBuffer`] per tracked instrument.
///
/// The instrument set is fixed at construction; ticks for unknown symbols are
/// dropped.  Ingestion (the tick stream) is the sole writer; scans read a
/// snapshot copy of a buffer and never hold the lock while computing.
///
/// Every accepted tick bumps an internal version counter, which the shared
/// state folds into its own version so WebSocket clients see tick updates.
pub struct PriceBook {
    buffers: RwLock<HashMap<String, PriceBuffer>>,
    version: AtomicU64,
}

impl PriceBook {
    /// Create a book with an empty buffer for each of `symbols`.
    pub fn new(symbols: &[String]) -> Self {
        let mut buffers = HashMap::new();
        for symbol in symbols {
            buffers.insert(symbol.clone(), PriceBuffer::new(PRICE_BUFFER_CAPACITY));
        }
        Self {
            buffers: RwLock::new(buffers),
            version: AtomicU64::new(0),
        }
    }

    /// Record a tick for `symbol`.  Returns `false` when the tick is
    /// rejected: non-finite quotes never enter a buffer, and symbols outside
    /// the configured set are dropped.  Accepted ticks advance the book
    /// version; rejected ones do not.
    pub fn record(&self, symbol: &str, quote: f64) -> bool {
        if !quote.is_finite() {
            warn!(symbol = %symbol, quote = ?quote, "rejected non-finite tick");
            return false;
        }

        let mut buffers = self.buffers.write();
        match buffers.get_mut(symbol) {
            Some(buffer) => {
                buffer.append(quote);
                self.version.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => {
                debug!(symbol = %symbol, "tick for untracked symbol dropped");
                false
            }
        }
    }

    /// Monotonic count of accepted ticks across all instruments.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Chronological snapshot of the buffer for `symbol` (empty if the
    /// symbol is untracked).
    pub fn snapshot(&self, symbol: &str) -> Vec<f64> {
        self.buffers
            .read()
            .get(symbol)
            .map(PriceBuffer::snapshot)
            .unwrap_or_default()
    }

    /// Number of buffered ticks for `symbol`.
    pub fn len(&self, symbol: &str) -> usize {
        self.buffers.read().get(symbol).map_or(0, PriceBuffer::len)
    }

    /// Most recent price for `symbol`, if any ticks have arrived.
    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.buffers.read().get(symbol).and_then(PriceBuffer::last)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
