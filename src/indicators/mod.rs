// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators used by the
// signal engine.  Every function operates over an ordered slice of prices
// (oldest first) and is total over finite input: warm-up positions where a
// value is not yet defined are represented as `None` rather than skipped, so
// every output series stays index-aligned with the input prices.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;

pub use bollinger::{bollinger, BollingerSeries};
pub use ema::ema;
pub use macd::{macd, MacdSeries};
pub use rsi::rsi;

use serde::Serialize;

/// Default look-back periods used across the engine.
pub const EMA_TREND_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_MULT: f64 = 2.0;

/// Every indicator series for one instrument, index-aligned with `prices`.
///
/// Recomputed fresh from the price buffer on each request; nothing here is
/// incremental state.  This is the payload handed to the charting collaborator
/// so it can render price, bands, MACD, EMA and RSI without recomputation.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSeries {
    pub prices: Vec<f64>,
    pub bollinger: BollingerSeries,
    pub ema_50: Vec<f64>,
    pub macd: MacdSeries,
    pub rsi_14: Vec<Option<f64>>,
}

impl IndicatorSeries {
    /// Compute the full set of display series from a price snapshot.
    pub fn compute(prices: &[f64]) -> Self {
        Self {
            prices: prices.to_vec(),
            bollinger: bollinger(prices, BOLLINGER_PERIOD, BOLLINGER_MULT),
            ema_50: ema(prices, EMA_TREND_PERIOD),
            macd: macd(prices),
            rsi_14: rsi(prices, RSI_PERIOD),
        }
    }
}
