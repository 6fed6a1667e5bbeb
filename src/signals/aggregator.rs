// =============================================================================
// Signal Aggregator — rank instruments, pick the strongest signal
// =============================================================================
//
// Runs the evaluator over every tracked instrument with enough buffered
// ticks, in the fixed configured order, and selects the result with the
// highest confidence.  Ties go to the instrument seen first.  When no
// instrument has enough data the scan reports `ScanError::InsufficientData`
// instead of a ranked result.
// =============================================================================

use serde::Serialize;

use crate::market_data::PriceBook;
use crate::signals::evaluator::{SignalEvaluator, SignalResult};

/// Recoverable scan failures reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    /// No tracked instrument has enough buffered ticks to score.
    InsufficientData,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientData => write!(f, "not enough buffered ticks on any instrument"),
        }
    }
}

impl std::error::Error for ScanError {}

/// The strongest signal across all instruments, plus its validity window.
///
/// Carries no timestamp: two scans over identical buffers produce identical
/// values.  The API layer attaches server time when reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSignal {
    #[serde(flatten)]
    pub result: SignalResult,
    /// How long the caller should treat the signal as actionable, in whole
    /// seconds (`timeframe minutes * 60`).
    pub valid_for_secs: u64,
}

pub struct SignalAggregator;

impl SignalAggregator {
    /// Scan every symbol in `symbols` (fixed configured order) against the
    /// current buffers in `book`.
    pub fn scan(
        book: &PriceBook,
        symbols: &[String],
        validity_minutes: u32,
    ) -> Result<RankedSignal, ScanError> {
        let mut best: Option<SignalResult> = None;

        for symbol in symbols {
            let prices = book.snapshot(symbol);
            let Some(result) = SignalEvaluator::evaluate(symbol, &prices) else {
                continue;
            };

            // Strict comparison keeps the first-seen result on ties.
            match &best {
                Some(current) if result.confidence <= current.confidence => {}
                _ => best = Some(result),
            }
        }

        let result = best.ok_or(ScanError::InsufficientData)?;
        Ok(RankedSignal {
            result,
            valid_for_secs: u64::from(validity_minutes) * 60,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalCall;

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn feed(book: &PriceBook, symbol: &str, prices: &[f64]) {
        for &p in prices {
            book.record(symbol, p);
        }
    }

    /// Rising drift with pullbacks; confidence 2 under the evaluator (MACD
    /// and EMA+RSI both vote RISE).
    fn trending_series(len: usize) -> Vec<f64> {
        let mut prices = vec![100.0];
        for i in 0..len - 1 {
            let last = *prices.last().unwrap();
            prices.push(last + if i % 2 == 0 { 1.0 } else { -0.5 });
        }
        prices
    }

    #[test]
    fn scan_with_no_data_reports_insufficient() {
        let syms = symbols(&["R_10", "R_25"]);
        let book = PriceBook::new(&syms);
        assert_eq!(
            SignalAggregator::scan(&book, &syms, 5),
            Err(ScanError::InsufficientData)
        );
    }

    #[test]
    fn scan_skips_short_buffers_without_failing() {
        let syms = symbols(&["R_10", "R_25"]);
        let book = PriceBook::new(&syms);
        feed(&book, "R_10", &[100.0; 10]); // below the 20-tick floor
        feed(&book, "R_25", &trending_series(45));

        let ranked = SignalAggregator::scan(&book, &syms, 1).unwrap();
        assert_eq!(ranked.result.symbol, "R_25");
    }

    #[test]
    fn scan_picks_highest_confidence() {
        let syms = symbols(&["R_10", "R_25"]);
        let book = PriceBook::new(&syms);
        feed(&book, "R_10", &[100.0; 30]); // flat => confidence 0
        feed(&book, "R_25", &trending_series(45)); // confidence 2

        let ranked = SignalAggregator::scan(&book, &syms, 1).unwrap();
        assert_eq!(ranked.result.symbol, "R_25");
        assert_eq!(ranked.result.call, SignalCall::Rise);
        assert!(ranked.result.confidence >= 2);
    }

    #[test]
    fn ties_go_to_the_first_configured_symbol() {
        let syms = symbols(&["R_50", "R_75", "R_100"]);
        let book = PriceBook::new(&syms);
        let series = trending_series(45);
        // Identical series => identical confidence on all three.
        feed(&book, "R_100", &series);
        feed(&book, "R_75", &series);
        feed(&book, "R_50", &series);

        let ranked = SignalAggregator::scan(&book, &syms, 1).unwrap();
        assert_eq!(ranked.result.symbol, "R_50");
    }

    #[test]
    fn validity_is_minutes_times_sixty() {
        let syms = symbols(&["R_10"]);
        let book = PriceBook::new(&syms);
        feed(&book, "R_10", &trending_series(45));

        let ranked = SignalAggregator::scan(&book, &syms, 5).unwrap();
        assert_eq!(ranked.valid_for_secs, 300);
    }

    #[test]
    fn scan_is_idempotent_between_ticks() {
        let syms = symbols(&["R_10", "R_25"]);
        let book = PriceBook::new(&syms);
        feed(&book, "R_10", &trending_series(45));
        feed(&book, "R_25", &[100.0; 30]);

        let first = SignalAggregator::scan(&book, &syms, 3).unwrap();
        let second = SignalAggregator::scan(&book, &syms, 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn new_ticks_can_change_the_result() {
        let syms = symbols(&["R_10"]);
        let book = PriceBook::new(&syms);
        feed(&book, "R_10", &trending_series(45));
        let before = SignalAggregator::scan(&book, &syms, 1).unwrap();

        // A sharp reversal below the lower band flips the Bollinger vote.
        let last = book.last_price("R_10").unwrap();
        book.record("R_10", last - 15.0);
        let after = SignalAggregator::scan(&book, &syms, 1).unwrap();

        assert_ne!(before, after);
    }
}
