// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
// macd_line[i]   = EMA(prices, 12)[i] - EMA(prices, 26)[i]
// signal_line    = EMA(macd_line, 9)
//
// Both EMAs are seeded at the first price, so they are always index-aligned
// with the input and with each other.  A missing EMA26 slot is substituted
// with 0.0 — this mirrors the reference implementation's alignment fallback
// and is pinned by test rather than silently removed.  With the full-length
// EMA used here the fallback is unreachable in practice, but the contract is
// kept explicit.
// =============================================================================

use serde::Serialize;

use super::ema;

const FAST_PERIOD: usize = 12;
const SLOW_PERIOD: usize = 26;
const SIGNAL_PERIOD: usize = 9;

/// MACD line and its signal line, index-aligned with the input prices.
#[derive(Debug, Clone, Serialize)]
pub struct MacdSeries {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
}

impl MacdSeries {
    /// Last `(macd, signal)` pair, if the series is nonempty.
    pub fn last(&self) -> Option<(f64, f64)> {
        match (self.macd_line.last(), self.signal_line.last()) {
            (Some(&m), Some(&s)) => Some((m, s)),
            _ => None,
        }
    }
}

/// Compute the MACD(12, 26, 9) series for `prices`.
pub fn macd(prices: &[f64]) -> MacdSeries {
    let fast = ema(prices, FAST_PERIOD);
    let slow = ema(prices, SLOW_PERIOD);

    let macd_line: Vec<f64> = fast
        .iter()
        .enumerate()
        .map(|(i, &f)| f - slow.get(i).copied().unwrap_or(0.0))
        .collect();

    let signal_line = ema(&macd_line, SIGNAL_PERIOD);

    MacdSeries {
        macd_line,
        signal_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_empty_input() {
        let m = macd(&[]);
        assert!(m.macd_line.is_empty());
        assert!(m.signal_line.is_empty());
        assert!(m.last().is_none());
    }

    #[test]
    fn macd_aligned_with_input() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let m = macd(&prices);
        assert_eq!(m.macd_line.len(), prices.len());
        assert_eq!(m.signal_line.len(), prices.len());
    }

    #[test]
    fn macd_starts_at_zero() {
        // Both EMAs are seeded at the first price, so index 0 is always 0.
        let prices = vec![123.4, 125.0, 124.1];
        let m = macd(&prices);
        assert!(m.macd_line[0].abs() < 1e-12);
        assert!(m.signal_line[0].abs() < 1e-12);
    }

    #[test]
    fn rising_trend_puts_macd_above_signal() {
        // Fast EMA pulls ahead of the slow EMA in a steady uptrend, and the
        // smoothed signal line trails the MACD line.
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let (macd_v, signal_v) = macd(&prices).last().unwrap();
        assert!(macd_v > 0.0);
        assert!(macd_v > signal_v);
    }

    #[test]
    fn falling_trend_puts_macd_below_signal() {
        let prices: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let (macd_v, signal_v) = macd(&prices).last().unwrap();
        assert!(macd_v < 0.0);
        assert!(macd_v < signal_v);
    }

    #[test]
    fn flat_series_is_all_zero() {
        let m = macd(&[50.0; 40]);
        for &v in &m.macd_line {
            assert!(v.abs() < 1e-12);
        }
        for &v in &m.signal_line {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn macd_equals_fast_minus_slow_elementwise() {
        // Pins the alignment contract: every slot is EMA12 - EMA26 with the
        // 0.0 substitution never needed for equal-length series.
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + ((i * 7) % 11) as f64).collect();
        let fast = ema(&prices, 12);
        let slow = ema(&prices, 26);
        let m = macd(&prices);
        for i in 0..prices.len() {
            assert!((m.macd_line[i] - (fast[i] - slow[i])).abs() < 1e-12);
        }
    }
}
