// =============================================================================
// Bollinger Bands
// =============================================================================
//
// For every index from `period - 1` onward, over the trailing window of
// `period` prices:
//
//   middle = SMA(window)
//   upper  = middle + mult * σ
//   lower  = middle - mult * σ
//
// σ is the population standard deviation (divide by `period`, not
// `period - 1`).  Indices before the first full window are `None` in all
// three bands, keeping the output index-aligned with the input.
// =============================================================================

use serde::Serialize;

/// The three Bollinger band series, index-aligned with the input prices.
#[derive(Debug, Clone, Serialize)]
pub struct BollingerSeries {
    pub middle: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

impl BollingerSeries {
    /// Last computed band triple `(middle, upper, lower)`, if any window has
    /// completed.
    pub fn last(&self) -> Option<(f64, f64, f64)> {
        match (
            self.middle.last().copied().flatten(),
            self.upper.last().copied().flatten(),
            self.lower.last().copied().flatten(),
        ) {
            (Some(m), Some(u), Some(l)) => Some((m, u, l)),
            _ => None,
        }
    }
}

/// Compute Bollinger Bands over `prices` with the given window `period` and
/// band width multiplier `mult`.
pub fn bollinger(prices: &[f64], period: usize, mult: f64) -> BollingerSeries {
    let period = period.max(1);
    let mut middle = Vec::with_capacity(prices.len());
    let mut upper = Vec::with_capacity(prices.len());
    let mut lower = Vec::with_capacity(prices.len());

    for i in 0..prices.len() {
        if i + 1 < period {
            middle.push(None);
            upper.push(None);
            lower.push(None);
            continue;
        }

        let window = &prices[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / period as f64;
        let std = variance.sqrt();

        middle.push(Some(mean));
        upper.push(Some(mean + mult * std));
        lower.push(Some(mean - mult * std));
    }

    BollingerSeries {
        middle,
        upper,
        lower,
    }
}
