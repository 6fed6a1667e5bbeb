// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   k     = 2 / (period + 1)
//   EMA_0 = price_0
//   EMA_t = price_t * k + EMA_{t-1} * (1 - k)
//
// The series is seeded with the first price, so the output has no warm-up
// gap: output length always equals input length and `ema[0] == prices[0]`.
// A period longer than the series is valid — it just smooths heavily.
// =============================================================================

/// Compute the EMA series for `prices` with the given look-back `period`.
///
/// Returns an empty `Vec` for empty input.  `period` must be at least 1;
/// a zero period is clamped to 1 (which degenerates to the raw prices).
pub fn ema(prices: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = prices.first() else {
        return Vec::new();
    };

    let k = 2.0 / (period.max(1) + 1) as f64;

    let mut out = Vec::with_capacity(prices.len());
    out.push(first);

    let mut prev = first;
    for &price in &prices[1..] {
        let value = price * k + prev * (1.0 - k);
        out.push(value);
        prev = value;
    }

    out
}
