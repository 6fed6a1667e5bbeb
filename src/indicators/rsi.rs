// =============================================================================
// Relative Strength Index (RSI) — rolling-sum variant
// =============================================================================
//
// Maintains running sums of gains and losses over the trailing `period`
// price differences and slides the window by subtracting the difference that
// exits it:
//
//   avg_gain = gains / period
//   avg_loss = losses / period
//   RSI      = 100 - 100 / (1 + avg_gain / avg_loss)
//
// Output is index-aligned with the input.  Index 0 is always `None` (no
// prior difference) and indices before `period` differences have accumulated
// are `None` as well; the first computable value sits at index `period`.
//
// A zero-loss window (including a perfectly flat one) yields RSI = 100.0 by
// definition — the naive formula would divide by zero there.
// =============================================================================

/// Compute the RSI series for `prices` with the given look-back `period`.
pub fn rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if prices.is_empty() {
        return Vec::new();
    }
    let period = period.max(1);
    let period_f = period as f64;

    let mut out = Vec::with_capacity(prices.len());
    out.push(None);

    let mut gains = 0.0_f64;
    let mut losses = 0.0_f64;

    for i in 1..prices.len() {
        let change = prices[i] - prices[i - 1];
        gains += change.max(0.0);
        losses += (-change).max(0.0);

        if i >= period {
            let avg_gain = gains / period_f;
            let avg_loss = losses / period_f;

            let value = if avg_loss == 0.0 {
                // No losses in the window: momentum is all upside (or flat).
                100.0
            } else {
                let rs = avg_gain / avg_loss;
                100.0 - 100.0 / (1.0 + rs)
            };
            out.push(Some(value));

            // Slide the window: drop the oldest difference.
            let exiting = prices[i - period + 1] - prices[i - period];
            gains -= exiting.max(0.0);
            losses -= (-exiting).max(0.0);
        } else {
            out.push(None);
        }
    }

    out
}
