// =============================================================================
// Signal Evaluator — one instrument, three indicator votes
// =============================================================================
//
// Pipeline per instrument:
//   1. Bollinger(20, 2):  price above upper band => FALL, below lower => RISE
//   2. MACD(12, 26, 9):   macd above signal => RISE, below => FALL
//   3. EMA(50) + RSI(14): price above EMA50 with RSI in (50, 70) => RISE,
//                         price below EMA50 with RSI in (30, 50) => FALL
//   4. confidence = |rise votes - fall votes|, call by majority
//   5. projected exit = entry * (1 ± 0.002)
//
// The exit estimate is a fixed ±0.2% heuristic, not a volatility model.
// =============================================================================

use serde::Serialize;

use crate::indicators::{
    bollinger, ema, macd, rsi, BOLLINGER_MULT, BOLLINGER_PERIOD, EMA_TREND_PERIOD, RSI_PERIOD,
};
use crate::types::{SignalCall, Vote};

/// Minimum buffered observations before an instrument is scored at all.
pub const MIN_SCAN_POINTS: usize = 20;

/// Fixed projected-exit offset: ±0.2% of the entry price.
const EXIT_OFFSET: f64 = 0.002;

/// The three independent indicator opinions for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteBreakdown {
    pub bollinger: Vote,
    pub macd: Vote,
    pub ema_rsi: Vote,
}

/// Aggregated signal for one instrument at scan time.  Ephemeral: computed
/// on demand from the price snapshot, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalResult {
    pub symbol: String,
    pub call: SignalCall,
    /// Vote imbalance, 0..=3.  3 means all three indicators agree.
    pub confidence: u8,
    /// Last observed price.
    pub entry: f64,
    /// Entry shifted by the fixed ±0.2% heuristic (unchanged when there is
    /// no clear signal).
    pub projected_exit: f64,
    pub votes: VoteBreakdown,
}

pub struct SignalEvaluator;

impl SignalEvaluator {
    /// Evaluate one instrument from its chronological price snapshot.
    ///
    /// Returns `None` when fewer than [`MIN_SCAN_POINTS`] observations are
    /// buffered — the instrument is skipped, not scored.
    pub fn evaluate(symbol: &str, prices: &[f64]) -> Option<SignalResult> {
        if prices.len() < MIN_SCAN_POINTS {
            return None;
        }
        let entry = *prices.last()?;

        let votes = VoteBreakdown {
            bollinger: Self::bollinger_vote(prices, entry),
            macd: Self::macd_vote(prices),
            ema_rsi: Self::ema_rsi_vote(prices, entry),
        };

        let (call, confidence) = aggregate_votes([votes.bollinger, votes.macd, votes.ema_rsi]);

        let projected_exit = match call {
            SignalCall::Rise => entry * (1.0 + EXIT_OFFSET),
            SignalCall::Fall => entry * (1.0 - EXIT_OFFSET),
            SignalCall::NoClearSignal => entry,
        };

        Some(SignalResult {
            symbol: symbol.to_string(),
            call,
            confidence,
            entry,
            projected_exit,
            votes,
        })
    }

    /// Mean-reversion read of the Bollinger bands: a close outside the band
    /// is expected to revert toward the middle.
    fn bollinger_vote(prices: &[f64], last_price: f64) -> Vote {
        let bands = bollinger(prices, BOLLINGER_PERIOD, BOLLINGER_MULT);
        match bands.last() {
            Some((_middle, upper, lower)) => {
                if last_price > upper {
                    Vote::Fall
                } else if last_price < lower {
                    Vote::Rise
                } else {
                    Vote::Neutral
                }
            }
            None => Vote::Neutral,
        }
    }

    /// Trend-following read of the MACD crossover at the latest index.
    fn macd_vote(prices: &[f64]) -> Vote {
        match macd(prices).last() {
            Some((macd_v, signal_v)) => {
                if macd_v > signal_v {
                    Vote::Rise
                } else if macd_v < signal_v {
                    Vote::Fall
                } else {
                    Vote::Neutral
                }
            }
            None => Vote::Neutral,
        }
    }

    /// Momentum confirmation: trend direction from EMA50, strength band from
    /// RSI14.  RSI outside the confirmation band leaves the vote neutral.
    fn ema_rsi_vote(prices: &[f64], last_price: f64) -> Vote {
        let last_ema = match ema(prices, EMA_TREND_PERIOD).last() {
            Some(&v) => v,
            None => return Vote::Neutral,
        };
        let last_rsi = match rsi(prices, RSI_PERIOD).last().copied().flatten() {
            Some(v) => v,
            None => return Vote::Neutral,
        };

        if last_price > last_ema && last_rsi > 50.0 && last_rsi < 70.0 {
            Vote::Rise
        } else if last_price < last_ema && last_rsi < 50.0 && last_rsi > 30.0 {
            Vote::Fall
        } else {
            Vote::Neutral
        }
    }
}

/// Reduce three votes to a final call and a 0..=3 confidence.
fn aggregate_votes(votes: [Vote; 3]) -> (SignalCall, u8) {
    let rise = votes.iter().filter(|v| **v == Vote::Rise).count();
    let fall = votes.iter().filter(|v| **v == Vote::Fall).count();

    let confidence = rise.abs_diff(fall) as u8;
    let call = if rise > fall {
        SignalCall::Rise
    } else if fall > rise {
        SignalCall::Fall
    } else {
        SignalCall::NoClearSignal
    };

    (call, confidence)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// A rising drift with pullbacks: +1.0 / -0.5 alternating steps.  Every
    /// trailing 14-diff window holds 7 gains of 1.0 and 7 losses of 0.5, so
    /// RSI sits at exactly 66.7 — inside the (50, 70) confirmation band —
    /// while the price stays above its lagging EMA50.
    fn choppy_uptrend(len: usize) -> Vec<f64> {
        let mut prices = vec![100.0];
        for i in 0..len - 1 {
            let last = *prices.last().unwrap();
            let step = if i % 2 == 0 { 1.0 } else { -0.5 };
            prices.push(last + step);
        }
        prices
    }

    fn choppy_downtrend(len: usize) -> Vec<f64> {
        choppy_uptrend(len).iter().map(|p| 200.0 - p).collect()
    }

    // ---- aggregate_votes --------------------------------------------------

    #[test]
    fn aggregation_exhaustive_over_all_vote_combinations() {
        let all = [Vote::Rise, Vote::Fall, Vote::Neutral];
        for a in all {
            for b in all {
                for c in all {
                    let votes = [a, b, c];
                    let rise = votes.iter().filter(|v| **v == Vote::Rise).count();
                    let fall = votes.iter().filter(|v| **v == Vote::Fall).count();
                    let (call, confidence) = aggregate_votes(votes);

                    assert!(confidence <= 3);
                    if confidence == 3 {
                        assert!(votes.iter().all(|v| *v == a), "unanimity required: {votes:?}");
                    }
                    match call {
                        SignalCall::Rise => assert!(rise > fall),
                        SignalCall::Fall => assert!(fall > rise),
                        SignalCall::NoClearSignal => assert_eq!(rise, fall),
                    }
                }
            }
        }
    }

    #[test]
    fn unanimous_rise_is_confidence_3() {
        let (call, confidence) = aggregate_votes([Vote::Rise, Vote::Rise, Vote::Rise]);
        assert_eq!(call, SignalCall::Rise);
        assert_eq!(confidence, 3);
    }

    #[test]
    fn split_votes_cancel_out() {
        let (call, confidence) = aggregate_votes([Vote::Rise, Vote::Fall, Vote::Neutral]);
        assert_eq!(call, SignalCall::NoClearSignal);
        assert_eq!(confidence, 0);
    }

    // ---- individual votes -------------------------------------------------

    #[test]
    fn bollinger_vote_fall_on_upside_breakout() {
        // Flat base then a spike far above the upper band.
        let mut prices = vec![100.0; 24];
        prices.push(110.0);
        assert_eq!(SignalEvaluator::bollinger_vote(&prices, 110.0), Vote::Fall);
    }

    #[test]
    fn bollinger_vote_rise_on_downside_breakout() {
        let mut prices = vec![100.0; 24];
        prices.push(90.0);
        assert_eq!(SignalEvaluator::bollinger_vote(&prices, 90.0), Vote::Rise);
    }

    #[test]
    fn bollinger_vote_neutral_inside_bands() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.9).sin()).collect();
        let last = *prices.last().unwrap();
        assert_eq!(SignalEvaluator::bollinger_vote(&prices, last), Vote::Neutral);
    }

    #[test]
    fn macd_vote_follows_crossover_direction() {
        // EMA12 above EMA26 at the last index => RISE; the inverse => FALL.
        let up: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        assert_eq!(SignalEvaluator::macd_vote(&up), Vote::Rise);

        let down: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        assert_eq!(SignalEvaluator::macd_vote(&down), Vote::Fall);
    }

    #[test]
    fn macd_vote_neutral_on_flat_series() {
        assert_eq!(SignalEvaluator::macd_vote(&[100.0; 30]), Vote::Neutral);
    }

    #[test]
    fn ema_rsi_vote_rise_in_confirmed_uptrend() {
        let prices = choppy_uptrend(45);
        let last = *prices.last().unwrap();
        assert_eq!(SignalEvaluator::ema_rsi_vote(&prices, last), Vote::Rise);
    }

    #[test]
    fn ema_rsi_vote_fall_in_confirmed_downtrend() {
        let prices = choppy_downtrend(45);
        let last = *prices.last().unwrap();
        assert_eq!(SignalEvaluator::ema_rsi_vote(&prices, last), Vote::Fall);
    }

    #[test]
    fn ema_rsi_vote_neutral_when_rsi_overextended() {
        // Strictly rising => RSI = 100, outside the (50, 70) band.
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let last = *prices.last().unwrap();
        assert_eq!(SignalEvaluator::ema_rsi_vote(&prices, last), Vote::Neutral);
    }

    // ---- evaluate ---------------------------------------------------------

    #[test]
    fn evaluate_skips_short_buffers() {
        let prices: Vec<f64> = (0..MIN_SCAN_POINTS - 1).map(|i| 100.0 + i as f64).collect();
        assert!(SignalEvaluator::evaluate("R_10", &prices).is_none());
    }

    #[test]
    fn evaluate_scores_at_exactly_min_points() {
        let prices: Vec<f64> = (0..MIN_SCAN_POINTS).map(|i| 100.0 + i as f64).collect();
        assert!(SignalEvaluator::evaluate("R_10", &prices).is_some());
    }

    #[test]
    fn strictly_rising_21_points_calls_rise() {
        // Prices 100..=120: MACD votes RISE, Bollinger and EMA+RSI stay
        // inside their neutral zones (RSI pins at 100).
        let prices: Vec<f64> = (100..=120).map(|i| i as f64).collect();
        let result = SignalEvaluator::evaluate("R_75", &prices).unwrap();

        assert_eq!(result.call, SignalCall::Rise);
        assert!(result.confidence >= 1);
        assert_eq!(result.votes.macd, Vote::Rise);
        assert_ne!(result.votes.bollinger, Vote::Fall);
        assert!((result.entry - 120.0).abs() < f64::EPSILON);
        assert!((result.projected_exit - 120.0 * 1.002).abs() < 1e-9);
    }

    #[test]
    fn choppy_uptrend_reaches_confidence_2() {
        // MACD and EMA+RSI both confirm the trend.
        let prices = choppy_uptrend(45);
        let result = SignalEvaluator::evaluate("R_75", &prices).unwrap();
        assert_eq!(result.call, SignalCall::Rise);
        assert!(result.confidence >= 2, "confidence {} < 2", result.confidence);
    }

    #[test]
    fn no_clear_signal_keeps_entry_as_exit() {
        let prices = vec![100.0; 25];
        let result = SignalEvaluator::evaluate("R_50", &prices).unwrap();
        assert_eq!(result.call, SignalCall::NoClearSignal);
        assert_eq!(result.confidence, 0);
        assert!((result.projected_exit - result.entry).abs() < f64::EPSILON);
    }

    #[test]
    fn fall_exit_is_below_entry() {
        let prices = choppy_downtrend(45);
        let result = SignalEvaluator::evaluate("R_25", &prices).unwrap();
        assert_eq!(result.call, SignalCall::Fall);
        assert!((result.projected_exit - result.entry * 0.998).abs() < 1e-9);
    }
}
