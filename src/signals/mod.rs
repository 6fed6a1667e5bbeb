// =============================================================================
// Signals Module
// =============================================================================
//
// Signal pipeline for the scanner:
// - Per-instrument evaluation (three indicator votes -> call + confidence)
// - Cross-instrument aggregation (rank, tie-break, validity window)

pub mod aggregator;
pub mod evaluator;

pub use aggregator::{RankedSignal, ScanError, SignalAggregator};
pub use evaluator::{SignalEvaluator, SignalResult, VoteBreakdown, MIN_SCAN_POINTS};
