// =============================================================================
// Shared types used across the VoltScan signal engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// One indicator's directional opinion on an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Vote {
    Rise,
    Fall,
    Neutral,
}

impl std::fmt::Display for Vote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rise => write!(f, "RISE"),
            Self::Fall => write!(f, "FALL"),
            Self::Neutral => write!(f, "--"),
        }
    }
}

/// The aggregated directional call for an instrument after all three
/// indicator votes are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalCall {
    Rise,
    Fall,
    NoClearSignal,
}

impl std::fmt::Display for SignalCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rise => write!(f, "RISE"),
            Self::Fall => write!(f, "FALL"),
            Self::NoClearSignal => write!(f, "NO CLEAR SIGNAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_serialises_uppercase() {
        assert_eq!(serde_json::to_string(&Vote::Rise).unwrap(), "\"RISE\"");
        assert_eq!(
            serde_json::to_string(&Vote::Neutral).unwrap(),
            "\"NEUTRAL\""
        );
    }

    #[test]
    fn call_serialises_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&SignalCall::NoClearSignal).unwrap(),
            "\"NO_CLEAR_SIGNAL\""
        );
    }

    #[test]
    fn call_display_matches_dashboard_labels() {
        assert_eq!(SignalCall::Rise.to_string(), "RISE");
        assert_eq!(SignalCall::NoClearSignal.to_string(), "NO CLEAR SIGNAL");
    }
}
