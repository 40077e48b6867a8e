//! Authorization votes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One authorization module's opinion on one `(identity, action)` pair.
///
/// Votes are transient: cast, tallied by a strategy, and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    /// The module affirmatively allows the action.
    Grant,
    /// The module forbids the action.
    Deny,
    /// The module has no opinion (usually: "not my kind of action").
    Abstain,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grant => write!(f, "grant"),
            Self::Deny => write!(f, "deny"),
            Self::Abstain => write!(f, "abstain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_serializes_as_snake_case() {
        let json = serde_json::to_string(&Vote::Abstain).unwrap();
        assert_eq!(json, "\"abstain\"");
    }

    #[test]
    fn test_vote_display() {
        assert_eq!(Vote::Grant.to_string(), "grant");
        assert_eq!(Vote::Deny.to_string(), "deny");
    }
}
