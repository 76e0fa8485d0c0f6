//! Outcome states for asynchronous operations.

use serde::{Deserialize, Serialize};

/// State machine governing every async operation the client core exposes.
///
/// Each operation (cart reconciliation, checkout submission, catalog fetch)
/// rests in `Idle`, moves to `Loading` while a request is in flight, and
/// settles in `Success` or `Failed` with a user-presentable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeState {
    /// No operation has run, or the last one was cleared.
    #[default]
    Idle,
    /// A request/response round trip is in flight.
    Loading,
    /// The last operation completed and was confirmed by the server.
    Success,
    /// The last operation failed; carries a user-presentable reason.
    Failed(String),
}

impl OutcomeState {
    /// Whether a round trip is currently in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether the last operation failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(OutcomeState::default(), OutcomeState::Idle);
    }

    #[test]
    fn test_predicates() {
        assert!(OutcomeState::Loading.is_loading());
        assert!(!OutcomeState::Success.is_loading());
        assert!(OutcomeState::Failed("boom".to_owned()).is_failed());
        assert!(!OutcomeState::Idle.is_failed());
    }
}
