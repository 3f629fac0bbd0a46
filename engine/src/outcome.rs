//! Explicit results for operations that reject caller input silently
//!
//! Rejections are not errors: nothing failed, the request simply had no
//! effect. They carry a reason so callers can log why.

use crate::seats::SeatNumber;
use crate::snapshot::Snapshot;
use crate::state::{MatchStatus, Side, Zone};

/// Why a request had no effect
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("requires status {expected}, match is {actual}")]
    StatusMismatch {
        expected: MatchStatus,
        actual: MatchStatus,
    },

    #[error("unknown side: {0}")]
    InvalidSide(String),

    #[error("unknown scoring zone: {0}")]
    InvalidZone(String),

    #[error("seat {0} is outside the judge roster")]
    SeatOutOfRange(SeatNumber),

    #[error("seat {0} is held by another connected judge")]
    SeatTaken(SeatNumber),

    #[error("connection {0} holds no connected seat")]
    NotSeated(String),
}

/// Result of an operation that is either applied or silently rejected
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// The applied value, discarding the rejection reason
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Applied(_) => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

/// Points granted to one side by a resolved score submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreAward {
    pub side: Side,
    pub zone: Zone,
    pub points: u32,
}

/// Result of a judge's score vote
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    /// Points were added to the board
    Awarded { award: ScoreAward, snapshot: Snapshot },
    /// Vote buffered; not enough distinct judges agree yet
    Pending { judges: usize, required: u32 },
    /// Vote had no effect
    Rejected(Rejection),
}

impl ScoreOutcome {
    pub fn is_awarded(&self) -> bool {
        matches!(self, Self::Awarded { .. })
    }

    /// Snapshot after the award, `None` for pending or rejected votes
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::Awarded { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    pub fn award(&self) -> Option<ScoreAward> {
        match self {
            Self::Awarded { award, .. } => Some(*award),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let applied: Outcome<u32> = Outcome::Applied(7);
        assert!(applied.is_applied());
        assert_eq!(applied.rejection(), None);
        assert_eq!(applied.applied(), Some(7));

        let rejected: Outcome<u32> = Outcome::Rejected(Rejection::SeatTaken(2));
        assert!(!rejected.is_applied());
        assert_eq!(rejected.rejection(), Some(&Rejection::SeatTaken(2)));
        assert_eq!(rejected.applied(), None);
    }

    #[test]
    fn test_rejection_messages() {
        let reason = Rejection::StatusMismatch {
            expected: MatchStatus::Running,
            actual: MatchStatus::Paused,
        };
        assert_eq!(reason.to_string(), "requires status running, match is paused");
        assert_eq!(
            Rejection::SeatOutOfRange(4).to_string(),
            "seat 4 is outside the judge roster"
        );
    }

    #[test]
    fn test_pending_has_no_snapshot() {
        let pending = ScoreOutcome::Pending {
            judges: 1,
            required: 2,
        };
        assert!(!pending.is_awarded());
        assert!(pending.snapshot().is_none());
        assert!(pending.award().is_none());
    }
}
