//! Time-windowed multi-judge consensus
//!
//! Judges vote independently for a side and zone. A score only counts once
//! enough *distinct* judges voted for the same side+zone within the window.
//! Votes for other pairs stay buffered and can still agree later.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::seats::SeatNumber;
use crate::state::{Side, Zone};

/// A single judge's vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub seat: SeatNumber,
    pub side: Side,
    pub zone: Zone,
    pub cast_at: DateTime<Utc>,
}

/// Result of adding a vote to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusCheck {
    /// Enough judges agree; their votes were purged
    Reached { judges: usize },
    /// Not enough agreement yet
    Pending { judges: usize },
}

/// Rolling buffer of recent votes
#[derive(Debug, Clone, Default)]
pub struct VoteBuffer {
    votes: Vec<Vote>,
}

impl VoteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `vote`, drop everything older than `window` relative to the
    /// vote's own timestamp, then check agreement for its side+zone.
    pub fn submit(&mut self, vote: Vote, window: Duration, min_judges: u32) -> ConsensusCheck {
        self.votes.push(vote);
        self.prune(vote.cast_at, window);

        let judges = self.distinct_judges(vote.side, vote.zone);
        let required = usize::try_from(min_judges).unwrap_or(usize::MAX);
        debug!(
            side = %vote.side,
            zone = %vote.zone,
            judges,
            required,
            buffered = self.votes.len(),
            "Vote buffered"
        );

        if judges >= required {
            self.purge(vote.side, vote.zone);
            ConsensusCheck::Reached { judges }
        } else {
            ConsensusCheck::Pending { judges }
        }
    }

    /// Keep only votes cast within `window` of `now` (inclusive)
    pub fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        self.votes.retain(|v| now - v.cast_at <= window);
    }

    /// Number of different judges with a buffered vote for this pair
    pub fn distinct_judges(&self, side: Side, zone: Zone) -> usize {
        self.votes
            .iter()
            .filter(|v| v.side == side && v.zone == zone)
            .map(|v| v.seat)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Drop every buffered vote for this pair; returns how many were removed
    pub fn purge(&mut self, side: Side, zone: Zone) -> usize {
        let before = self.votes.len();
        self.votes.retain(|v| !(v.side == side && v.zone == zone));
        before - self.votes.len()
    }

    pub fn clear(&mut self) {
        self.votes.clear();
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vote> {
        self.votes.iter()
    }
}
