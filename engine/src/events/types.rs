//! Event types pushed to presentation clients

use serde::{Deserialize, Serialize};

use crate::outcome::ScoreAward;
use crate::seats::{ConnectionId, SeatNumber};
use crate::snapshot::Snapshot;
use crate::state::{Side, Zone};

/// Everything the match service broadcasts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    /// Fresh snapshot after a command or a clock tick
    StateUpdate { snapshot: Snapshot },

    /// A score was applied; drives scoreboard flourishes
    ScoreAwarded { side: Side, zone: Zone, points: u32 },

    /// The round clock expired (the buzzer)
    RoundEnd { snapshot: Snapshot },

    /// Reply to a seat registration, addressed to one connection
    SeatRegistered {
        connection: ConnectionId,
        seat: SeatNumber,
        accepted: bool,
    },
}

impl MatchEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            MatchEvent::StateUpdate { .. } => "state_update",
            MatchEvent::ScoreAwarded { .. } => "score_awarded",
            MatchEvent::RoundEnd { .. } => "round_end",
            MatchEvent::SeatRegistered { .. } => "seat_registered",
        }
    }

    /// Snapshot carried by the event, if any
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            MatchEvent::StateUpdate { snapshot } | MatchEvent::RoundEnd { snapshot } => {
                Some(snapshot)
            }
            _ => None,
        }
    }
}

impl From<ScoreAward> for MatchEvent {
    fn from(award: ScoreAward) -> Self {
        MatchEvent::ScoreAwarded {
            side: award.side,
            zone: award.zone,
            points: award.points,
        }
    }
}
