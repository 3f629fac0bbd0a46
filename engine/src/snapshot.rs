//! Immutable view of the match handed to transports and renderers

use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::seats::SeatView;
use crate::state::MatchState;

/// Deep copy of configuration, state and the judge roster.
///
/// Owns all of its data; later engine mutations never show through.
/// Connection identities are deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: MatchConfig,
    pub state: MatchState,
    /// Seats in registration order
    pub judges: Vec<SeatView>,
}

impl Snapshot {
    /// Number of judges currently connected
    pub fn connected_judges(&self) -> usize {
        self.judges.iter().filter(|j| j.connected).count()
    }
}
