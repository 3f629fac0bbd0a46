//! Match state: sides, scoring zones, status and per-side counters

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::outcome::Rejection;

/// The two competitors, identified by their chest-protector colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Red,
    Blue,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Red, Side::Blue];

    /// The other competitor
    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(Self::Red),
            "blue" => Ok(Self::Blue),
            other => Err(Rejection::InvalidSide(other.to_string())),
        }
    }
}

/// Scoring zones a judge can vote for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Kick to the trunk protector
    Body,
    /// Kick to the head
    Head,
    /// Technical (turning) bonus
    Tech,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::Body, Zone::Head, Zone::Tech];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Head => "head",
            Self::Tech => "tech",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "body" => Ok(Self::Body),
            "head" => Ok(Self::Head),
            "tech" => Ok(Self::Tech),
            other => Err(Rejection::InvalidZone(other.to_string())),
        }
    }
}

/// Lifecycle status of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStatus {
    /// Waiting for the operator to start the round clock
    Idle,
    /// Round clock is counting down, votes are accepted
    Running,
    /// Round clock stopped mid-round
    Paused,
    /// Round clock expired; next round (or golden point) is armed
    RoundEnd,
    /// Winner decided; terminal until a new match
    MatchEnd,
}

impl MatchStatus {
    /// Whether this is the terminal status
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::MatchEnd)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::RoundEnd => write!(f, "roundEnd"),
            Self::MatchEnd => write!(f, "matchEnd"),
        }
    }
}

/// Final result of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Red,
    Blue,
    Draw,
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::Red => Self::Red,
            Side::Blue => Self::Blue,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Blue => write!(f, "blue"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// A value tracked once per competitor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub red: T,
    pub blue: T,
}

impl<T> Index<Side> for PerSide<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::Red => &self.red,
            Side::Blue => &self.blue,
        }
    }
}

impl<T> IndexMut<Side> for PerSide<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Red => &mut self.red,
            Side::Blue => &mut self.blue,
        }
    }
}

/// Live state of the match
///
/// `winner` is `Some` exactly when `status` is [`MatchStatus::MatchEnd`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    pub status: MatchStatus,
    /// 1-based round number
    pub current_round: u32,
    pub is_golden_point: bool,
    /// Remaining seconds in the current round
    pub timer: f64,
    pub scores: PerSide<u32>,
    /// Gam-jeom count committed by each side
    pub penalties: PerSide<u32>,
    /// Points each side received from the opponent's gam-jeom
    pub penalty_points: PerSide<u32>,
    pub winner: Option<Winner>,
}

impl MatchState {
    /// Fresh state for round 1 with a full clock
    pub fn new(round_duration: u32) -> Self {
        Self {
            status: MatchStatus::Idle,
            current_round: 1,
            is_golden_point: false,
            timer: f64::from(round_duration),
            scores: PerSide::default(),
            penalties: PerSide::default(),
            penalty_points: PerSide::default(),
            winner: None,
        }
    }

    /// Score plus penalty-derived points, capped at `u32::MAX`
    pub fn total(&self, side: Side) -> u32 {
        self.scores[side].saturating_add(self.penalty_points[side])
    }

    /// Who leads on totals right now (`Draw` when level)
    pub fn leader(&self) -> Winner {
        let red = self.total(Side::Red);
        let blue = self.total(Side::Blue);
        match red.cmp(&blue) {
            std::cmp::Ordering::Greater => Winner::Red,
            std::cmp::Ordering::Less => Winner::Blue,
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parsing() {
        assert_eq!("red".parse::<Side>(), Ok(Side::Red));
        assert_eq!("blue".parse::<Side>(), Ok(Side::Blue));
        assert_eq!(
            "green".parse::<Side>(),
            Err(Rejection::InvalidSide("green".into()))
        );
        assert_eq!(Side::Red.opponent(), Side::Blue);
    }

    #[test]
    fn test_zone_parsing() {
        for zone in Zone::ALL {
            assert_eq!(zone.as_str().parse::<Zone>(), Ok(zone));
        }
        assert!("leg".parse::<Zone>().is_err());
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&MatchStatus::RoundEnd).unwrap();
        assert_eq!(json, "\"roundEnd\"");
        assert_eq!(MatchStatus::MatchEnd.to_string(), "matchEnd");
    }

    #[test]
    fn test_leader_counts_penalty_points() {
        let mut state = MatchState::new(120);
        state.scores.red = 3;
        state.penalty_points.blue = 3;
        assert_eq!(state.leader(), Winner::Draw);

        state.penalty_points.blue += 1;
        assert_eq!(state.total(Side::Blue), 4);
        assert_eq!(state.leader(), Winner::Blue);
    }

    #[test]
    fn test_total_saturates_with_huge_point_values() {
        let mut state = MatchState::new(120);
        state.scores.red = u32::MAX;
        state.penalty_points.red = 1;
        state.penalty_points.blue = 1;

        assert_eq!(state.total(Side::Red), u32::MAX);
        assert_eq!(state.leader(), Winner::Red);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let value = serde_json::to_value(MatchState::new(90)).unwrap();
        assert_eq!(value["currentRound"], 1);
        assert_eq!(value["isGoldenPoint"], false);
        assert_eq!(value["timer"], 90.0);
        assert_eq!(value["penaltyPoints"]["red"], 0);
        assert!(value["winner"].is_null());
    }
}
