//! Judge seat registry
//!
//! Maps transport connections to judge seats. A seat number may have at most
//! one *connected* holder; holders that drop off are kept (flag cleared) so a
//! reconnect is recognised, until explicitly removed.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::outcome::Rejection;

/// Judge seat number as shown on the judge devices
pub type SeatNumber = u32;

/// Transport-level connection identity; never leaves the engine
pub type ConnectionId = String;

/// Seat numbers judges may claim
pub const SEAT_RANGE: RangeInclusive<SeatNumber> = 1..=3;

#[derive(Debug, Clone)]
struct SeatHolder {
    connection: ConnectionId,
    seat: SeatNumber,
    connected: bool,
}

/// Public view of one seat, without the connection identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub id: SeatNumber,
    pub connected: bool,
}

/// Registry of seat holders, in registration order
#[derive(Debug, Clone, Default)]
pub struct SeatRegistry {
    holders: Vec<SeatHolder>,
}

impl SeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `seat` for `connection`.
    ///
    /// A connection that registers again keeps its position in the roster.
    pub fn register(&mut self, connection: &str, seat: SeatNumber) -> Result<(), Rejection> {
        if !SEAT_RANGE.contains(&seat) {
            return Err(Rejection::SeatOutOfRange(seat));
        }

        let taken = self
            .holders
            .iter()
            .any(|h| h.seat == seat && h.connected && h.connection != connection);
        if taken {
            return Err(Rejection::SeatTaken(seat));
        }

        match self.holders.iter_mut().find(|h| h.connection == connection) {
            Some(holder) => {
                holder.seat = seat;
                holder.connected = true;
            }
            None => self.holders.push(SeatHolder {
                connection: connection.to_string(),
                seat,
                connected: true,
            }),
        }
        debug!(connection, seat, "Seat registered");
        Ok(())
    }

    /// Mark the connection's seat as disconnected. Returns whether it held one.
    pub fn disconnect(&mut self, connection: &str) -> bool {
        match self.holders.iter_mut().find(|h| h.connection == connection) {
            Some(holder) => {
                holder.connected = false;
                debug!(connection, seat = holder.seat, "Seat disconnected");
                true
            }
            None => false,
        }
    }

    /// Forget the connection's seat entirely. Returns whether it held one.
    pub fn remove(&mut self, connection: &str) -> bool {
        let before = self.holders.len();
        self.holders.retain(|h| h.connection != connection);
        before != self.holders.len()
    }

    /// Seat held by `connection`, only while connected
    pub fn connected_seat(&self, connection: &str) -> Option<SeatNumber> {
        self.holders
            .iter()
            .find(|h| h.connection == connection && h.connected)
            .map(|h| h.seat)
    }

    pub fn views(&self) -> Vec<SeatView> {
        self.holders
            .iter()
            .map(|h| SeatView {
                id: h.seat,
                connected: h.connected,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.holders.clear();
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_rejected() {
        let mut seats = SeatRegistry::new();
        assert_eq!(seats.register("a", 0), Err(Rejection::SeatOutOfRange(0)));
        assert_eq!(seats.register("a", 4), Err(Rejection::SeatOutOfRange(4)));
        assert!(seats.is_empty());
    }

    #[test]
    fn test_connected_holder_blocks_other_connection() {
        let mut seats = SeatRegistry::new();
        assert!(seats.register("a", 2).is_ok());
        assert_eq!(seats.register("b", 2), Err(Rejection::SeatTaken(2)));

        seats.disconnect("a");
        assert!(seats.register("b", 2).is_ok());
        assert_eq!(seats.connected_seat("b"), Some(2));
        assert_eq!(seats.connected_seat("a"), None);
    }

    #[test]
    fn test_same_connection_reregisters() {
        let mut seats = SeatRegistry::new();
        seats.register("a", 1).unwrap();
        seats.register("b", 3).unwrap();
        seats.register("a", 1).unwrap();

        assert_eq!(seats.len(), 2);
        assert_eq!(
            seats.views(),
            vec![
                SeatView {
                    id: 1,
                    connected: true
                },
                SeatView {
                    id: 3,
                    connected: true
                },
            ]
        );
    }

    #[test]
    fn test_disconnected_holder_retained_until_removed() {
        let mut seats = SeatRegistry::new();
        seats.register("a", 1).unwrap();

        assert!(seats.disconnect("a"));
        assert_eq!(
            seats.views(),
            vec![SeatView {
                id: 1,
                connected: false
            }]
        );

        // reconnect under the same identity
        seats.register("a", 1).unwrap();
        assert_eq!(seats.connected_seat("a"), Some(1));

        assert!(seats.remove("a"));
        assert!(!seats.remove("a"));
        assert!(!seats.disconnect("a"));
        assert!(seats.is_empty());
    }
}
