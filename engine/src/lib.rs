//! Taekwondo Match Scoring Engine
//!
//! This library provides:
//! - A match state machine: rounds, round clock, golden point, gam-jeom
//!   disqualification
//! - Time-windowed consensus between several judges voting on handheld devices
//! - Judge seat bookkeeping with reconnect detection
//! - A single-owner service task that serializes commands from many
//!   connections and broadcasts snapshots to scoreboards
//!
//! # Usage
//!
//! ```ignore
//! use tkd_engine::{EventBus, MatchEngine, MatchService, Side, Zone};
//! use tkd_engine::service::DEFAULT_TICK_INTERVAL;
//!
//! let bus = EventBus::new().shared();
//! let mut events = bus.subscribe();
//! let (handle, _task) = MatchService::spawn(MatchEngine::new(), bus, DEFAULT_TICK_INTERVAL);
//!
//! handle.register_seat("judge-phone-1", 1).await?;
//! handle.start_timer().await?;
//! let outcome = handle.submit_score("judge-phone-1", Side::Red, Zone::Head).await?;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod clock;
pub mod config;
pub mod consensus;
pub mod engine;
pub mod events;
pub mod outcome;
pub mod seats;
pub mod service;
pub mod snapshot;
pub mod state;

// Re-export key engine types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigPatch, MatchConfig, ZonePoints, ZonePointsPatch};
pub use engine::{MatchEngine, TimerObserver, DISQUALIFICATION_PENALTIES};
pub use outcome::{Outcome, Rejection, ScoreAward, ScoreOutcome};
pub use seats::{ConnectionId, SeatNumber, SeatView, SEAT_RANGE};
pub use snapshot::Snapshot;
pub use state::{MatchState, MatchStatus, PerSide, Side, Winner, Zone};

// Re-export service and event types
pub use events::{EventBus, MatchEvent, SharedEventBus};
pub use service::{MatchHandle, MatchService, ServiceError, ServiceResult};
