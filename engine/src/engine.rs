//! Match engine: state machine, vote resolution and round clock
//!
//! The engine is a plain single-owner value: every operation takes `&mut self`
//! and completes synchronously. The round clock is an explicit handle that is
//! armed by [`MatchEngine::start_timer`] and advanced by whoever owns the
//! engine calling [`MatchEngine::tick`] on a fixed cadence.
//!
//! ```text
//! idle --start--> running --(clock=0, not final)--> roundEnd --start--> running
//! running --(clock=0, final, level, golden on)--> roundEnd(golden) --start--> running(golden)
//! running --(clock=0, otherwise)--> matchEnd
//! running(golden) --(points awarded)--> matchEnd
//! running(golden) --(clock=0)--> matchEnd
//! any --10th gam-jeom--> matchEnd (opponent wins)
//! running --pause--> paused --start--> running
//! roundEnd --advance--> idle
//! * --new match--> idle
//! ```

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigPatch, MatchConfig};
use crate::consensus::{ConsensusCheck, Vote, VoteBuffer};
use crate::outcome::{Outcome, Rejection, ScoreAward, ScoreOutcome};
use crate::seats::{SeatNumber, SeatRegistry};
use crate::snapshot::Snapshot;
use crate::state::{MatchState, MatchStatus, Side, Winner, Zone};

/// Gam-jeom count at which a competitor is disqualified
pub const DISQUALIFICATION_PENALTIES: u32 = 10;

/// Receives the notifications produced while the round clock ticks
pub trait TimerObserver {
    /// Called on every processed tick, after any round-end handling
    fn on_tick(&mut self, snapshot: &Snapshot);

    /// Called once when the clock reaches zero and the round is resolved
    fn on_round_end(&mut self, snapshot: &Snapshot);
}

impl TimerObserver for () {
    fn on_tick(&mut self, _snapshot: &Snapshot) {}
    fn on_round_end(&mut self, _snapshot: &Snapshot) {}
}

/// Armed round clock; exists only while the clock runs
#[derive(Debug, Clone, Copy)]
struct RoundTimer {
    last_tick: DateTime<Utc>,
}

impl RoundTimer {
    fn armed_at(now: DateTime<Utc>) -> Self {
        Self { last_tick: now }
    }

    /// Seconds since the previous tick. A clock that stepped backwards
    /// counts as no time passing.
    fn lap(&mut self, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - self.last_tick)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick = now;
        elapsed
    }
}

/// Owns configuration, match state, the vote buffer, the judge roster and the
/// round clock
#[derive(Debug)]
pub struct MatchEngine<C: Clock = SystemClock> {
    clock: C,
    config: MatchConfig,
    state: MatchState,
    votes: VoteBuffer,
    seats: SeatRegistry,
    timer: Option<RoundTimer>,
}

impl MatchEngine<SystemClock> {
    /// Engine with default rules on the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MatchEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MatchEngine<C> {
    pub fn with_clock(clock: C) -> Self {
        let config = MatchConfig::default();
        let state = MatchState::new(config.round_duration);
        Self {
            clock,
            config,
            state,
            votes: VoteBuffer::new(),
            seats: SeatRegistry::new(),
            timer: None,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Votes still waiting for agreement
    pub fn votes(&self) -> &VoteBuffer {
        &self.votes
    }

    /// Whether the round clock is armed
    pub fn timer_active(&self) -> bool {
        self.timer.is_some()
    }

    /// Independent copy of everything a renderer needs
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            config: self.config.clone(),
            state: self.state.clone(),
            judges: self.seats.views(),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Merge a partial configuration. An unstarted round picks up the new
    /// round duration immediately.
    pub fn configure(&mut self, patch: &ConfigPatch) -> Snapshot {
        self.config.apply(patch);

        let degenerate = self.config.degenerate_fields();
        if !degenerate.is_empty() {
            warn!(fields = ?degenerate, "Configuration accepted with zero-valued fields");
        }

        if matches!(
            self.state.status,
            MatchStatus::Idle | MatchStatus::RoundEnd
        ) {
            self.state.timer = f64::from(self.config.round_duration);
        }

        info!(
            rounds = self.config.rounds,
            round_duration = self.config.round_duration,
            golden_point = self.config.golden_point,
            consensus = self.config.consensus_enabled,
            "Configuration updated"
        );
        self.snapshot()
    }

    // =========================================================================
    // Round clock
    // =========================================================================

    /// Start (or resume) the round clock. No-op once the match has ended or
    /// while the clock already runs.
    pub fn start_timer(&mut self) -> Snapshot {
        if self.state.status.is_terminal() {
            debug!("Start ignored, match has ended");
            return self.snapshot();
        }
        if self.timer.is_some() {
            debug!("Start ignored, clock already running");
            return self.snapshot();
        }

        self.state.status = MatchStatus::Running;
        self.timer = Some(RoundTimer::armed_at(self.clock.now()));
        info!(
            round = self.state.current_round,
            golden_point = self.state.is_golden_point,
            remaining = self.state.timer,
            "Round clock started"
        );
        self.snapshot()
    }

    /// Pause a running clock, keeping the remaining time
    pub fn pause_timer(&mut self) -> Snapshot {
        if self.state.status != MatchStatus::Running {
            debug!(status = %self.state.status, "Pause ignored");
            return self.snapshot();
        }

        self.stop_timer();
        self.state.status = MatchStatus::Paused;
        info!(remaining = self.state.timer, "Round clock paused");
        self.snapshot()
    }

    /// Advance the clock by the wall-clock time elapsed since the previous
    /// tick. Returns `false` (and notifies nobody) when the clock is not armed.
    pub fn tick<O: TimerObserver + ?Sized>(&mut self, observer: &mut O) -> bool {
        let now = self.clock.now();
        let Some(timer) = self.timer.as_mut() else {
            return false;
        };

        let elapsed = timer.lap(now);
        // microsecond resolution, so repeated laps don't leave float residue
        let remaining = ((self.state.timer - elapsed) * 1e6).round() / 1e6;
        self.state.timer = remaining.max(0.0);

        if self.state.timer <= 0.0 {
            self.state.timer = 0.0;
            self.stop_timer();
            self.resolve_round_end();
            observer.on_round_end(&self.snapshot());
        }

        observer.on_tick(&self.snapshot());
        true
    }

    fn stop_timer(&mut self) {
        if self.timer.take().is_some() {
            debug!(remaining = self.state.timer, "Round clock stopped");
        }
    }

    fn resolve_round_end(&mut self) {
        let round = self.state.current_round;

        if self.state.is_golden_point {
            // no one scored during sudden death
            self.finish(self.state.leader());
        } else if round >= self.config.rounds {
            if self.state.leader() == Winner::Draw && self.config.golden_point {
                self.state.status = MatchStatus::RoundEnd;
                self.state.is_golden_point = true;
                self.state.timer = f64::from(self.config.round_duration);
                info!(round, "Final round level, golden point armed");
            } else {
                self.finish(self.state.leader());
            }
        } else {
            self.state.status = MatchStatus::RoundEnd;
            self.state.current_round += 1;
            self.state.timer = f64::from(self.config.round_duration);
            info!(
                finished = round,
                next = self.state.current_round,
                "Round ended"
            );
        }
    }

    fn finish(&mut self, winner: Winner) {
        self.stop_timer();
        self.state.status = MatchStatus::MatchEnd;
        self.state.winner = Some(winner);
        info!(
            winner = %winner,
            red = self.state.total(Side::Red),
            blue = self.state.total(Side::Blue),
            "Match ended"
        );
    }

    // =========================================================================
    // Scoring
    // =========================================================================

    /// Register a judge's vote. Only accepted while the clock runs.
    pub fn submit_score(&mut self, seat: SeatNumber, side: Side, zone: Zone) -> ScoreOutcome {
        if self.state.status != MatchStatus::Running {
            return ScoreOutcome::Rejected(Rejection::StatusMismatch {
                expected: MatchStatus::Running,
                actual: self.state.status,
            });
        }

        if !self.config.consensus_enabled {
            let award = self.apply_score(side, zone);
            return ScoreOutcome::Awarded {
                award,
                snapshot: self.snapshot(),
            };
        }

        let vote = Vote {
            seat,
            side,
            zone,
            cast_at: self.clock.now(),
        };
        let required = self.config.consensus_min_judges;
        match self.votes.submit(vote, self.config.window(), required) {
            ConsensusCheck::Reached { judges } => {
                debug!(side = %side, zone = %zone, judges, "Consensus reached");
                let award = self.apply_score(side, zone);
                ScoreOutcome::Awarded {
                    award,
                    snapshot: self.snapshot(),
                }
            }
            ConsensusCheck::Pending { judges } => ScoreOutcome::Pending { judges, required },
        }
    }

    fn apply_score(&mut self, side: Side, zone: Zone) -> ScoreAward {
        let points = self.config.points.get(zone);
        self.state.scores[side] = self.state.scores[side].saturating_add(points);
        info!(side = %side, zone = %zone, points, total = self.state.total(side), "Points awarded");

        if self.state.is_golden_point && points > 0 {
            info!(side = %side, "Golden point scored");
            self.finish(side.into());
        }

        ScoreAward { side, zone, points }
    }

    /// Record a gam-jeom against `side`; the opponent gains one point.
    /// Applies in every status.
    pub fn submit_penalty(&mut self, side: Side) -> Snapshot {
        let opponent = side.opponent();
        self.state.penalties[side] = self.state.penalties[side].saturating_add(1);
        self.state.penalty_points[opponent] = self.state.penalty_points[opponent].saturating_add(1);
        info!(side = %side, penalties = self.state.penalties[side], "Gam-jeom recorded");

        if self.state.penalties[side] >= DISQUALIFICATION_PENALTIES {
            warn!(side = %side, "Competitor disqualified on gam-jeom");
            self.finish(opponent.into());
        }

        self.snapshot()
    }

    // =========================================================================
    // Judge seats
    // =========================================================================

    pub fn register_seat(&mut self, connection: &str, seat: SeatNumber) -> Outcome<Snapshot> {
        match self.seats.register(connection, seat) {
            Ok(()) => Outcome::Applied(self.snapshot()),
            Err(reason) => {
                debug!(connection, seat, %reason, "Seat registration rejected");
                Outcome::Rejected(reason)
            }
        }
    }

    /// Mark the connection's seat as disconnected; it stays on the roster
    pub fn disconnect_seat(&mut self, connection: &str) -> bool {
        self.seats.disconnect(connection)
    }

    pub fn remove_seat(&mut self, connection: &str) -> bool {
        self.seats.remove(connection)
    }

    /// Seat number a connection may vote with, if it holds a connected seat
    pub fn connected_seat(&self, connection: &str) -> Option<SeatNumber> {
        self.seats.connected_seat(connection)
    }

    // =========================================================================
    // Match lifecycle
    // =========================================================================

    /// Reset scores, penalties, round and clock. Rules and roster are kept.
    pub fn new_match(&mut self) -> Snapshot {
        self.stop_timer();
        self.state = MatchState::new(self.config.round_duration);
        self.votes.clear();
        info!("New match");
        self.snapshot()
    }

    /// Back to default rules with an empty roster
    pub fn reset(&mut self) -> Snapshot {
        self.config = MatchConfig::default();
        self.seats.clear();
        self.new_match()
    }

    /// Operator confirms the next round after a round end. Round number,
    /// clock and golden-point flag stay as round-end resolution left them.
    pub fn advance_from_round_end(&mut self) -> Outcome<Snapshot> {
        if self.state.status != MatchStatus::RoundEnd {
            return Outcome::Rejected(Rejection::StatusMismatch {
                expected: MatchStatus::RoundEnd,
                actual: self.state.status,
            });
        }
        self.state.status = MatchStatus::Idle;
        debug!(round = self.state.current_round, "Next round confirmed");
        Outcome::Applied(self.snapshot())
    }
}
