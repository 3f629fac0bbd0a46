//! Match service: the single owner of a [`MatchEngine`]
//!
//! Judges and operators talk to the engine from many connections at once,
//! but the engine is not safe under parallel mutation. The service moves the
//! engine into one Tokio task, feeds it commands from an mpsc queue, and
//! drives the round clock from the same loop. Results go back over oneshot
//! replies; snapshots and notifications go out on the [`EventBus`].
//!
//! [`EventBus`]: crate::events::EventBus

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::ConfigPatch;
use crate::engine::{MatchEngine, TimerObserver};
use crate::events::{MatchEvent, SharedEventBus};
use crate::outcome::{Outcome, Rejection, ScoreOutcome};
use crate::seats::{ConnectionId, SeatNumber};
use crate::snapshot::Snapshot;
use crate::state::{Side, Zone};

/// Default cadence of the round clock
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Shortest accepted cadence; tokio intervals reject a zero period
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Queue depth for pending commands
const COMMAND_CAPACITY: usize = 64;

/// Error type for service requests
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Match service has stopped")]
    Closed,
}

/// Result type for service requests
pub type ServiceResult<T> = Result<T, ServiceError>;

enum Command {
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Configure {
        patch: ConfigPatch,
        reply: oneshot::Sender<Snapshot>,
    },
    RegisterSeat {
        connection: ConnectionId,
        seat: SeatNumber,
        reply: oneshot::Sender<Outcome<Snapshot>>,
    },
    DisconnectSeat {
        connection: ConnectionId,
        reply: oneshot::Sender<Snapshot>,
    },
    RemoveSeat {
        connection: ConnectionId,
        reply: oneshot::Sender<Snapshot>,
    },
    SubmitScore {
        connection: ConnectionId,
        side: Side,
        zone: Zone,
        reply: oneshot::Sender<ScoreOutcome>,
    },
    SubmitPenalty {
        side: Side,
        reply: oneshot::Sender<Snapshot>,
    },
    StartTimer {
        reply: oneshot::Sender<Snapshot>,
    },
    PauseTimer {
        reply: oneshot::Sender<Snapshot>,
    },
    NewMatch {
        reply: oneshot::Sender<Snapshot>,
    },
    Reset {
        reply: oneshot::Sender<Snapshot>,
    },
    AdvanceFromRoundEnd {
        reply: oneshot::Sender<Outcome<Snapshot>>,
    },
    Shutdown,
}

/// Cloneable handle for sending commands to the service
#[derive(Debug, Clone)]
pub struct MatchHandle {
    tx: mpsc::Sender<Command>,
}

impl MatchHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> ServiceResult<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ServiceError::Closed)?;
        response.await.map_err(|_| ServiceError::Closed)
    }

    pub async fn snapshot(&self) -> ServiceResult<Snapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn configure(&self, patch: ConfigPatch) -> ServiceResult<Snapshot> {
        self.request(|reply| Command::Configure { patch, reply })
            .await
    }

    pub async fn register_seat(
        &self,
        connection: impl Into<ConnectionId>,
        seat: SeatNumber,
    ) -> ServiceResult<Outcome<Snapshot>> {
        let connection = connection.into();
        self.request(|reply| Command::RegisterSeat {
            connection,
            seat,
            reply,
        })
        .await
    }

    pub async fn disconnect_seat(
        &self,
        connection: impl Into<ConnectionId>,
    ) -> ServiceResult<Snapshot> {
        let connection = connection.into();
        self.request(|reply| Command::DisconnectSeat { connection, reply })
            .await
    }

    pub async fn remove_seat(&self, connection: impl Into<ConnectionId>) -> ServiceResult<Snapshot> {
        let connection = connection.into();
        self.request(|reply| Command::RemoveSeat { connection, reply })
            .await
    }

    /// Vote on behalf of the judge seated on `connection`
    pub async fn submit_score(
        &self,
        connection: impl Into<ConnectionId>,
        side: Side,
        zone: Zone,
    ) -> ServiceResult<ScoreOutcome> {
        let connection = connection.into();
        self.request(|reply| Command::SubmitScore {
            connection,
            side,
            zone,
            reply,
        })
        .await
    }

    pub async fn submit_penalty(&self, side: Side) -> ServiceResult<Snapshot> {
        self.request(|reply| Command::SubmitPenalty { side, reply })
            .await
    }

    pub async fn start_timer(&self) -> ServiceResult<Snapshot> {
        self.request(|reply| Command::StartTimer { reply }).await
    }

    pub async fn pause_timer(&self) -> ServiceResult<Snapshot> {
        self.request(|reply| Command::PauseTimer { reply }).await
    }

    pub async fn new_match(&self) -> ServiceResult<Snapshot> {
        self.request(|reply| Command::NewMatch { reply }).await
    }

    pub async fn reset(&self) -> ServiceResult<Snapshot> {
        self.request(|reply| Command::Reset { reply }).await
    }

    pub async fn advance_from_round_end(&self) -> ServiceResult<Outcome<Snapshot>> {
        self.request(|reply| Command::AdvanceFromRoundEnd { reply })
            .await
    }

    /// Ask the service to stop. Pending commands queued before this one are
    /// still processed.
    pub async fn shutdown(&self) -> ServiceResult<()> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| ServiceError::Closed)
    }
}

/// Publishes clock notifications on the bus
struct BusNotifier<'a> {
    bus: &'a SharedEventBus,
}

impl TimerObserver for BusNotifier<'_> {
    fn on_tick(&mut self, snapshot: &Snapshot) {
        self.bus.publish(MatchEvent::StateUpdate {
            snapshot: snapshot.clone(),
        });
    }

    fn on_round_end(&mut self, snapshot: &Snapshot) {
        self.bus.publish(MatchEvent::StateUpdate {
            snapshot: snapshot.clone(),
        });
        self.bus.publish(MatchEvent::RoundEnd {
            snapshot: snapshot.clone(),
        });
    }
}

/// Owns the engine inside a Tokio task
pub struct MatchService<C: Clock> {
    engine: MatchEngine<C>,
    bus: SharedEventBus,
    tick_interval: Duration,
}

impl<C: Clock> MatchService<C> {
    /// Move `engine` into a new task. The task ends when every handle is
    /// dropped or [`MatchHandle::shutdown`] is called. A zero
    /// `tick_interval` is raised to one millisecond.
    pub fn spawn(
        engine: MatchEngine<C>,
        bus: SharedEventBus,
        tick_interval: Duration,
    ) -> (MatchHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let service = Self {
            engine,
            bus,
            tick_interval: tick_interval.max(MIN_TICK_INTERVAL),
        };
        let task = tokio::spawn(service.run(rx));
        (MatchHandle { tx }, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(tick_ms = self.tick_interval.as_millis() as u64, "Match service started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if matches!(command, Command::Shutdown) {
                        break;
                    }
                    let was_running = self.engine.timer_active();
                    self.handle(command);
                    if !was_running && self.engine.timer_active() {
                        ticker.reset();
                    }
                }
                _ = ticker.tick(), if self.engine.timer_active() => {
                    let mut notifier = BusNotifier { bus: &self.bus };
                    self.engine.tick(&mut notifier);
                }
            }
        }

        info!("Match service stopped");
    }

    fn broadcast(&self, snapshot: &Snapshot) {
        self.bus.publish(MatchEvent::StateUpdate {
            snapshot: snapshot.clone(),
        });
    }

    /// Execute one command. Events are published before the reply is sent,
    /// so a caller that awaited the reply finds them already on the bus.
    fn handle(&mut self, command: Command) {
        match command {
            Command::Snapshot { reply } => {
                let _ = reply.send(self.engine.snapshot());
            }
            Command::Configure { patch, reply } => {
                let snapshot = self.engine.configure(&patch);
                self.broadcast(&snapshot);
                let _ = reply.send(snapshot);
            }
            Command::RegisterSeat {
                connection,
                seat,
                reply,
            } => {
                let outcome = self.engine.register_seat(&connection, seat);
                self.bus.publish(MatchEvent::SeatRegistered {
                    connection,
                    seat,
                    accepted: outcome.is_applied(),
                });
                self.broadcast(&self.engine.snapshot());
                let _ = reply.send(outcome);
            }
            Command::DisconnectSeat { connection, reply } => {
                self.engine.disconnect_seat(&connection);
                let snapshot = self.engine.snapshot();
                self.broadcast(&snapshot);
                let _ = reply.send(snapshot);
            }
            Command::RemoveSeat { connection, reply } => {
                self.engine.remove_seat(&connection);
                let snapshot = self.engine.snapshot();
                self.broadcast(&snapshot);
                let _ = reply.send(snapshot);
            }
            Command::SubmitScore {
                connection,
                side,
                zone,
                reply,
            } => {
                let Some(seat) = self.engine.connected_seat(&connection) else {
                    debug!(connection = %connection, "Vote from unseated connection dropped");
                    let _ = reply.send(ScoreOutcome::Rejected(Rejection::NotSeated(connection)));
                    return;
                };
                let outcome = self.engine.submit_score(seat, side, zone);
                // votes are echoed even when pending so judges see feedback
                self.broadcast(&self.engine.snapshot());
                if let Some(award) = outcome.award() {
                    self.bus.publish(award.into());
                }
                let _ = reply.send(outcome);
            }
            Command::SubmitPenalty { side, reply } => {
                let snapshot = self.engine.submit_penalty(side);
                self.broadcast(&snapshot);
                let _ = reply.send(snapshot);
            }
            Command::StartTimer { reply } => {
                let snapshot = self.engine.start_timer();
                self.broadcast(&snapshot);
                let _ = reply.send(snapshot);
            }
            Command::PauseTimer { reply } => {
                let snapshot = self.engine.pause_timer();
                self.broadcast(&snapshot);
                let _ = reply.send(snapshot);
            }
            Command::NewMatch { reply } => {
                let snapshot = self.engine.new_match();
                self.broadcast(&snapshot);
                let _ = reply.send(snapshot);
            }
            Command::Reset { reply } => {
                let snapshot = self.engine.reset();
                self.broadcast(&snapshot);
                let _ = reply.send(snapshot);
            }
            Command::AdvanceFromRoundEnd { reply } => {
                let outcome = self.engine.advance_from_round_end();
                if let Outcome::Applied(snapshot) = &outcome {
                    self.broadcast(snapshot);
                }
                let _ = reply.send(outcome);
            }
            Command::Shutdown => {}
        }
    }
}
