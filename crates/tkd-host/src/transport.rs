//! JSON-lines transport
//!
//! Each inbound line names the connection it came from, an event and its
//! data. Every event the match service broadcasts goes out as one JSON line.
//!
//! ```text
//! {"connection":"phone-1","event":"judge:register","data":{"judgeId":1}}
//! {"connection":"phone-1","event":"judge:score","data":{"color":"red","zone":"head"}}
//! {"connection":"admin","event":"admin:timer","data":{"action":"start"}}
//! ```

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, info, warn};

use tkd_engine::{
    ConfigPatch, ConnectionId, MatchEvent, MatchHandle, Rejection, SeatNumber, ServiceError,
    SharedEventBus, Side, Zone,
};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid judge id: {0}")]
    InvalidSeat(String),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Output failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerAction {
    Start,
    Pause,
}

/// A decoded inbound command
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    JudgeRegister { seat: SeatNumber },
    JudgeScore { side: Side, zone: Zone },
    JudgeRemove,
    Timer(TimerAction),
    Configure(ConfigPatch),
    Penalty(Side),
    NewMatch,
    NextRound,
    Reset,
    StateGet,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub connection: ConnectionId,
    pub inbound: Inbound,
}

#[derive(Deserialize)]
struct Envelope {
    connection: ConnectionId,
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Judge phones send the seat as a number or a numeric string
#[derive(Deserialize)]
#[serde(untagged)]
enum SeatArg {
    Number(SeatNumber),
    Text(String),
}

impl SeatArg {
    fn resolve(self) -> Result<SeatNumber, TransportError> {
        match self {
            SeatArg::Number(n) => Ok(n),
            SeatArg::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| TransportError::InvalidSeat(s)),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterData {
    judge_id: SeatArg,
}

#[derive(Deserialize)]
struct ScoreData {
    color: String,
    zone: String,
}

#[derive(Deserialize)]
struct ColorData {
    color: String,
}

#[derive(Deserialize)]
struct TimerData {
    action: TimerAction,
}

impl InboundMessage {
    pub fn parse(line: &str) -> Result<Self, TransportError> {
        let Envelope {
            connection,
            event,
            data,
        } = serde_json::from_str(line)?;

        let inbound = match event.as_str() {
            "judge:register" => {
                let data: RegisterData = serde_json::from_value(data)?;
                Inbound::JudgeRegister {
                    seat: data.judge_id.resolve()?,
                }
            }
            "judge:score" => {
                let data: ScoreData = serde_json::from_value(data)?;
                Inbound::JudgeScore {
                    side: data.color.parse()?,
                    zone: data.zone.parse()?,
                }
            }
            "judge:remove" => Inbound::JudgeRemove,
            "admin:timer" => {
                let data: TimerData = serde_json::from_value(data)?;
                Inbound::Timer(data.action)
            }
            "admin:config" => Inbound::Configure(serde_json::from_value(data)?),
            "admin:penalty" => {
                let data: ColorData = serde_json::from_value(data)?;
                Inbound::Penalty(data.color.parse()?)
            }
            "admin:newMatch" => Inbound::NewMatch,
            "admin:nextRound" => Inbound::NextRound,
            "admin:reset" => Inbound::Reset,
            "state:get" => Inbound::StateGet,
            "disconnect" => Inbound::Disconnect,
            _ => return Err(TransportError::UnknownEvent(event)),
        };

        Ok(Self {
            connection,
            inbound,
        })
    }
}

/// Forward one command to the match service.
///
/// Returns an event meant only for the requesting connection, if any. Events
/// for everyone arrive on the bus.
pub async fn dispatch(
    handle: &MatchHandle,
    message: InboundMessage,
) -> Result<Option<MatchEvent>, TransportError> {
    let InboundMessage {
        connection,
        inbound,
    } = message;

    match inbound {
        Inbound::JudgeRegister { seat } => {
            let outcome = handle.register_seat(connection.clone(), seat).await?;
            if outcome.is_applied() {
                info!(connection = %connection, seat, "Judge registered");
            }
        }
        Inbound::JudgeScore { side, zone } => {
            let outcome = handle.submit_score(connection.clone(), side, zone).await?;
            debug!(connection = %connection, %side, %zone, awarded = outcome.is_awarded(), "Vote forwarded");
        }
        Inbound::JudgeRemove => {
            handle.remove_seat(connection).await?;
        }
        Inbound::Timer(TimerAction::Start) => {
            handle.start_timer().await?;
        }
        Inbound::Timer(TimerAction::Pause) => {
            handle.pause_timer().await?;
        }
        Inbound::Configure(patch) => {
            handle.configure(patch).await?;
        }
        Inbound::Penalty(side) => {
            handle.submit_penalty(side).await?;
        }
        Inbound::NewMatch => {
            handle.new_match().await?;
        }
        Inbound::NextRound => {
            if let Some(rejection) = handle.advance_from_round_end().await?.rejection() {
                debug!(%rejection, "Next round ignored");
            }
        }
        Inbound::Reset => {
            handle.reset().await?;
        }
        Inbound::StateGet => {
            let snapshot = handle.snapshot().await?;
            return Ok(Some(MatchEvent::StateUpdate { snapshot }));
        }
        Inbound::Disconnect => {
            handle.disconnect_seat(connection.clone()).await?;
            info!(connection = %connection, "Connection closed");
        }
    }
    Ok(None)
}

/// Serve commands from `reader` and write events to `writer` until the
/// input ends.
pub async fn serve<R, W>(
    reader: R,
    writer: &mut W,
    handle: &MatchHandle,
    bus: &SharedEventBus,
) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut events = bus.subscribe();
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let reply = match InboundMessage::parse(&line) {
                    Ok(message) => match dispatch(handle, message).await {
                        Ok(reply) => reply,
                        Err(TransportError::Service(e)) => return Err(e.into()),
                        Err(e) => {
                            warn!(error = %e, "Command dropped");
                            None
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "Dropping inbound line");
                        None
                    }
                };
                // broadcasts caused by the command go out before the reply
                drain(&mut events, writer).await?;
                if let Some(reply) = reply {
                    write_event(writer, &reply).await?;
                }
            }
            event = events.recv() => match event {
                Ok(event) => write_event(writer, &event).await?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Output fell behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    drain(&mut events, writer).await?;
    info!("Input closed");
    Ok(())
}

async fn drain<W>(
    events: &mut broadcast::Receiver<MatchEvent>,
    writer: &mut W,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match events.try_recv() {
            Ok(event) => write_event(writer, &event).await?,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Output fell behind, events dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
        }
    }
}

async fn write_event<W>(writer: &mut W, event: &MatchEvent) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
