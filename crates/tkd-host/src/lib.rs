//! Scoring host
//!
//! Runs one match service and bridges it to a line-oriented JSON transport,
//! so judge phones, the control panel and scoreboards can sit behind any
//! process that speaks JSON lines.

pub mod config;
pub mod transport;

pub use config::{ConfigError, HostConfig};
pub use transport::{dispatch, serve, Inbound, InboundMessage, TimerAction, TransportError};
