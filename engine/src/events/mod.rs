//! Events broadcast to presentation clients
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ MatchService │────▶│  Event Bus   │────▶│  Transports  │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, SharedEventBus};
pub use types::MatchEvent;
