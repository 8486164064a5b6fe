//! Inkstream Realtime - Broadcast & Reconnection
//!
//! This crate provides the realtime event distribution layer for Inkstream:
//! - Events: the `draw-batch`/`nuke` wire protocol and relay frames
//! - Transport: the per-session pub/sub abstraction plus an in-process
//!   `tokio::broadcast` implementation
//! - Relay: the axum WebSocket endpoint hosting per-session topics
//! - Supervisor: connection-status state machine with capped exponential
//!   backoff, silent-failure health checks, and online/offline handling
//!
//! Broadcast is best-effort and at-most-once: nothing survives a reconnect
//! boundary. The durable store is the source of truth; after any disruption
//! the supervisor emits a resync notification and the session view must
//! re-fetch authoritative state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod relay;
pub mod supervisor;
pub mod transport;

pub use error::{Error, Result};
pub use events::{BoardEvent, ClientFrame, ServerFrame};
pub use relay::{board_ws_handler, relay_router, RelayState};
pub use supervisor::{ConnectionStatus, ReconnectSupervisor, SupervisorHandle};
pub use transport::{BroadcastHub, BroadcastTransport, Subscription, Transport, TransportState};
