//! Board event protocol
//!
//! Two event kinds travel over the broadcast channel: stroke batches and
//! nukes. Events are a low-latency optimization layer over the durable
//! store, never the source of truth.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use inkstream_canvas::{NukeEvent, Stroke};

/// An event broadcast to all participants of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardEvent {
    /// One or more finished strokes from a single drawer
    DrawBatch {
        /// Strokes in draw order
        strokes: Vec<Stroke>,
    },

    /// Full-canvas clear
    Nuke {
        /// The nuke event with attribution and de-dup timestamp
        event: NukeEvent,
    },
}

impl BoardEvent {
    /// Build a draw batch, dropping degenerate strokes.
    ///
    /// Returns `None` when nothing drawable remains; degenerate strokes are
    /// never broadcast.
    #[must_use]
    pub fn draw_batch(strokes: Vec<Stroke>) -> Option<Self> {
        let strokes: Vec<Stroke> = strokes.into_iter().filter(Stroke::is_drawable).collect();
        if strokes.is_empty() {
            None
        } else {
            Some(Self::DrawBatch { strokes })
        }
    }

    /// Build a nuke event.
    #[must_use]
    pub fn nuke(event: NukeEvent) -> Self {
        Self::Nuke { event }
    }

    /// Event kind for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DrawBatch { .. } => "draw_batch",
            Self::Nuke { .. } => "nuke",
        }
    }
}

/// Frames sent from a client to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Publish a board event to the session topic
    Event {
        /// The event to fan out
        event: BoardEvent,
    },

    /// Keep-alive probe
    Ping,
}

/// Frames sent from the relay to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Subscription acknowledged
    Joined {
        /// Session the connection is attached to
        session_id: Uuid,
    },

    /// A board event from another participant
    Event {
        /// The broadcast event
        event: BoardEvent,
    },

    /// Keep-alive response
    Pong,

    /// Relay-level error
    Error {
        /// Machine-readable code
        code: String,
        /// Human-readable message
        message: String,
    },
}

impl ServerFrame {
    /// Create an error frame.
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}
