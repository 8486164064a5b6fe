//! Stroke and nuke event types
//!
//! A stroke is one continuous pointer-down-to-pointer-up line. It is created
//! client-side on pointer-up, broadcast immediately, persisted
//! asynchronously, and immutable once persisted. A nuke invalidates every
//! stroke on the canvas; it is a full reset, not a delta.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum points for a stroke to be drawable. Anything shorter is
/// degenerate and is neither broadcast nor persisted.
pub const MIN_STROKE_POINTS: usize = 2;

/// A single canvas coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One continuous line with color/width metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stroke {
    /// Server-assigned sequence id, present once persisted
    pub seq: Option<i64>,

    /// Client-side temporary id keying the optimistic layer
    pub temp_id: Uuid,

    /// Ordered points of the line
    pub points: Vec<Point>,

    /// CSS color string
    pub color: String,

    /// Line width in canvas units
    pub width: f32,

    /// Wallet of the drawer; `None` for anonymous viewers
    pub drawer: Option<String>,

    /// When the stroke was captured client-side
    pub created_at: DateTime<Utc>,
}

impl Stroke {
    /// Create a new unpersisted stroke.
    #[must_use]
    pub fn new(
        points: Vec<Point>,
        color: impl Into<String>,
        width: f32,
        drawer: Option<String>,
    ) -> Self {
        Self {
            seq: None,
            temp_id: Uuid::new_v4(),
            points,
            color: color.into(),
            width,
            drawer,
            created_at: Utc::now(),
        }
    }

    /// Attach the server-assigned sequence id.
    #[must_use]
    pub fn with_seq(mut self, seq: i64) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Whether the stroke has enough points to be broadcast or persisted.
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.points.len() >= MIN_STROKE_POINTS
    }

    /// Whether the durable store has confirmed this stroke.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.seq.is_some()
    }
}

/// Full-canvas-clear event broadcast to all session participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NukeEvent {
    /// Wallet of the actor; `None` for anonymous
    pub actor: Option<String>,

    /// Which clear animation the actor picked
    pub animation: String,

    /// Logical timestamp (unix millis) used for display de-duplication
    pub at_ms: i64,
}

impl NukeEvent {
    /// Create a nuke event stamped with the current time.
    #[must_use]
    pub fn new(actor: Option<String>, animation: impl Into<String>) -> Self {
        Self {
            actor,
            animation: animation.into(),
            at_ms: Utc::now().timestamp_millis(),
        }
    }
}
