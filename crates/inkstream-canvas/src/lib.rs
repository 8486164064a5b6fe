//! Inkstream Canvas - Whiteboard State
//!
//! This crate provides the whiteboard data model and client-side state for
//! Inkstream:
//! - Stroke: one pointer-down-to-pointer-up line with color/width metadata
//! - Nuke: the full-canvas-clear event with attribution de-duplication
//! - Layers: the persisted/optimistic/in-progress canvas state machine
//! - Recorder: in-progress stroke capture with the hard time cap and
//!   batched point flushing
//! - Session: whiteboard sessions and the join-code registry
//!
//! The state machine is pure: all transitions are synchronous methods on
//! [`CanvasLayers`], testable without any rendering or network.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod layers;
pub mod recorder;
pub mod session;
pub mod stroke;

pub use error::{Error, Result};
pub use layers::{CanvasLayers, NukeOverlay};
pub use recorder::{AppendOutcome, StrokeRecorder};
pub use session::{validate_join_code, Session, SessionManager};
pub use stroke::{NukeEvent, Point, Stroke, MIN_STROKE_POINTS};
