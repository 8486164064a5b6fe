//! Layered canvas state machine
//!
//! Three layers are composited for render: the persisted layer (strokes the
//! durable store has confirmed, plus peer broadcasts), the optimistic layer
//! (locally drawn strokes awaiting confirmation, keyed by temp id), and at
//! most one in-progress stroke. All transitions are pure and synchronous so
//! the machine is testable without rendering.
//!
//! Connection status never gates these transitions: drawing stays local-first
//! and divergence is corrected by a full resync from the durable store.

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::stroke::{NukeEvent, Stroke};

/// Duplicate nuke broadcasts within this window collapse into one overlay.
pub const NUKE_DEDUP_WINDOW_MS: i64 = 1_000;

/// Transient attribution overlay shown when a nuke lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NukeOverlay {
    /// Wallet of the nuker, if known
    pub actor: Option<String>,
    /// Selected clear animation
    pub animation: String,
    /// Logical timestamp of the nuke
    pub at_ms: i64,
}

/// The composited whiteboard state for one session view.
#[derive(Debug, Default)]
pub struct CanvasLayers {
    persisted: Vec<Stroke>,
    optimistic: Vec<Stroke>,
    in_progress: Option<Stroke>,
    last_nuke_ms: Option<i64>,
}

impl CanvasLayers {
    /// Create an empty canvas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the in-progress stroke (live preview while drawing).
    pub fn set_in_progress(&mut self, stroke: Option<Stroke>) {
        self.in_progress = stroke;
    }

    /// Commit a finished local stroke into the optimistic layer.
    ///
    /// Clears the in-progress stroke. Degenerate strokes are rejected and
    /// must not reach broadcast or persistence.
    pub fn commit_local(&mut self, stroke: Stroke) -> Result<Uuid> {
        self.in_progress = None;
        if !stroke.is_drawable() {
            return Err(Error::DegenerateStroke {
                points: stroke.points.len(),
            });
        }
        let temp_id = stroke.temp_id;
        self.optimistic.push(stroke);
        Ok(temp_id)
    }

    /// Move an optimistic stroke into the persisted layer once the durable
    /// store confirms it with a sequence id.
    pub fn confirm(&mut self, temp_id: Uuid, seq: i64) -> bool {
        if let Some(pos) = self.optimistic.iter().position(|s| s.temp_id == temp_id) {
            let stroke = self.optimistic.remove(pos);
            self.persisted.push(stroke.with_seq(seq));
            true
        } else {
            false
        }
    }

    /// Record that persistence of one's own stroke failed.
    ///
    /// The ink stays visible: erasing a user's work over a transient network
    /// error is worse than a harmless divergence corrected by the next
    /// resync. Returns whether the stroke is still on the canvas.
    pub fn persist_failed(&mut self, temp_id: Uuid) -> bool {
        let present = self.optimistic.iter().any(|s| s.temp_id == temp_id);
        debug!(%temp_id, present, "stroke persistence failed, keeping local ink");
        present
    }

    /// Composite a broadcast stroke from a peer straight into the persisted
    /// layer. No confirmation round-trip is expected client-side.
    pub fn merge_peer(&mut self, stroke: Stroke) {
        if stroke.is_drawable() {
            self.persisted.push(stroke);
        }
    }

    /// Replace the persisted layer with the authoritative stroke set from
    /// the durable store, dropping optimistic entries it already contains.
    pub fn resync(&mut self, strokes: Vec<Stroke>) {
        self.optimistic
            .retain(|s| !strokes.iter().any(|p| p.temp_id == s.temp_id));
        self.persisted = strokes;
    }

    /// Apply a nuke: clear all three layers unconditionally.
    ///
    /// Returns the attribution overlay to display, or `None` when the event
    /// duplicates one already applied within [`NUKE_DEDUP_WINDOW_MS`] (two
    /// tabs receiving the same broadcast must not double-animate).
    pub fn apply_nuke(&mut self, event: &NukeEvent) -> Option<NukeOverlay> {
        self.persisted.clear();
        self.optimistic.clear();
        self.in_progress = None;

        let duplicate = self
            .last_nuke_ms
            .is_some_and(|last| (event.at_ms - last).abs() < NUKE_DEDUP_WINDOW_MS);
        self.last_nuke_ms = Some(event.at_ms);
        if duplicate {
            return None;
        }
        Some(NukeOverlay {
            actor: event.actor.clone(),
            animation: event.animation.clone(),
            at_ms: event.at_ms,
        })
    }

    /// Strokes to render, persisted first, then optimistic, then the
    /// in-progress stroke.
    pub fn composite(&self) -> impl Iterator<Item = &Stroke> {
        self.persisted
            .iter()
            .chain(self.optimistic.iter())
            .chain(self.in_progress.iter())
    }

    /// Number of confirmed strokes.
    #[must_use]
    pub fn persisted_count(&self) -> usize {
        self.persisted.len()
    }

    /// Number of unconfirmed local strokes.
    #[must_use]
    pub fn optimistic_count(&self) -> usize {
        self.optimistic.len()
    }

    /// Whether a stroke is currently being drawn.
    #[must_use]
    pub fn has_in_progress(&self) -> bool {
        self.in_progress.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::Point;

    fn stroke(n: usize) -> Stroke {
        let points = (0..n).map(|i| Point::new(i as f32, 0.0)).collect();
        Stroke::new(points, "#fff", 2.0, Some("wallet1".into()))
    }

    #[test]
    fn test_commit_rejects_degenerate_stroke() {
        let mut layers = CanvasLayers::new();
        let err = layers.commit_local(stroke(1)).unwrap_err();
        assert!(matches!(err, Error::DegenerateStroke { points: 1 }));
        assert_eq!(layers.optimistic_count(), 0);
    }

    #[test]
    fn test_confirm_promotes_to_persisted() {
        let mut layers = CanvasLayers::new();
        let temp_id = layers.commit_local(stroke(5)).unwrap();
        assert_eq!(layers.optimistic_count(), 1);

        assert!(layers.confirm(temp_id, 7));
        assert_eq!(layers.optimistic_count(), 0);
        assert_eq!(layers.persisted_count(), 1);
        assert!(layers.composite().next().unwrap().is_persisted());
    }

    #[test]
    fn test_confirm_unknown_temp_id_is_noop() {
        let mut layers = CanvasLayers::new();
        assert!(!layers.confirm(Uuid::new_v4(), 1));
    }

    #[test]
    fn test_persist_failure_keeps_ink_visible() {
        let mut layers = CanvasLayers::new();
        let temp_id = layers.commit_local(stroke(4)).unwrap();

        assert!(layers.persist_failed(temp_id));
        assert_eq!(layers.optimistic_count(), 1);
        assert_eq!(layers.composite().count(), 1);
    }

    #[test]
    fn test_peer_stroke_goes_straight_to_persisted() {
        let mut layers = CanvasLayers::new();
        layers.merge_peer(stroke(3));
        assert_eq!(layers.persisted_count(), 1);

        // degenerate peer strokes are dropped
        layers.merge_peer(stroke(1));
        assert_eq!(layers.persisted_count(), 1);
    }

    #[test]
    fn test_nuke_clears_all_layers_unconditionally() {
        let mut layers = CanvasLayers::new();
        for _ in 0..10 {
            layers.merge_peer(stroke(3));
        }
        layers.commit_local(stroke(4)).unwrap();
        layers.set_in_progress(Some(stroke(2)));

        let overlay = layers.apply_nuke(&NukeEvent::new(Some("nuker".into()), "laser"));
        assert!(overlay.is_some());
        assert_eq!(layers.persisted_count(), 0);
        assert_eq!(layers.optimistic_count(), 0);
        assert!(!layers.has_in_progress());
        assert_eq!(layers.composite().count(), 0);
    }

    #[test]
    fn test_duplicate_nuke_within_window_yields_one_overlay() {
        let mut layers = CanvasLayers::new();
        let event = NukeEvent {
            actor: Some("nuker".into()),
            animation: "laser".into(),
            at_ms: 1_700_000_000_000,
        };
        let duplicate = NukeEvent {
            at_ms: event.at_ms + 400,
            ..event.clone()
        };

        assert!(layers.apply_nuke(&event).is_some());
        assert!(layers.apply_nuke(&duplicate).is_none());

        // a later, distinct nuke animates again
        let later = NukeEvent {
            at_ms: event.at_ms + 5_000,
            ..event
        };
        assert!(layers.apply_nuke(&later).is_some());
    }

    #[test]
    fn test_resync_replaces_persisted_and_dedupes_optimistic() {
        let mut layers = CanvasLayers::new();
        let temp_id = layers.commit_local(stroke(4)).unwrap();
        let confirmed = layers
            .composite()
            .find(|s| s.temp_id == temp_id)
            .cloned()
            .unwrap()
            .with_seq(1);

        layers.resync(vec![confirmed, stroke(3).with_seq(2)]);
        assert_eq!(layers.persisted_count(), 2);
        // the optimistic copy of the now-persisted stroke is gone
        assert_eq!(layers.optimistic_count(), 0);
    }
}
