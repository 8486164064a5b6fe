//! In-progress stroke capture
//!
//! The recorder drives the single in-progress stroke: it enforces the hard
//! per-stroke time cap (past the deadline the stroke is force-committed with
//! whatever points were captured, never discarded) and batches points for
//! periodic network sends, flushing the pending tail on draw end so the end
//! of a stroke is never lost.
//!
//! Time is injected (`Instant` arguments) so the cap is testable without
//! sleeping.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::stroke::{Point, Stroke};

/// Hard ceiling on a single stroke's duration.
pub const MAX_STROKE_DURATION: Duration = Duration::from_secs(5);

/// Result of appending a point to the in-progress stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Point captured
    Accepted,
    /// The time cap has passed; the caller must end the stroke now. The
    /// point is not captured.
    Expired,
}

struct Active {
    started_at: Instant,
    points: Vec<Point>,
    batch_cursor: usize,
}

/// Captures the in-progress stroke for one drawer.
pub struct StrokeRecorder {
    color: String,
    width: f32,
    drawer: Option<String>,
    max_duration: Duration,
    active: Option<Active>,
}

impl StrokeRecorder {
    /// Create a recorder with the given pen settings.
    #[must_use]
    pub fn new(color: impl Into<String>, width: f32, drawer: Option<String>) -> Self {
        Self {
            color: color.into(),
            width,
            drawer,
            max_duration: MAX_STROKE_DURATION,
            active: None,
        }
    }

    /// Override the time cap (tests, alternate tiers).
    #[must_use]
    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.max_duration = max;
        self
    }

    /// Start a stroke at the given point. An unfinished previous stroke is
    /// discarded; pointer-down always starts fresh.
    pub fn begin(&mut self, point: Point, now: Instant) {
        self.active = Some(Active {
            started_at: now,
            points: vec![point],
            batch_cursor: 0,
        });
    }

    /// Append a point to the in-progress stroke.
    ///
    /// Returns [`AppendOutcome::Expired`] once the cap has passed; the
    /// caller must then call [`end`](Self::end) to force-commit what was
    /// captured.
    pub fn append(&mut self, point: Point, now: Instant) -> Result<AppendOutcome> {
        let active = self.active.as_mut().ok_or(Error::NoStrokeInProgress)?;
        if now.duration_since(active.started_at) >= self.max_duration {
            return Ok(AppendOutcome::Expired);
        }
        active.points.push(point);
        Ok(AppendOutcome::Accepted)
    }

    /// Whether the in-progress stroke has exceeded the cap.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| now.duration_since(a.started_at) >= self.max_duration)
    }

    /// Points captured since the last drain, for periodic live sends.
    pub fn drain_batch(&mut self) -> Vec<Point> {
        match self.active.as_mut() {
            Some(active) => {
                let batch = active.points[active.batch_cursor..].to_vec();
                active.batch_cursor = active.points.len();
                batch
            }
            None => Vec::new(),
        }
    }

    /// Finish the stroke, flushing any pending batch tail into it.
    ///
    /// Degenerate strokes (fewer than two points) are rejected; the caller
    /// abandons the action without broadcast, persistence, or charge.
    pub fn end(&mut self) -> Result<Stroke> {
        let active = self.active.take().ok_or(Error::NoStrokeInProgress)?;
        let stroke = Stroke::new(
            active.points,
            self.color.clone(),
            self.width,
            self.drawer.clone(),
        );
        if !stroke.is_drawable() {
            return Err(Error::DegenerateStroke {
                points: stroke.points.len(),
            });
        }
        Ok(stroke)
    }

    /// Clone of the in-progress stroke for live preview rendering.
    #[must_use]
    pub fn preview(&self) -> Option<Stroke> {
        self.active.as_ref().map(|a| {
            Stroke::new(
                a.points.clone(),
                self.color.clone(),
                self.width,
                self.drawer.clone(),
            )
        })
    }

    /// Whether a stroke is currently being captured.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> StrokeRecorder {
        StrokeRecorder::new("#fff", 2.0, Some("wallet1".into()))
    }

    #[test]
    fn test_points_accumulate_in_order() {
        let mut rec = recorder();
        let t0 = Instant::now();
        rec.begin(Point::new(0.0, 0.0), t0);
        for i in 1..5 {
            let outcome = rec
                .append(Point::new(i as f32, 0.0), t0 + Duration::from_millis(i))
                .unwrap();
            assert_eq!(outcome, AppendOutcome::Accepted);
        }
        let stroke = rec.end().unwrap();
        assert_eq!(stroke.points.len(), 5);
        assert!((stroke.points[3].x - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_stroke_past_cap_is_force_committed_not_discarded() {
        let mut rec = recorder();
        let t0 = Instant::now();
        rec.begin(Point::new(0.0, 0.0), t0);
        for i in 1..10 {
            rec.append(Point::new(i as f32, 0.0), t0 + Duration::from_millis(i * 100))
                .unwrap();
        }

        // 6 seconds in: the cap has passed
        let late = t0 + Duration::from_secs(6);
        assert!(rec.is_expired(late));
        assert_eq!(
            rec.append(Point::new(99.0, 99.0), late).unwrap(),
            AppendOutcome::Expired
        );

        // whatever was captured up to the deadline is committed as-is
        let stroke = rec.end().unwrap();
        assert_eq!(stroke.points.len(), 10);
        assert!(stroke.points.iter().all(|p| p.x < 99.0));
    }

    #[test]
    fn test_end_flushes_pending_batch_tail() {
        let mut rec = recorder();
        let t0 = Instant::now();
        rec.begin(Point::new(0.0, 0.0), t0);
        for i in 1..4 {
            rec.append(Point::new(i as f32, 0.0), t0 + Duration::from_millis(i))
                .unwrap();
        }

        let first = rec.drain_batch();
        assert_eq!(first.len(), 4);

        // tail drawn after the last periodic drain
        rec.append(Point::new(4.0, 0.0), t0 + Duration::from_millis(5))
            .unwrap();
        rec.append(Point::new(5.0, 0.0), t0 + Duration::from_millis(6))
            .unwrap();

        // the finished stroke contains the tail even though it was never drained
        let stroke = rec.end().unwrap();
        assert_eq!(stroke.points.len(), 6);
    }

    #[test]
    fn test_degenerate_end_is_rejected() {
        let mut rec = recorder();
        rec.begin(Point::new(0.0, 0.0), Instant::now());
        let err = rec.end().unwrap_err();
        assert!(matches!(err, Error::DegenerateStroke { points: 1 }));
        assert!(!rec.is_active());
    }

    #[test]
    fn test_append_without_begin_fails() {
        let mut rec = recorder();
        let err = rec.append(Point::new(0.0, 0.0), Instant::now()).unwrap_err();
        assert!(matches!(err, Error::NoStrokeInProgress));
    }

    #[test]
    fn test_drain_batch_is_incremental() {
        let mut rec = recorder();
        let t0 = Instant::now();
        rec.begin(Point::new(0.0, 0.0), t0);
        rec.append(Point::new(1.0, 0.0), t0 + Duration::from_millis(1))
            .unwrap();
        assert_eq!(rec.drain_batch().len(), 2);
        assert!(rec.drain_batch().is_empty());

        rec.append(Point::new(2.0, 0.0), t0 + Duration::from_millis(2))
            .unwrap();
        assert_eq!(rec.drain_batch().len(), 1);
    }
}
