//! Size-capped storage of classified points for display.
//!
//! The buffer is a side channel: the statistics never read from it. Points of a cycle are first
//! collected into [`StagedPoints`], which already refuses anything beyond the buffer's remaining
//! room, and are then committed in one step. A cycle that fails or is abandoned before commit
//! leaves the buffer untouched.
//!
//! Sequences are shared with callers through `Arc`. Appending clones a sequence only when a
//! caller still holds an older [`PointsSnapshot`].

use std::sync::Arc;

use super::monte_carlo_integration::IntegrationState;
use super::sampler::Point;

/// Read-only view of the buffered points at some moment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointsSnapshot {
    pub inside: Arc<Vec<Point>>,
    pub outside: Arc<Vec<Point>>,
}

/// Points of one cycle waiting to be committed.
#[derive(Debug, Default)]
pub struct StagedPoints {
    inside: Vec<Point>,
    outside: Vec<Point>,
    inside_room: usize,
    outside_room: usize,
}

impl StagedPoints {
    /// Staging area that accepts nothing, used for cycles the buffer does not record.
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: Point, is_inside: bool) {
        if is_inside {
            if self.inside.len() < self.inside_room {
                self.inside.push(point);
            }
        } else if self.outside.len() < self.outside_room {
            self.outside.push(point);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inside.is_empty() && self.outside.is_empty()
    }
}

/// Inside and outside point sequences, each capped at `cap` entries.
#[derive(Debug, Clone)]
pub struct PointBuffer {
    cap: usize,
    inside: Arc<Vec<Point>>,
    outside: Arc<Vec<Point>>,
}

impl PointBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            inside: Arc::default(),
            outside: Arc::default(),
        }
    }

    /// Whether the next cycle's points are recorded.
    ///
    /// Points are recorded on the first cycle after construction or reset, and on any cycle that
    /// starts with fewer than `dense_threshold` accumulated samples. Past that the buffer is
    /// frozen while the statistics keep updating.
    pub fn accepts_cycle(state: &IntegrationState, dense_threshold: u64) -> bool {
        state.is_first_cycle || state.total_guesses < dense_threshold
    }

    /// Opens a staging area sized to the room left in each sequence.
    pub fn stage(&self) -> StagedPoints {
        StagedPoints {
            inside: Vec::new(),
            outside: Vec::new(),
            inside_room: self.cap.saturating_sub(self.inside.len()),
            outside_room: self.cap.saturating_sub(self.outside.len()),
        }
    }

    /// Appends staged points, dropping anything past the cap.
    pub fn commit(&mut self, staged: StagedPoints) {
        Self::append_capped(&mut self.inside, staged.inside, self.cap);
        Self::append_capped(&mut self.outside, staged.outside, self.cap);
    }

    fn append_capped(target: &mut Arc<Vec<Point>>, mut points: Vec<Point>, cap: usize) {
        let room = cap.saturating_sub(target.len());
        points.truncate(room);
        if !points.is_empty() {
            Arc::make_mut(target).extend(points);
        }
    }

    pub fn snapshot(&self) -> PointsSnapshot {
        PointsSnapshot {
            inside: Arc::clone(&self.inside),
            outside: Arc::clone(&self.outside),
        }
    }

    pub fn clear(&mut self) {
        self.inside = Arc::default();
        self.outside = Arc::default();
    }

    pub fn inside(&self) -> &[Point] {
        &self.inside
    }

    pub fn outside(&self) -> &[Point] {
        &self.outside
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_n(buffer: &PointBuffer, inside: usize, outside: usize) -> StagedPoints {
        let mut staged = buffer.stage();
        for i in 0..inside {
            staged.push(Point::new(i as f64, 0.0), true);
        }
        for i in 0..outside {
            staged.push(Point::new(i as f64, 1.0), false);
        }
        staged
    }

    #[test]
    fn test_commit_appends_in_order() {
        let mut buffer = PointBuffer::new(10);
        buffer.commit(stage_n(&buffer, 3, 2));
        buffer.commit(stage_n(&buffer, 2, 1));
        assert_eq!(buffer.inside().len(), 5);
        assert_eq!(buffer.outside().len(), 3);
        assert_eq!(buffer.inside()[3], Point::new(0.0, 0.0));
    }

    #[test]
    fn test_cap_drops_tail() {
        let mut buffer = PointBuffer::new(4);
        assert_eq!(buffer.cap(), 4);
        buffer.commit(stage_n(&buffer, 3, 0));
        buffer.commit(stage_n(&buffer, 5, 9));
        assert_eq!(buffer.inside().len(), 4);
        assert_eq!(buffer.outside().len(), 4);
        // the first point of the second batch fits, the rest is dropped
        assert_eq!(buffer.inside()[3], Point::new(0.0, 0.0));
        assert_eq!(buffer.outside()[3], Point::new(3.0, 1.0));
    }

    #[test]
    fn test_closed_staging_records_nothing() {
        let mut staged = StagedPoints::closed();
        staged.push(Point::new(0.1, 0.1), true);
        staged.push(Point::new(0.1, 0.9), false);
        assert!(staged.is_empty());
    }

    #[test]
    fn test_accepts_cycle_policy() {
        let mut state = IntegrationState::default();
        assert!(PointBuffer::accepts_cycle(&state, 100));

        state.total_guesses = 1_000;
        assert!(PointBuffer::accepts_cycle(&state, 100));

        state.is_first_cycle = false;
        assert!(!PointBuffer::accepts_cycle(&state, 100));
        assert!(!PointBuffer::accepts_cycle(&state, 1_000));
        assert!(PointBuffer::accepts_cycle(&state, 1_001));
    }

    #[test]
    fn test_snapshot_is_copy_on_write() {
        let mut buffer = PointBuffer::new(10);
        buffer.commit(stage_n(&buffer, 2, 0));
        let before = buffer.snapshot();
        buffer.commit(stage_n(&buffer, 1, 0));
        assert_eq!(before.inside.len(), 2);
        assert_eq!(buffer.inside().len(), 3);

        buffer.clear();
        assert!(buffer.inside().is_empty());
        assert_eq!(before.inside.len(), 2);
    }
}
