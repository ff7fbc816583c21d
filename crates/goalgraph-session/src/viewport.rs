use goalgraph_graph::Vec2;
use std::time::{Duration, Instant};

/// Coalesces resize notifications so layout only ever sees settled
/// dimensions — not every pixel of a drag-resize.
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    settled: Vec2,
    pending: Option<(Vec2, Instant)>,
    debounce: Duration,
}

impl ViewportTracker {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

    pub fn new(initial: Vec2) -> Self {
        Self {
            settled: initial,
            pending: None,
            debounce: Self::DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Record a resize notification. The new size only applies once it has
    /// settled (no further resize for the debounce window) or on `flush`.
    pub fn resize(&mut self, width: f32, height: f32) {
        let size = Vec2::new(width, height);
        if size == self.settled && self.pending.is_none() {
            return;
        }
        self.pending = Some((size, Instant::now()));
    }

    /// Apply a pending size if its debounce window has elapsed. Returns
    /// true when the settled dimensions changed.
    pub fn poll(&mut self) -> bool {
        match self.pending {
            Some((size, at)) if at.elapsed() >= self.debounce => {
                self.pending = None;
                if size == self.settled {
                    false
                } else {
                    self.settled = size;
                    true
                }
            }
            _ => false,
        }
    }

    /// Apply any pending size immediately.
    pub fn flush(&mut self) -> bool {
        match self.pending.take() {
            Some((size, _)) if size != self.settled => {
                self.settled = size;
                true
            }
            _ => false,
        }
    }

    pub fn settled(&self) -> Vec2 {
        self.settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_does_not_apply_until_settled() {
        let mut tracker = ViewportTracker::new(Vec2::new(800.0, 600.0));
        tracker.resize(1024.0, 768.0);

        assert!(!tracker.poll());
        assert_eq!(tracker.settled(), Vec2::new(800.0, 600.0));

        assert!(tracker.flush());
        assert_eq!(tracker.settled(), Vec2::new(1024.0, 768.0));
    }

    #[test]
    fn zero_debounce_applies_on_poll() {
        let mut tracker =
            ViewportTracker::new(Vec2::new(800.0, 600.0)).with_debounce(Duration::ZERO);

        // A burst of drag-resize notifications coalesces to the last one.
        tracker.resize(810.0, 600.0);
        tracker.resize(900.0, 640.0);
        tracker.resize(1024.0, 768.0);

        assert!(tracker.poll());
        assert_eq!(tracker.settled(), Vec2::new(1024.0, 768.0));
        assert!(!tracker.poll());
    }

    #[test]
    fn resizing_back_to_settled_is_a_no_op() {
        let mut tracker =
            ViewportTracker::new(Vec2::new(800.0, 600.0)).with_debounce(Duration::ZERO);

        tracker.resize(800.0, 600.0);
        assert!(!tracker.poll());
        assert!(!tracker.flush());

        tracker.resize(900.0, 600.0);
        tracker.resize(800.0, 600.0);
        assert!(!tracker.poll(), "net-zero resize must not invalidate layout");
    }
}
