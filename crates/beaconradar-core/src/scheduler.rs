//! Redraw cadence, independent of input arrival.
//!
//! The consumer loop calls [`RedrawScheduler::due`] after every input line and
//! on every idle tick; at most one redraw happens per interval.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    interval: Duration,
    last_redraw: Option<Duration>,
}

impl RedrawScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_redraw: None,
        }
    }

    /// True (and the redraw time recorded) if a redraw should run at `now`.
    /// The first call is always due.
    pub fn due(&mut self, now: Duration) -> bool {
        let due = match self.last_redraw {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval,
        };
        if due {
            self.last_redraw = Some(now);
        }
        due
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn last_redraw(&self) -> Option<Duration> {
        self.last_redraw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_check_is_due() {
        let mut s = RedrawScheduler::new(Duration::from_millis(200));
        assert!(s.due(Duration::from_secs(5)));
        assert_eq!(s.last_redraw(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn respects_interval() {
        let mut s = RedrawScheduler::new(Duration::from_millis(200));
        let t0 = Duration::from_secs(10);
        assert!(s.due(t0));
        assert!(!s.due(t0 + Duration::from_millis(100)));
        assert!(!s.due(t0 + Duration::from_millis(199)));
        assert!(s.due(t0 + Duration::from_millis(200)));
        assert!(!s.due(t0 + Duration::from_millis(300)));
        assert!(s.due(t0 + Duration::from_millis(450)));
    }

    #[test]
    fn interval_can_change() {
        let mut s = RedrawScheduler::new(Duration::from_secs(1));
        assert!(s.due(Duration::ZERO));
        s.set_interval(Duration::from_millis(100));
        assert!(s.due(Duration::from_millis(100)));
        assert_eq!(s.interval(), Duration::from_millis(100));
    }
}
