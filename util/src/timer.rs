//! Restartable recurring timer.
//!
//! The timer owns no thread and no callback, the event loop polls it with the
//! current instant and runs its own handler whenever [`Timer::poll`] returns
//! `true`. This keeps every timer on the thread that owns the state it acts
//! on.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Recurring steady timer.
#[derive(Debug, Clone)]
pub struct Timer {
    interval: Duration,
    next: Option<Instant>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Timer {
    /// Create a stopped timer with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    /// Start the timer so that it fires on the first poll, and every
    /// `interval` after that.
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now);
    }

    /// Start the timer so that it first fires one interval from `now`.
    ///
    /// Restarting a running timer resets its phase.
    pub fn start_after(&mut self, now: Instant) {
        self.next = Some(now + self.interval);
    }

    /// Stop the timer, it will not fire again until restarted.
    pub fn stop(&mut self) {
        self.next = None;
    }

    /// True if the timer is armed.
    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// Interval between firings.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if the timer is due at `now`, re-arming it if so.
    ///
    /// Missed intervals are not replayed, a late poll fires once and the next
    /// expiry is scheduled one interval after `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if next <= now => {
                let mut following = next + self.interval;
                if following <= now {
                    following = now + self.interval;
                }
                self.next = Some(following);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const IVL: Duration = Duration::from_millis(100);

    #[test]
    fn test_start_fires_immediately() {
        let t0 = Instant::now();
        let mut t = Timer::new(IVL);
        assert!(!t.poll(t0));

        t.start(t0);
        assert!(t.poll(t0));
        assert!(!t.poll(t0 + Duration::from_millis(50)));
        assert!(t.poll(t0 + IVL));
        assert!(t.poll(t0 + 2 * IVL));
    }

    #[test]
    fn test_start_after_and_stop() {
        let t0 = Instant::now();
        let mut t = Timer::new(IVL);

        t.start_after(t0);
        assert!(!t.poll(t0));
        assert!(t.poll(t0 + IVL));

        t.stop();
        assert!(!t.is_running());
        assert!(!t.poll(t0 + 10 * IVL));
    }

    #[test]
    fn test_late_poll_does_not_burst() {
        let t0 = Instant::now();
        let mut t = Timer::new(IVL);
        t.start_after(t0);

        assert!(t.poll(t0 + 5 * IVL));
        assert!(!t.poll(t0 + 5 * IVL + Duration::from_millis(10)));
        assert!(t.poll(t0 + 6 * IVL));
    }
}
