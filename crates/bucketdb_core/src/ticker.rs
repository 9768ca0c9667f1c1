//! Non-blocking interval timer polled from engine loops.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub(crate) struct Ticker {
    interval: Duration,
    /// `None` when the deadline is past what `Instant` can represent.
    next: Option<Instant>,
}

impl Ticker {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now().checked_add(interval),
        }
    }

    /// Returns true at most once per interval. A zero interval fires on
    /// every poll; an interval too large to schedule never fires.
    pub(crate) fn fired(&mut self) -> bool {
        let Some(next) = self.next else {
            return false;
        };
        let now = Instant::now();
        if now < next {
            return false;
        }
        self.next = now.checked_add(self.interval);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_always_fires() {
        let mut ticker = Ticker::new(Duration::ZERO);
        assert!(ticker.fired());
        assert!(ticker.fired());
    }

    #[test]
    fn long_interval_does_not_fire_early() {
        let mut ticker = Ticker::new(Duration::from_secs(3600));
        assert!(!ticker.fired());
    }

    #[test]
    fn unrepresentable_interval_never_fires() {
        let mut ticker = Ticker::new(Duration::MAX);
        assert!(!ticker.fired());

        let mut ticker = Ticker::new(Duration::from_secs(u64::MAX));
        assert!(!ticker.fired());
    }
}
