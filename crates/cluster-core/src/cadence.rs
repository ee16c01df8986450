//! Level-triggered transmission cadence.

use std::time::{Duration, Instant};

/// Fires when at least `interval` has passed since it last fired.
///
/// The first poll always fires. A late poll fires once and restarts the
/// interval from that poll; missed periods are not replayed.
#[derive(Clone, Debug)]
pub struct Cadence {
    interval: Duration,
    last_fired: Option<Instant>,
    fired_count: u64,
}

impl Cadence {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
            fired_count: 0,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Returns true if the cycle is due at `now`, and marks it fired.
    pub fn poll(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_fired {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_fired = Some(now);
        self.fired_count += 1;
        true
    }

    /// Whether the cycle would fire at `now`, without marking it.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_fired
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of times the cadence has fired.
    pub fn fired_count(&self) -> u64 {
        self.fired_count
    }

    /// Forget the last firing so the next poll fires.
    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_first_then_every_interval() {
        let t0 = Instant::now();
        let mut cadence = Cadence::from_millis(100);
        let fired: Vec<u64> = (0..=1000)
            .filter(|ms| cadence.poll(t0 + Duration::from_millis(*ms)))
            .collect();
        assert_eq!(
            fired,
            vec![0, 100, 200, 300, 400, 500, 600, 700, 800, 900, 1000]
        );
        assert_eq!(cadence.fired_count(), 11);
    }

    #[test]
    fn late_poll_fires_once_and_rebases() {
        let t0 = Instant::now();
        let mut cadence = Cadence::from_millis(50);
        assert!(cadence.poll(t0));
        assert!(cadence.poll(t0 + Duration::from_millis(175)));
        assert!(!cadence.poll(t0 + Duration::from_millis(200)));
        assert!(cadence.poll(t0 + Duration::from_millis(225)));
    }

    #[test]
    fn is_due_does_not_consume() {
        let t0 = Instant::now();
        let mut cadence = Cadence::from_millis(10);
        assert!(cadence.is_due(t0));
        assert!(cadence.poll(t0));
        assert!(!cadence.is_due(t0 + Duration::from_millis(9)));
        assert!(cadence.is_due(t0 + Duration::from_millis(10)));
        cadence.reset();
        assert!(cadence.poll(t0 + Duration::from_millis(1)));
    }
}
