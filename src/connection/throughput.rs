// Throughput window - decoded messages per second
//
// The manager records every decoded frame and drains the window on each
// throughput tick. Rate = count * 1000 / elapsed ms since the previous drain.

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct ThroughputWindow {
    count: u64,
    started: Instant,
}

impl ThroughputWindow {
    pub fn new(started: Instant) -> Self {
        Self { count: 0, started }
    }

    pub fn record(&mut self) {
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Rate over the window ending at `now`; starts a new window.
    pub fn take_rate(&mut self, now: Instant) -> f64 {
        let elapsed_ms = now.saturating_duration_since(self.started).as_millis();
        let rate = if elapsed_ms == 0 {
            0.0
        } else {
            self.count as f64 * 1000.0 / elapsed_ms as f64
        };
        self.count = 0;
        self.started = now;
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn six_frames_over_one_second() {
        let start = Instant::now();
        let mut window = ThroughputWindow::new(start);
        for _ in 0..6 {
            window.record();
        }
        let rate = window.take_rate(start + Duration::from_secs(1));
        assert!((rate - 6.0).abs() < 1e-9);
        assert_eq!(window.count(), 0);
    }

    #[test]
    fn longer_window_scales_rate() {
        let start = Instant::now();
        let mut window = ThroughputWindow::new(start);
        for _ in 0..3 {
            window.record();
        }
        let rate = window.take_rate(start + Duration::from_millis(1500));
        assert!((rate - 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_or_instant_window_is_zero() {
        let start = Instant::now();
        let mut window = ThroughputWindow::new(start);
        window.record();
        assert_eq!(window.take_rate(start), 0.0);
        assert_eq!(window.take_rate(start + Duration::from_secs(1)), 0.0);
    }
}
