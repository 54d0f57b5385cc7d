//! Sampling-period estimation for output ports.

/// Fixed-window estimator of the interval between publishes.
///
/// Keeps the last `window` inter-arrival deltas in a ring. The average is
/// always taken over the full window, so it reads low until the ring has
/// been filled once: three publishes 1000 ms apart in a 10-slot window
/// report 200 ms, not 1000 ms.
#[derive(Debug, Clone)]
pub struct OutputTelemetry {
    deltas: Vec<i64>,
    count: u64,
    last_publish_millis: Option<i64>,
}

impl OutputTelemetry {
    pub fn new(window: usize) -> Self {
        Self {
            deltas: vec![0; window.max(1)],
            count: 0,
            last_publish_millis: None,
        }
    }

    /// Account for a publish at `now_millis`.
    ///
    /// The first publish only sets the reference time.
    pub fn record_publish(&mut self, now_millis: i64) {
        if let Some(last) = self.last_publish_millis {
            let index = (self.count % self.deltas.len() as u64) as usize;
            self.deltas[index] = now_millis - last;
            self.count += 1;
        }
        self.last_publish_millis = Some(now_millis);
    }

    /// Average interval in milliseconds: `sum(deltas) / window`.
    pub fn average_period(&self) -> f64 {
        let sum: i64 = self.deltas.iter().sum();
        sum as f64 / self.deltas.len() as f64
    }

    /// Number of deltas recorded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn window(&self) -> usize {
        self.deltas.len()
    }

    pub fn last_publish_millis(&self) -> Option<i64> {
        self.last_publish_millis
    }
}

impl Default for OutputTelemetry {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TELEMETRY_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_bias_before_window_fills() {
        let mut telemetry = OutputTelemetry::new(10);
        telemetry.record_publish(1_000);
        telemetry.record_publish(2_000);
        telemetry.record_publish(3_000);
        assert_eq!(telemetry.count(), 2);
        assert_eq!(telemetry.average_period(), 200.0);
    }

    #[test]
    fn test_full_window_average() {
        let mut telemetry = OutputTelemetry::new(4);
        for i in 0..5 {
            telemetry.record_publish(i * 250);
        }
        assert_eq!(telemetry.average_period(), 250.0);
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let mut telemetry = OutputTelemetry::new(2);
        telemetry.record_publish(0);
        telemetry.record_publish(1_000); // 1000
        telemetry.record_publish(1_100); // 100
        telemetry.record_publish(1_200); // 100, replaces 1000
        assert_eq!(telemetry.average_period(), 100.0);
    }

    #[test]
    fn test_no_publish() {
        let telemetry = OutputTelemetry::default();
        assert_eq!(telemetry.window(), 10);
        assert_eq!(telemetry.average_period(), 0.0);
        assert_eq!(telemetry.last_publish_millis(), None);
    }
}
