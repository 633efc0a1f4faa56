//! Instantaneous frame rate from successive arrival times

use std::time::Instant;

/// Frames-per-second estimate recomputed on every sample.
///
/// The first interval starts when the estimator is built, so the first
/// reported value includes any capture startup latency.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    last: Instant,
    frames: u32,
    current: f64,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RateEstimator {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            last: start,
            frames: 0,
            current: 0.0,
        }
    }

    /// Record one frame arrival now and return the updated rate
    pub fn sample(&mut self) -> f64 {
        self.sample_at(Instant::now())
    }

    /// Record one frame arrival at `now`.
    ///
    /// A zero (or backwards) delta leaves the previous rate in place and
    /// carries the frame over into the next interval.
    pub fn sample_at(&mut self, now: Instant) -> f64 {
        self.frames += 1;

        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        if elapsed > 0.0 {
            let rate = f64::from(self.frames) / elapsed;
            if rate.is_finite() {
                self.current = rate;
                self.frames = 0;
                self.last = now;
            }
        }

        self.current
    }

    /// Rate computed at the last boundary
    pub fn current(&self) -> f64 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= b.abs() * 1e-9
    }

    #[test]
    fn test_constant_interval() {
        let start = Instant::now();
        let mut estimator = RateEstimator::starting_at(start);

        for i in 1..=10u32 {
            let rate = estimator.sample_at(start + Duration::from_millis(40) * i);
            assert!(approx(rate, 25.0), "sample {} gave {}", i, rate);
        }
    }

    #[test]
    fn test_starts_at_zero() {
        assert_eq!(RateEstimator::new().current(), 0.0);
    }

    #[test]
    fn test_zero_elapsed_keeps_previous_rate() {
        let start = Instant::now();
        let mut estimator = RateEstimator::starting_at(start);

        let t1 = start + Duration::from_millis(100);
        assert!(approx(estimator.sample_at(t1), 10.0));
        assert!(approx(estimator.sample_at(t1), 10.0));

        // two frames across the next 100ms
        let t2 = t1 + Duration::from_millis(100);
        assert!(approx(estimator.sample_at(t2), 20.0));
    }

    #[test]
    fn test_zero_elapsed_on_first_sample() {
        let start = Instant::now();
        let mut estimator = RateEstimator::starting_at(start);
        let rate = estimator.sample_at(start);
        assert!(rate.is_finite());
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn test_backwards_clock_is_ignored() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut estimator = RateEstimator::starting_at(start);
        let rate = estimator.sample_at(start - Duration::from_millis(500));
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn test_rate_is_one_interval_stale() {
        let start = Instant::now();
        let mut estimator = RateEstimator::starting_at(start);

        estimator.sample_at(start + Duration::from_millis(50));
        assert!(approx(estimator.current(), 20.0));

        estimator.sample_at(start + Duration::from_millis(150));
        assert!(approx(estimator.current(), 10.0));
    }

    proptest! {
        #[test]
        fn prop_converges_to_inverse_interval(delta_us in 1u64..2_000_000, n in 1usize..64) {
            let start = Instant::now();
            let delta = Duration::from_micros(delta_us);
            let mut estimator = RateEstimator::starting_at(start);
            let expected = 1.0 / delta.as_secs_f64();

            let mut now = start;
            for _ in 0..n {
                now += delta;
                let rate = estimator.sample_at(now);
                prop_assert!(rate.is_finite());
                prop_assert!((rate - expected).abs() <= expected * 1e-6);
            }
        }

        #[test]
        fn prop_never_non_finite(steps in proptest::collection::vec(0u64..5_000, 1..64)) {
            let start = Instant::now();
            let mut estimator = RateEstimator::starting_at(start);

            let mut now = start;
            for step in steps {
                now += Duration::from_nanos(step);
                prop_assert!(estimator.sample_at(now).is_finite());
            }
        }
    }
}
