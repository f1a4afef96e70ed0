//! Adaptive TTL Module
//!
//! Derives an entry lifetime from its key's access pattern: twice the mean of the
//! most recent intervals, clamped to [`MIN_TTL`, `MAX_TTL`].

use crate::cache::{AccessPattern, MAX_TTL, MIN_TTL};

/// Number of most recent intervals averaged.
const RECENT_INTERVALS: usize = 20;

// == Adaptive TTL Calculator ==
#[derive(Debug, Clone)]
pub struct AdaptiveTtlCalculator {
    default_ttl: u64,
    /// Minimum regularity before intervals are trusted
    regularity_threshold: f64,
}

impl AdaptiveTtlCalculator {
    pub fn new(default_ttl: u64, regularity_threshold: f64) -> Self {
        Self {
            default_ttl: default_ttl.clamp(MIN_TTL, MAX_TTL),
            regularity_threshold,
        }
    }

    /// Computes the TTL for a key with the given access history.
    ///
    /// Falls back to the default TTL when the key has no intervals yet or when its
    /// intervals are too erratic (regularity below the threshold) to predict the
    /// next access.
    pub fn compute(&self, pattern: Option<&AccessPattern>) -> u64 {
        let Some(pattern) = pattern else {
            return self.default_ttl;
        };
        if pattern.regularity() < self.regularity_threshold {
            return self.default_ttl;
        }
        match pattern.recent_mean_interval(RECENT_INTERVALS) {
            Some(mean) if mean.is_finite() => {
                let ttl = (2.0 * mean).round().clamp(MIN_TTL as f64, MAX_TTL as f64);
                ttl as u64
            }
            _ => self.default_ttl,
        }
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AccessPatternTracker;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    fn tracker_with_gaps(gaps: &[i64]) -> AccessPatternTracker {
        let mut tracker = AccessPatternTracker::new();
        let mut now = t0();
        tracker.record_access("k", now);
        for gap in gaps {
            now += Duration::seconds(*gap);
            tracker.record_access("k", now);
        }
        tracker
    }

    #[test]
    fn test_no_history_uses_default() {
        let calc = AdaptiveTtlCalculator::new(3600, 0.3);
        assert_eq!(calc.compute(None), 3600);

        let tracker = tracker_with_gaps(&[]);
        assert_eq!(calc.compute(tracker.get("k")), 3600);
    }

    #[test]
    fn test_regular_intervals_double_mean() {
        let calc = AdaptiveTtlCalculator::new(3600, 0.3);
        let tracker = tracker_with_gaps(&[60; 49]);

        assert_eq!(calc.compute(tracker.get("k")), 120);
    }

    #[test]
    fn test_uses_only_recent_intervals() {
        let calc = AdaptiveTtlCalculator::new(3600, 0.0);
        let mut gaps = vec![5000; 10];
        gaps.extend(vec![300; 20]);
        let tracker = tracker_with_gaps(&gaps);

        assert_eq!(calc.compute(tracker.get("k")), 600);
    }

    #[test]
    fn test_clamped_to_bounds() {
        let calc = AdaptiveTtlCalculator::new(3600, 0.0);

        let fast = tracker_with_gaps(&[1; 10]);
        assert_eq!(calc.compute(fast.get("k")), MIN_TTL);

        let slow = tracker_with_gaps(&[100_000; 10]);
        assert_eq!(calc.compute(slow.get("k")), MAX_TTL);
    }

    #[test]
    fn test_irregular_pattern_falls_back() {
        let calc = AdaptiveTtlCalculator::new(1800, 0.9);
        let tracker = tracker_with_gaps(&[1, 100, 2, 300, 1, 50]);

        assert_eq!(calc.compute(tracker.get("k")), 1800);
    }

    #[test]
    fn test_default_clamped() {
        let calc = AdaptiveTtlCalculator::new(5, 0.3);
        assert_eq!(calc.default_ttl(), MIN_TTL);
    }
}
