//! Freshness policy: is a sample recent enough to serve as live data?

use chrono::{DateTime, Duration, Utc};
use netpulse_common::parse_timestamp;

/// Default maximum sample age for live queries
pub const DEFAULT_FRESHNESS_THRESHOLD_SECS: u64 = 3;

/// Pure, stateless freshness check against a fixed threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    threshold: Duration,
}

impl FreshnessPolicy {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn from_secs(secs: u64) -> Self {
        let threshold = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self::new(threshold)
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// True iff `now - timestamp <= threshold`.
    ///
    /// Future timestamps have a negative age and are therefore fresh.
    pub fn is_fresh(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(timestamp) <= self.threshold
    }

    /// Same check on a wire timestamp; anything unparseable is stale.
    pub fn is_fresh_str(&self, timestamp: &str, now: DateTime<Utc>) -> bool {
        parse_timestamp(timestamp).is_some_and(|ts| self.is_fresh(ts, now))
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::from_secs(DEFAULT_FRESHNESS_THRESHOLD_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let policy = FreshnessPolicy::default();
        let now = Utc::now();
        assert!(policy.is_fresh(now, now));
        assert!(policy.is_fresh(now - Duration::seconds(3), now));
        assert!(!policy.is_fresh(now - Duration::milliseconds(3001), now));
        assert!(!policy.is_fresh(now - Duration::seconds(10), now));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let policy = FreshnessPolicy::from_secs(3);
        let now = Utc::now();
        assert!(policy.is_fresh(now + Duration::seconds(60), now));
    }

    #[test]
    fn test_malformed_timestamp_fails_closed() {
        let policy = FreshnessPolicy::default();
        let now = Utc::now();
        assert!(!policy.is_fresh_str("not-a-time", now));
        assert!(!policy.is_fresh_str("2025-06-01T12:00:00", now));
        assert!(policy.is_fresh_str(&now.to_rfc3339(), now));
    }

    #[test]
    fn test_custom_threshold() {
        let policy = FreshnessPolicy::from_secs(30);
        let now = Utc::now();
        assert!(policy.is_fresh(now - Duration::seconds(10), now));
        assert_eq!(policy.threshold(), Duration::seconds(30));
    }
}
