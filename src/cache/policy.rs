//! Staleness policy shared by every cache consumer.
//!
//! The policy is constructed once from configuration and injected into the
//! `CacheStore`, so all reads of the same persisted keys make the same
//! freshness judgment. Two modes exist: TTL (entries expire after a fixed
//! age) and sticky (a present, schema-valid entry is fresh until it is
//! explicitly cleared).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalenessMode {
    Ttl,
    Sticky,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StalenessPolicy {
    mode: StalenessMode,
    ttl: Duration,
}

impl StalenessPolicy {
    pub fn ttl(ttl: Duration) -> Self {
        Self {
            mode: StalenessMode::Ttl,
            ttl,
        }
    }

    pub fn sticky() -> Self {
        Self {
            mode: StalenessMode::Sticky,
            // Unused in sticky mode; kept so the struct stays Copy
            ttl: Duration::zero(),
        }
    }

    pub fn mode(&self) -> StalenessMode {
        self.mode
    }

    /// Whether an entry fetched at `fetched_at` may be served without a
    /// network call. In TTL mode an entry is fresh exactly when its age is
    /// within `[0, ttl]`; a negative age means the device clock moved
    /// backwards since the write, and the entry is stale rather than
    /// trusted. Sticky mode serves any present entry.
    pub fn is_fresh(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.mode {
            StalenessMode::Sticky => true,
            StalenessMode::Ttl => {
                let age = now - fetched_at;
                age >= Duration::zero() && age <= self.ttl
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_fresh_within_window() {
        let policy = StalenessPolicy::ttl(Duration::milliseconds(5000));
        let now = Utc::now();

        assert!(policy.is_fresh(now, now));
        assert!(policy.is_fresh(now - Duration::milliseconds(5000), now));
        assert!(!policy.is_fresh(now - Duration::milliseconds(5001), now));
    }

    #[test]
    fn test_ttl_scenario_ten_seconds_old() {
        let policy = StalenessPolicy::ttl(Duration::milliseconds(5000));
        let now = Utc::now();
        assert!(!policy.is_fresh(now - Duration::milliseconds(10_000), now));
    }

    #[test]
    fn test_negative_age_is_stale_in_ttl_mode() {
        let policy = StalenessPolicy::ttl(Duration::minutes(5));
        let now = Utc::now();
        // Entry claims to come from the future: untrustworthy clock
        assert!(!policy.is_fresh(now + Duration::seconds(30), now));
    }

    #[test]
    fn test_sticky_never_expires() {
        let policy = StalenessPolicy::sticky();
        let now = Utc::now();
        assert!(policy.is_fresh(now - Duration::days(365), now));
        assert!(policy.is_fresh(now, now));
    }

    #[test]
    fn test_mode_roundtrips_through_config_json() {
        let mode: StalenessMode = serde_json::from_str("\"sticky\"").unwrap();
        assert_eq!(mode, StalenessMode::Sticky);
        assert_eq!(serde_json::to_string(&StalenessMode::Ttl).unwrap(), "\"ttl\"");
    }
}
