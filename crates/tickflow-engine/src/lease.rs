//! The lease check behind the staleness policy
//!
//! Because the client alone drives progress, `updated_at` is the only
//! signal that the operator is still there: every successful transition
//! renews the lease. The check is a pure function of `(now, updated_at)`
//! evaluated on every read/write path; there is no background timer.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Whether a task's lease has run out
///
/// A clock that appears to run backwards (replicas with skewed time)
/// reads as zero elapsed, never as stale.
pub fn lease_expired(now: DateTime<Utc>, updated_at: DateTime<Utc>, timeout: Duration) -> bool {
    let elapsed = (now - updated_at).to_std().unwrap_or_default();
    elapsed > timeout
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const TIMEOUT: Duration = Duration::from_secs(150);

    #[test]
    fn test_fresh_lease_is_valid() {
        let now = Utc::now();
        assert!(!lease_expired(now, now, TIMEOUT));
        assert!(!lease_expired(now, now - ChronoDuration::seconds(10), TIMEOUT));
    }

    #[test]
    fn test_boundary_is_not_stale() {
        let now = Utc::now();
        assert!(!lease_expired(now, now - ChronoDuration::seconds(150), TIMEOUT));
        assert!(lease_expired(now, now - ChronoDuration::seconds(151), TIMEOUT));
    }

    #[test]
    fn test_future_update_is_not_stale() {
        let now = Utc::now();
        assert!(!lease_expired(now, now + ChronoDuration::seconds(30), TIMEOUT));
    }
}
