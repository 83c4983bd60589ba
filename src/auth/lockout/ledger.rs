//! Per-principal history of authentication outcomes.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

/// Outcome of an authentication attempt, or an explicit unlock marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Credentials were accepted.
    Success,
    /// Credentials were rejected.
    Failure,
    /// The lock was cleared. Ends a run of failures like a success does.
    Unlocked,
}

/// A single recorded attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptRecord {
    pub principal_id: String,
    pub at: SystemTime,
    pub outcome: AttemptOutcome,
}

/// Bounded, append-only attempt history keyed by principal id.
///
/// Entries older than the retention window are dropped when a new entry is
/// written for the same principal, and each principal keeps at most
/// `capacity` entries. A principal that was never recorded reads as empty.
pub struct AttemptLedger {
    entries: DashMap<String, VecDeque<AttemptRecord>>,
    retention: Duration,
    capacity: usize,
}

impl AttemptLedger {
    /// Create a ledger keeping `capacity` entries per principal for `retention`.
    #[must_use]
    pub fn new(retention: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            retention,
            capacity: capacity.max(1),
        }
    }

    /// Append an outcome for `principal_id`.
    pub fn record(&self, principal_id: &str, outcome: AttemptOutcome, at: SystemTime) {
        let cutoff = at.checked_sub(self.retention).unwrap_or(SystemTime::UNIX_EPOCH);
        let mut history = self.entries.entry(principal_id.to_string()).or_default();

        while history.front().is_some_and(|record| record.at < cutoff) {
            history.pop_front();
        }
        while history.len() >= self.capacity {
            history.pop_front();
        }

        history.push_back(AttemptRecord {
            principal_id: principal_id.to_string(),
            at,
            outcome,
        });
    }

    /// Count the trailing run of failures for `principal_id` recorded at or after `since`.
    ///
    /// The run ends at the most recent success or unlock marker.
    #[must_use]
    pub fn recent_failures(&self, principal_id: &str, since: SystemTime) -> u32 {
        let Some(history) = self.entries.get(principal_id) else {
            return 0;
        };

        let count = history
            .iter()
            .rev()
            .take_while(|record| record.at >= since && record.outcome == AttemptOutcome::Failure)
            .count();

        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Snapshot of the retained history, oldest first.
    #[must_use]
    pub fn history(&self, principal_id: &str) -> Vec<AttemptRecord> {
        self.entries
            .get(principal_id)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop histories whose newest entry is older than the retention window.
    ///
    /// Returns the number of principals removed.
    pub fn purge(&self, now: SystemTime) -> usize {
        let cutoff = now.checked_sub(self.retention).unwrap_or(SystemTime::UNIX_EPOCH);
        let before = self.entries.len();
        self.entries
            .retain(|_, history| history.back().is_some_and(|record| record.at >= cutoff));
        before.saturating_sub(self.entries.len())
    }

    /// Number of principals with retained history.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + n)
    }

    #[test]
    fn test_unknown_principal_is_empty() {
        let ledger = AttemptLedger::new(Duration::from_secs(60), 8);
        assert_eq!(ledger.recent_failures("nobody", secs(0)), 0);
        assert!(ledger.history("nobody").is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_counts_trailing_failures() {
        let ledger = AttemptLedger::new(Duration::from_secs(600), 16);
        ledger.record("user-1", AttemptOutcome::Failure, secs(1));
        ledger.record("user-1", AttemptOutcome::Success, secs(2));
        ledger.record("user-1", AttemptOutcome::Failure, secs(3));
        ledger.record("user-1", AttemptOutcome::Failure, secs(4));

        assert_eq!(ledger.recent_failures("user-1", secs(0)), 2);
    }

    #[test]
    fn test_unlock_marker_ends_run() {
        let ledger = AttemptLedger::new(Duration::from_secs(600), 16);
        for i in 0..5 {
            ledger.record("user-1", AttemptOutcome::Failure, secs(i));
        }
        ledger.record("user-1", AttemptOutcome::Unlocked, secs(6));
        assert_eq!(ledger.recent_failures("user-1", secs(0)), 0);

        ledger.record("user-1", AttemptOutcome::Failure, secs(7));
        assert_eq!(ledger.recent_failures("user-1", secs(0)), 1);
    }

    #[test]
    fn test_failures_before_since_are_ignored() {
        let ledger = AttemptLedger::new(Duration::from_secs(600), 16);
        ledger.record("user-1", AttemptOutcome::Failure, secs(1));
        ledger.record("user-1", AttemptOutcome::Failure, secs(2));
        ledger.record("user-1", AttemptOutcome::Failure, secs(100));

        assert_eq!(ledger.recent_failures("user-1", secs(50)), 1);
    }

    #[test]
    fn test_principals_are_independent() {
        let ledger = AttemptLedger::new(Duration::from_secs(600), 16);
        ledger.record("user-1", AttemptOutcome::Failure, secs(1));
        ledger.record("user-2", AttemptOutcome::Success, secs(1));

        assert_eq!(ledger.recent_failures("user-1", secs(0)), 1);
        assert_eq!(ledger.recent_failures("user-2", secs(0)), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let ledger = AttemptLedger::new(Duration::from_secs(600), 3);
        for i in 0..5 {
            ledger.record("user-1", AttemptOutcome::Failure, secs(i));
        }

        let history = ledger.history("user-1");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].at, secs(2));
        assert_eq!(history[2].at, secs(4));
    }

    #[test]
    fn test_retention_evicts_on_write() {
        let ledger = AttemptLedger::new(Duration::from_secs(10), 16);
        ledger.record("user-1", AttemptOutcome::Failure, secs(0));
        ledger.record("user-1", AttemptOutcome::Failure, secs(5));
        ledger.record("user-1", AttemptOutcome::Failure, secs(30));

        let history = ledger.history("user-1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].at, secs(30));
    }

    #[test]
    fn test_purge_drops_stale_principals() {
        let ledger = AttemptLedger::new(Duration::from_secs(10), 16);
        ledger.record("stale", AttemptOutcome::Failure, secs(0));
        ledger.record("fresh", AttemptOutcome::Failure, secs(25));

        assert_eq!(ledger.purge(secs(30)), 1);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.history("stale").is_empty());
    }
}
