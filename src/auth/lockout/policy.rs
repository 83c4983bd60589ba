//! Lockout policy configuration and pure evaluation helpers.

use std::time::{Duration, SystemTime};

/// Default consecutive failures before an account is locked.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default window in which consecutive failures are counted (1 hour).
pub const DEFAULT_LOOKBACK_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Default number of attempt records kept per principal.
pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

/// Lockout policy configuration.
///
/// By default a lock never expires on its own: it stays in place until
/// [`LockoutEngine::clear_lock`](super::LockoutEngine::clear_lock) is called,
/// which happens after an authorized password change. Set
/// [`lockout_duration`](Self::lockout_duration) to opt into timed expiry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures that lock the account.
    pub max_attempts: u32,
    /// Failures older than this do not count toward the threshold.
    pub lookback_window: Duration,
    /// How long a lock lasts. `None` locks until explicitly cleared.
    pub lockout_duration: Option<Duration>,
    /// Maximum attempt records retained per principal.
    pub history_capacity: usize,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lookback_window: DEFAULT_LOOKBACK_WINDOW,
            lockout_duration: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl LockoutPolicy {
    /// Create a new policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a strict policy (3 attempts counted over 24 hours, no expiry).
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_attempts: 3,
            lookback_window: Duration::from_secs(24 * 60 * 60),
            lockout_duration: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Create a lenient policy (10 attempts, locks expire after 5 minutes).
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            max_attempts: 10,
            lookback_window: Duration::from_secs(15 * 60),
            lockout_duration: Some(Duration::from_secs(5 * 60)),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Set the consecutive failures that lock the account.
    ///
    /// Values below 1 are treated as 1.
    #[must_use]
    pub fn max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    /// Set the window in which failures are counted.
    #[must_use]
    pub fn lookback_window(mut self, window: Duration) -> Self {
        self.lookback_window = window;
        self
    }

    /// Enable timed expiry of locks.
    #[must_use]
    pub fn lockout_duration(mut self, duration: Duration) -> Self {
        self.lockout_duration = Some(duration);
        self
    }

    /// Locks stay in place until cleared explicitly.
    #[must_use]
    pub fn indefinite(mut self) -> Self {
        self.lockout_duration = None;
        self
    }

    /// Set the number of attempt records kept per principal.
    #[must_use]
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(self.max_attempts as usize);
        self
    }

    /// Earliest timestamp a failure may carry and still count at `now`.
    #[must_use]
    pub fn window_start(&self, now: SystemTime) -> SystemTime {
        now.checked_sub(self.lookback_window)
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    /// Whether `failures` consecutive failures should lock the account.
    #[must_use]
    pub fn should_lock(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }

    /// Lock deadline for a lock taken at `now`.
    ///
    /// A duration that runs past the end of representable time locks
    /// indefinitely.
    #[must_use]
    pub fn lock_until(&self, now: SystemTime) -> LockedUntil {
        self.lockout_duration
            .and_then(|duration| now.checked_add(duration))
            .map_or(LockedUntil::Indefinite, LockedUntil::At)
    }
}

/// When a lock ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockedUntil {
    /// Held until explicitly cleared.
    Indefinite,
    /// Expires at the given instant.
    At(SystemTime),
}

/// Whether a lock ending at `until` has lapsed by `now`.
#[must_use]
pub fn lock_expired(until: LockedUntil, now: SystemTime) -> bool {
    match until {
        LockedUntil::Indefinite => false,
        LockedUntil::At(at) => now >= at,
    }
}
