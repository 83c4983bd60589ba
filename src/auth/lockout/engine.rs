//! Lockout decisions and per-principal lock state.
//!
//! This module emits tracing events for security monitoring:
//! - `auth.lockout.blocked` - Attempt rejected because the account is locked
//! - `auth.lockout.account_locked` - Failure threshold reached
//! - `auth.lockout.cleared` - Lock and failure count reset
//! - `auth.lockout.expired` - Timed lock lapsed

use super::ledger::{AttemptLedger, AttemptOutcome, AttemptRecord};
use super::policy::{LockedUntil, LockoutPolicy, lock_expired};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

/// Reason reported for every attempt rejected by an active lock.
pub const LOCKED_REASON: &str = "Login policy rejected authentication";

/// Authoritative lock state of one principal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockState {
    /// Consecutive failures within the lookback window.
    pub failed_attempts: u32,
    /// When the current lock was taken.
    pub locked_at: Option<SystemTime>,
    /// When the current lock ends. `None` when not locked.
    pub locked_until: Option<LockedUntil>,
}

impl LockState {
    /// Whether the lock is in force at `now`.
    #[must_use]
    pub fn is_locked_at(&self, now: SystemTime) -> bool {
        self.locked_until
            .is_some_and(|until| !lock_expired(until, now))
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Answer to "may this principal attempt to authenticate?".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockDecision {
    Allowed,
    Denied {
        reason: &'static str,
        locked_until: LockedUntil,
    },
}

impl LockDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Result of recording an attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptResult {
    /// Lock state after the attempt.
    pub state: LockState,
    /// Whether this attempt took the lock.
    pub just_locked: bool,
    /// Whether the attempt was ignored because the account was locked.
    pub ignored: bool,
}

/// Keyed lockout engine.
///
/// Every principal has its own async mutex; work for one principal never
/// waits on another. Callers that need a check-then-record sequence take the
/// principal's [`PrincipalGuard`] with [`lock_principal`](Self::lock_principal)
/// and run the whole sequence through it.
///
/// # Example
///
/// ```rust,ignore
/// use lockward::auth::lockout::{AttemptOutcome, LockoutEngine, LockoutPolicy};
///
/// let engine = LockoutEngine::new(LockoutPolicy::new());
///
/// let mut guard = engine.lock_principal("user-123").await;
/// if guard.check_allowed(SystemTime::now()).is_allowed() {
///     let ok = verify_credentials().await?;
///     let outcome = if ok { AttemptOutcome::Success } else { AttemptOutcome::Failure };
///     guard.on_attempt(outcome, SystemTime::now());
/// }
/// ```
pub struct LockoutEngine {
    states: DashMap<String, Arc<Mutex<LockState>>>,
    ledger: AttemptLedger,
    policy: LockoutPolicy,
}

impl LockoutEngine {
    /// Create an engine enforcing `policy`.
    #[must_use]
    pub fn new(policy: LockoutPolicy) -> Self {
        let capacity = policy.history_capacity.max(policy.max_attempts as usize);
        Self {
            states: DashMap::new(),
            ledger: AttemptLedger::new(policy.lookback_window, capacity),
            policy,
        }
    }

    /// Create an engine with the default policy.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LockoutPolicy::default())
    }

    /// Enter the critical section for `principal_id`.
    ///
    /// The guard serializes all lockout work for that principal until dropped.
    pub async fn lock_principal(&self, principal_id: &str) -> PrincipalGuard<'_> {
        // Clone the slot out so the map shard is not held across the await.
        let slot = self
            .states
            .entry(principal_id.to_string())
            .or_default()
            .value()
            .clone();

        PrincipalGuard {
            engine: self,
            principal_id: principal_id.to_string(),
            state: slot.lock_owned().await,
        }
    }

    /// Whether `principal_id` may attempt to authenticate now.
    pub async fn check_allowed(&self, principal_id: &str) -> LockDecision {
        self.lock_principal(principal_id)
            .await
            .check_allowed(SystemTime::now())
    }

    /// Record the outcome of an authentication attempt.
    pub async fn on_attempt(&self, principal_id: &str, outcome: AttemptOutcome) -> AttemptResult {
        self.lock_principal(principal_id)
            .await
            .on_attempt(outcome, SystemTime::now())
    }

    /// Unlock `principal_id` and reset its failure count.
    ///
    /// Idempotent. Returns whether a lock was in force.
    pub async fn clear_lock(&self, principal_id: &str) -> bool {
        self.lock_principal(principal_id)
            .await
            .clear_lock(SystemTime::now())
    }

    /// Snapshot of the lock state for `principal_id`.
    pub async fn status(&self, principal_id: &str) -> LockState {
        self.lock_principal(principal_id).await.state().clone()
    }

    /// Release every timed lock that has lapsed by `now`.
    ///
    /// Also purges stale ledger history and forgets idle principals. Returns
    /// the number of locks released.
    pub async fn sweep_expired(&self, now: SystemTime) -> usize {
        let mut released = 0;

        if self.policy.lockout_duration.is_some() {
            let locked: Vec<String> = self
                .states
                .iter()
                .filter(|entry| {
                    entry
                        .value()
                        .try_lock()
                        .map(|state| state.locked_until.is_some())
                        .unwrap_or(true)
                })
                .map(|entry| entry.key().clone())
                .collect();

            for principal_id in locked {
                let mut guard = self.lock_principal(&principal_id).await;
                if guard.release_expired(now) {
                    released += 1;
                }
            }
        }

        self.ledger.purge(now);
        self.compact();
        released
    }

    /// Drop state slots that are idle, unlocked and have no failures.
    fn compact(&self) {
        self.states.retain(|_, slot| {
            // A slot referenced outside the map may have a guard pending.
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(state) => state.failed_attempts > 0 || state.locked_until.is_some(),
                Err(_) => true,
            }
        });
    }

    /// Spawn a background task calling [`sweep_expired`](Self::sweep_expired) every `interval`.
    ///
    /// Returns `None` when the policy has no timed expiry.
    pub fn spawn_expiry_sweep(self: &Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        self.policy.lockout_duration?;

        let engine = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let released = engine.sweep_expired(SystemTime::now()).await;
                if released > 0 {
                    tracing::info!(
                        target: "auth.lockout.sweep",
                        released = released,
                        "Expired account locks released"
                    );
                }
            }
        }))
    }

    /// Number of principals with a state slot.
    #[must_use]
    pub fn tracked_principals(&self) -> usize {
        self.states.len()
    }

    /// Attempt history retained for `principal_id`, oldest first.
    #[must_use]
    pub fn history(&self, principal_id: &str) -> Vec<AttemptRecord> {
        self.ledger.history(principal_id)
    }

    /// Get the current policy.
    #[must_use]
    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }
}

impl Default for LockoutEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Exclusive access to one principal's lockout state.
///
/// All methods are synchronous: once the guard is held, nothing in a
/// check/record/clear step yields, so a dropped request future can never
/// leave half of a step applied.
pub struct PrincipalGuard<'a> {
    engine: &'a LockoutEngine,
    principal_id: String,
    state: OwnedMutexGuard<LockState>,
}

impl PrincipalGuard<'_> {
    /// Principal this guard belongs to.
    #[must_use]
    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &LockState {
        &self.state
    }

    /// Evaluate the lock at `now` without changing anything.
    #[must_use]
    pub fn check_allowed(&self, now: SystemTime) -> LockDecision {
        match self.state.locked_until {
            Some(until) if !lock_expired(until, now) => {
                tracing::debug!(
                    target: "auth.lockout.blocked",
                    principal_id = %self.principal_id,
                    failed_attempts = self.state.failed_attempts,
                    "Authentication attempt blocked by lockout"
                );
                LockDecision::Denied {
                    reason: LOCKED_REASON,
                    locked_until: until,
                }
            }
            _ => LockDecision::Allowed,
        }
    }

    /// Record the outcome of an attempt made at `now`.
    ///
    /// Attempts made while the lock is in force are ignored: they were never
    /// checked against the credential and do not count as failures.
    pub fn on_attempt(&mut self, outcome: AttemptOutcome, now: SystemTime) -> AttemptResult {
        if self.state.is_locked_at(now) {
            return AttemptResult {
                state: self.state.clone(),
                just_locked: false,
                ignored: true,
            };
        }
        self.release_expired(now);

        let engine = self.engine;
        let policy = &engine.policy;
        let ledger = &engine.ledger;
        let mut just_locked = false;

        match outcome {
            AttemptOutcome::Success => {
                ledger.record(&self.principal_id, AttemptOutcome::Success, now);
                self.state.failed_attempts = 0;
            }
            AttemptOutcome::Failure => {
                ledger.record(&self.principal_id, AttemptOutcome::Failure, now);
                let failures = ledger.recent_failures(&self.principal_id, policy.window_start(now));
                self.state.failed_attempts = failures;

                if policy.should_lock(failures) {
                    let until = policy.lock_until(now);
                    self.state.locked_at = Some(now);
                    self.state.locked_until = Some(until);
                    just_locked = true;

                    tracing::warn!(
                        target: "auth.lockout.account_locked",
                        principal_id = %self.principal_id,
                        attempts = failures,
                        indefinite = matches!(until, LockedUntil::Indefinite),
                        "Account locked due to failed attempts"
                    );
                }
            }
            AttemptOutcome::Unlocked => {
                self.clear_lock(now);
            }
        }

        AttemptResult {
            state: self.state.clone(),
            just_locked,
            ignored: false,
        }
    }

    /// Unlock and reset the failure count. Returns whether a lock was in force.
    pub fn clear_lock(&mut self, now: SystemTime) -> bool {
        let had_lock = self.state.is_locked_at(now);
        let had_state = self.state.failed_attempts > 0 || self.state.locked_until.is_some();

        if had_state {
            self.engine
                .ledger
                .record(&self.principal_id, AttemptOutcome::Unlocked, now);
        }
        self.state.reset();

        tracing::info!(
            target: "auth.lockout.cleared",
            principal_id = %self.principal_id,
            had_lock = had_lock,
            "Lockout state cleared"
        );

        had_lock
    }

    /// Release the lock if it is timed and has lapsed by `now`.
    fn release_expired(&mut self, now: SystemTime) -> bool {
        match self.state.locked_until {
            Some(until) if lock_expired(until, now) => {
                self.engine
                    .ledger
                    .record(&self.principal_id, AttemptOutcome::Unlocked, now);
                self.state.reset();

                tracing::info!(
                    target: "auth.lockout.expired",
                    principal_id = %self.principal_id,
                    "Account lock expired"
                );
                true
            }
            _ => false,
        }
    }
}

impl Drop for PrincipalGuard<'_> {
    /// Forget the slot when it holds nothing worth keeping.
    ///
    /// The map holds one reference and this guard another; any further
    /// reference belongs to a caller waiting on the mutex, which keeps the
    /// slot alive. `remove_if` runs under the shard lock, so no new waiter
    /// can clone the slot while it is checked.
    fn drop(&mut self) {
        if *self.state != LockState::default() {
            return;
        }
        self.engine
            .states
            .remove_if(&self.principal_id, |_, slot| Arc::strong_count(slot) == 2);
    }
}
