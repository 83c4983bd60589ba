//! Account lockout.
//!
//! Tracks authentication outcomes per principal and locks an account after a
//! run of consecutive failures.
//!
//! # Features
//!
//! - Configurable failure threshold and lookback window
//! - Indefinite locks by default, optional timed expiry with a background sweep
//! - Per-principal critical sections for check-then-record sequences
//! - Bounded attempt history
//!
//! # Example
//!
//! ```rust,ignore
//! use lockward::auth::lockout::{AttemptOutcome, LockoutEngine, LockoutPolicy};
//!
//! let engine = LockoutEngine::new(LockoutPolicy::new().max_attempts(5));
//!
//! let result = engine.on_attempt("user-123", AttemptOutcome::Failure).await;
//! if result.just_locked {
//!     println!("Account locked after {} failures", result.state.failed_attempts);
//! }
//!
//! // Later, after an authorized password change
//! engine.clear_lock("user-123").await;
//! ```

mod engine;
mod ledger;
mod policy;

pub use engine::{AttemptResult, LOCKED_REASON, LockDecision, LockState, LockoutEngine, PrincipalGuard};
pub use ledger::{AttemptLedger, AttemptOutcome, AttemptRecord};
pub use policy::{
    DEFAULT_HISTORY_CAPACITY, DEFAULT_LOOKBACK_WINDOW, DEFAULT_MAX_ATTEMPTS, LockedUntil,
    LockoutPolicy, lock_expired,
};
