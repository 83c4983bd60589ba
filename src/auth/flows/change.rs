//! Password change authorization and application.
//!
//! This module emits tracing events for security monitoring:
//! - `auth.password.change_failed` - Password change rejected (missing or wrong old password, wrong target)
//! - `auth.password.changed` - Password changed and lockout state cleared

use crate::auth::caller::{CallerContext, Privilege};
use crate::auth::lockout::LockoutEngine;
use crate::auth::storage::IdentityStore;
use crate::error::{LockwardError, Result};
use std::sync::Arc;
use std::time::SystemTime;

use super::types::PasswordChangeRequest;

/// Decides whether a caller may change a principal's password.
///
/// Administrative and client-credential callers are trusted and never asked
/// for the old password. Self-service callers may only change their own
/// password and must prove the old one.
#[derive(Clone)]
pub struct PasswordChangeAuthorizer {
    store: Arc<dyn IdentityStore>,
}

impl PasswordChangeAuthorizer {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Authorize `req` against `target` for `caller`.
    ///
    /// # Errors
    ///
    /// - `BadRequest` if the new password is empty, or a self-service caller
    ///   omits `oldPassword` (checked before any credential lookup)
    /// - `Forbidden` if a self-service caller targets another principal
    /// - `Unauthorized` if the old password does not match
    /// - `NotFound` if a self-service target does not exist
    pub async fn authorize(
        &self,
        target: &str,
        req: &PasswordChangeRequest,
        caller: &CallerContext,
    ) -> Result<()> {
        self.precheck(target, req, caller)?;

        match (caller.privilege, req.old_password.as_deref()) {
            (Privilege::SelfService, Some(old_password)) => {
                if !self.store.verify_password(target, old_password).await? {
                    return Err(reject(
                        target,
                        caller,
                        "wrong_password",
                        LockwardError::unauthorized("Old password is incorrect"),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// The checks that need no credential lookup.
    ///
    /// Everything [`authorize`](Self::authorize) rejects except a wrong old
    /// password is rejected here.
    pub fn precheck(
        &self,
        target: &str,
        req: &PasswordChangeRequest,
        caller: &CallerContext,
    ) -> Result<()> {
        if req.password.is_empty() {
            return Err(reject(
                target,
                caller,
                "empty_password",
                LockwardError::bad_request("password must not be empty"),
            ));
        }

        match caller.privilege {
            Privilege::Administrative | Privilege::ClientCredential => Ok(()),
            Privilege::SelfService => {
                if !caller.is_principal(target) {
                    return Err(reject(
                        target,
                        caller,
                        "wrong_target",
                        LockwardError::forbidden("Not permitted to change another user's password"),
                    ));
                }

                if req.old_password.is_none() {
                    return Err(reject(
                        target,
                        caller,
                        "old_password_missing",
                        LockwardError::bad_request("old password required"),
                    ));
                }

                Ok(())
            }
        }
    }
}

fn reject(
    target: &str,
    caller: &CallerContext,
    reason: &'static str,
    err: LockwardError,
) -> LockwardError {
    tracing::warn!(
        target: "auth.password.change_failed",
        principal_id = %target,
        caller = %caller.subject,
        privilege = ?caller.privilege,
        reason = reason,
        "Password change rejected"
    );
    err
}

/// Applies authorized password changes and clears the account lock.
///
/// Authorization, the credential update and the lock clear all run while
/// holding the target's lockout guard, so no login attempt for that principal
/// can interleave. The sequence runs on its own task: dropping the returned
/// future does not stop a change that has already started.
///
/// # Example
///
/// ```rust,ignore
/// use lockward::auth::flows::{PasswordChangeCoordinator, PasswordChangeRequest};
///
/// let coordinator = PasswordChangeCoordinator::new(engine, store);
///
/// coordinator
///     .apply("user-123", PasswordChangeRequest::new("koala"), CallerContext::client("admin"))
///     .await?;
/// ```
#[derive(Clone)]
pub struct PasswordChangeCoordinator {
    engine: Arc<LockoutEngine>,
    store: Arc<dyn IdentityStore>,
    authorizer: PasswordChangeAuthorizer,
}

impl PasswordChangeCoordinator {
    pub fn new(engine: Arc<LockoutEngine>, store: Arc<dyn IdentityStore>) -> Self {
        Self {
            authorizer: PasswordChangeAuthorizer::new(store.clone()),
            engine,
            store,
        }
    }

    pub fn authorizer(&self) -> &PasswordChangeAuthorizer {
        &self.authorizer
    }

    /// Authorize, update the credential, then clear the lock.
    ///
    /// A rejected request leaves the lockout state untouched. An unknown
    /// target surfaces as the store's `NotFound`.
    pub async fn apply(
        &self,
        target: &str,
        req: PasswordChangeRequest,
        caller: CallerContext,
    ) -> Result<()> {
        let engine = self.engine.clone();
        let store = self.store.clone();
        let authorizer = self.authorizer.clone();
        let target = target.to_string();

        let task = tokio::spawn(async move {
            // Reject before taking the guard so bogus targets never get a lockout slot
            authorizer.precheck(&target, &req, &caller)?;
            if store.get_user(&target).await?.is_none() {
                return Err(LockwardError::not_found(format!(
                    "User {} does not exist",
                    target
                )));
            }

            let mut guard = engine.lock_principal(&target).await;

            authorizer.authorize(&target, &req, &caller).await?;
            store.update_password(&target, &req.password).await?;
            let was_locked = guard.clear_lock(SystemTime::now());

            tracing::info!(
                target: "auth.password.changed",
                principal_id = %target,
                caller = %caller.subject,
                privilege = ?caller.privilege,
                was_locked = was_locked,
                "Password changed"
            );

            Ok(())
        });

        task.await
            .map_err(|e| LockwardError::internal(format!("Password change task failed: {}", e)))?
    }
}
