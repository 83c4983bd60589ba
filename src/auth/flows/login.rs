//! Authentication gateway: login attempts, token grants and password changes.
//!
//! Tracing targets:
//! - `auth.login.failed` - Bad credentials or a locked account
//! - `auth.token.issued` - Access token issued

use crate::auth::caller::CallerContext;
use crate::auth::clients::{GrantType, RegisteredClient};
use crate::auth::jwt::{IssuedToken, TokenService, TokenSubject};
use crate::auth::lockout::{AttemptOutcome, LockDecision, LockoutEngine};
use crate::auth::storage::{IdentityStore, Principal};
use crate::error::{LockwardError, Result};
use std::sync::Arc;
use std::time::SystemTime;

use super::change::PasswordChangeCoordinator;
use super::types::{PasswordChangeRequest, TokenRequest};

const BAD_CREDENTIALS: &str = "Bad credentials";

/// Entry point for everything that authenticates a principal or changes
/// its credential.
///
/// Login runs check, verify and record under the principal's lockout guard.
/// The only await inside the guard is credential verification, and the
/// outcome is recorded after it, so an abandoned login records nothing.
///
/// # Example
///
/// ```rust,ignore
/// use lockward::auth::flows::AuthenticationGateway;
///
/// let gateway = AuthenticationGateway::new(store, engine, tokens);
///
/// let principal = gateway.authenticate("joe", "password").await?;
/// ```
#[derive(Clone)]
pub struct AuthenticationGateway {
    store: Arc<dyn IdentityStore>,
    engine: Arc<LockoutEngine>,
    tokens: Arc<dyn TokenService>,
    coordinator: PasswordChangeCoordinator,
}

impl AuthenticationGateway {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        engine: Arc<LockoutEngine>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            coordinator: PasswordChangeCoordinator::new(engine.clone(), store.clone()),
            store,
            engine,
            tokens,
        }
    }

    pub fn engine(&self) -> &Arc<LockoutEngine> {
        &self.engine
    }

    pub fn tokens(&self) -> &Arc<dyn TokenService> {
        &self.tokens
    }

    /// Authenticate a principal by username and password.
    ///
    /// # Errors
    ///
    /// `Unauthorized` with `"Bad credentials"` for an unknown user or a wrong
    /// password, and with `"Login policy rejected authentication"` while the
    /// account is locked. A rejected-while-locked attempt is not recorded.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Principal> {
        let Some(principal) = self.store.find_by_username(username).await? else {
            tracing::info!(
                target: "auth.login.failed",
                username = %username,
                reason = "unknown_user",
                "Login failed"
            );
            return Err(LockwardError::unauthorized(BAD_CREDENTIALS));
        };

        let mut guard = self.engine.lock_principal(&principal.id).await;

        if let LockDecision::Denied { reason, .. } = guard.check_allowed(SystemTime::now()) {
            tracing::warn!(
                target: "auth.login.failed",
                principal_id = %principal.id,
                reason = "locked",
                "Login rejected for locked account"
            );
            return Err(LockwardError::unauthorized(reason));
        }

        let verified = self.store.verify_password(&principal.id, password).await?;
        let outcome = if verified {
            AttemptOutcome::Success
        } else {
            AttemptOutcome::Failure
        };
        let result = guard.on_attempt(outcome, SystemTime::now());

        if verified {
            return Ok(principal);
        }

        tracing::info!(
            target: "auth.login.failed",
            principal_id = %principal.id,
            failed_attempts = result.state.failed_attempts,
            locked = result.just_locked,
            reason = "bad_password",
            "Login failed"
        );
        Err(LockwardError::unauthorized(BAD_CREDENTIALS))
    }

    /// Serve a token request for an already authenticated client.
    ///
    /// # Errors
    ///
    /// - `UnsupportedGrantType` for grants this service does not implement
    /// - `InvalidClient` if the client is not registered for the grant
    /// - `BadRequest` for missing fields or scope beyond the client's
    /// - whatever [`authenticate`](Self::authenticate) returns for the password grant
    pub async fn grant(
        &self,
        client: &RegisteredClient,
        req: &TokenRequest,
    ) -> Result<IssuedToken> {
        let grant = GrantType::parse(&req.grant_type).ok_or_else(|| {
            LockwardError::UnsupportedGrantType(format!(
                "Unsupported grant type: {}",
                req.grant_type
            ))
        })?;

        if !client.allows(grant) {
            return Err(LockwardError::invalid_client(format!(
                "Unauthorized grant type: {}",
                grant.as_str()
            )));
        }

        let issued = match grant {
            GrantType::Password => {
                let (Some(username), Some(password)) = (&req.username, &req.password) else {
                    return Err(LockwardError::bad_request(
                        "username and password are required",
                    ));
                };
                let scope = resolve_scope(&client.scope, req.scope.as_deref())?;
                let principal = self.authenticate(username, password).await?;
                self.tokens
                    .issue(TokenSubject::user(&principal, &client.client_id).with_scope(scope))?
            }
            GrantType::ClientCredentials => {
                let scope = resolve_scope(&client.authorities, req.scope.as_deref())?;
                self.tokens
                    .issue(TokenSubject::client(&client.client_id).with_scope(scope))?
            }
        };

        tracing::info!(
            target: "auth.token.issued",
            client_id = %client.client_id,
            grant_type = grant.as_str(),
            jti = %issued.jti,
            "Access token issued"
        );

        Ok(issued)
    }

    /// Resolve a bearer token to the calling context.
    pub fn caller(&self, token: &str) -> Result<CallerContext> {
        Ok(self.tokens.verify(token)?.caller())
    }

    /// Change `target`'s password on behalf of `caller`.
    ///
    /// On success any lockout on the target is cleared in the same critical
    /// section as the credential update.
    pub async fn change_password(
        &self,
        target: &str,
        req: PasswordChangeRequest,
        caller: CallerContext,
    ) -> Result<()> {
        self.coordinator.apply(target, req, caller).await
    }
}

/// Narrow `allowed` to the requested space-separated scope.
///
/// No request means everything allowed. Asking for anything outside
/// `allowed` is an error.
fn resolve_scope(allowed: &[String], requested: Option<&str>) -> Result<Vec<String>> {
    let Some(requested) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(allowed.to_vec());
    };

    let mut scope = Vec::new();
    for item in requested.split_whitespace() {
        if !allowed.iter().any(|a| a == item) {
            return Err(LockwardError::bad_request(format!("Invalid scope: {}", item)));
        }
        if !scope.iter().any(|s: &String| s == item) {
            scope.push(item.to_string());
        }
    }
    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::caller::Privilege;
    use crate::auth::jwt::{JwtConfig, JwtTokenService};
    use crate::auth::lockout::{LOCKED_REASON, LockoutPolicy};
    use crate::auth::storage::InMemoryIdentityStore;

    struct Fixture {
        store: InMemoryIdentityStore,
        gateway: AuthenticationGateway,
    }

    fn fixture() -> Fixture {
        let store = InMemoryIdentityStore::fast();
        let engine = Arc::new(LockoutEngine::new(LockoutPolicy::new()));
        let tokens = JwtTokenService::new(JwtConfig::with_secret(
            "test-secret-key-for-jwt-signing-min-32-chars",
            "lockward-test",
        ))
        .unwrap();
        let gateway = AuthenticationGateway::new(Arc::new(store.clone()), engine, Arc::new(tokens));
        Fixture { store, gateway }
    }

    fn app_client() -> RegisteredClient {
        RegisteredClient::new("app", "appclientsecret")
            .grant(GrantType::Password)
            .scope(["openid", "password.write"])
    }

    fn password_request(username: &str, password: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "password".to_string(),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            scope: None,
        }
    }

    fn description(err: LockwardError) -> String {
        err.description()
    }

    #[tokio::test]
    async fn test_sixth_attempt_rejected_by_policy() {
        let f = fixture();
        f.store.add_user("joe", "password").unwrap();

        for _ in 0..5 {
            let err = f.gateway.authenticate("joe", "wrong").await.unwrap_err();
            assert_eq!(description(err), BAD_CREDENTIALS);
        }

        // Correct password, still locked
        let err = f.gateway.authenticate("joe", "password").await.unwrap_err();
        assert!(matches!(err, LockwardError::Unauthorized(_)));
        assert_eq!(description(err), LOCKED_REASON);
    }

    #[tokio::test]
    async fn test_locked_attempts_are_not_recorded() {
        let f = fixture();
        let joe = f.store.add_user("joe", "password").unwrap();

        for _ in 0..8 {
            let _ = f.gateway.authenticate("joe", "wrong").await;
        }

        assert_eq!(f.gateway.engine().status(&joe.id).await.failed_attempts, 5);
        assert_eq!(f.gateway.engine().history(&joe.id).len(), 5);
    }

    #[tokio::test]
    async fn test_success_resets_counter() {
        let f = fixture();
        let joe = f.store.add_user("joe", "password").unwrap();

        for _ in 0..4 {
            let _ = f.gateway.authenticate("joe", "wrong").await;
        }
        f.gateway.authenticate("joe", "password").await.unwrap();
        assert_eq!(f.gateway.engine().status(&joe.id).await.failed_attempts, 0);

        for _ in 0..4 {
            let _ = f.gateway.authenticate("joe", "wrong").await;
        }
        assert_eq!(f.gateway.authenticate("joe", "password").await.unwrap().id, joe.id);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let f = fixture();
        let err = f.gateway.authenticate("nobody", "password").await.unwrap_err();
        assert_eq!(description(err), BAD_CREDENTIALS);
    }

    #[tokio::test]
    async fn test_unlock_via_password_change_then_login() {
        let f = fixture();
        let joe = f.store.add_user("joe", "password").unwrap();
        for _ in 0..5 {
            let _ = f.gateway.authenticate("joe", "wrong").await;
        }

        f.gateway
            .change_password(
                &joe.id,
                PasswordChangeRequest::new("koala"),
                CallerContext::client("admin"),
            )
            .await
            .unwrap();

        assert_eq!(f.gateway.authenticate("joe", "koala").await.unwrap().id, joe.id);
    }

    #[tokio::test]
    async fn test_password_grant_issues_user_token() {
        let f = fixture();
        let joe = f.store.add_user("joe", "password").unwrap();

        let issued = f
            .gateway
            .grant(&app_client(), &password_request("joe", "password"))
            .await
            .unwrap();
        assert_eq!(issued.scope, "openid password.write");

        let caller = f.gateway.caller(&issued.access_token).unwrap();
        assert_eq!(caller, CallerContext::self_service(&joe.id));
    }

    #[tokio::test]
    async fn test_client_credentials_grant() {
        let f = fixture();
        let admin = RegisteredClient::new("admin", "adminsecret")
            .grant(GrantType::ClientCredentials)
            .authorities(["password.write"]);
        let req = TokenRequest {
            grant_type: "client_credentials".to_string(),
            username: None,
            password: None,
            scope: None,
        };

        let issued = f.gateway.grant(&admin, &req).await.unwrap();
        let caller = f.gateway.caller(&issued.access_token).unwrap();
        assert_eq!(caller.privilege, Privilege::ClientCredential);
        assert_eq!(caller.subject, "admin");
    }

    #[tokio::test]
    async fn test_grant_not_allowed_for_client() {
        let f = fixture();
        let req = TokenRequest {
            grant_type: "client_credentials".to_string(),
            username: None,
            password: None,
            scope: None,
        };
        let err = f.gateway.grant(&app_client(), &req).await.unwrap_err();
        assert!(matches!(err, LockwardError::InvalidClient(_)));
    }

    #[tokio::test]
    async fn test_unsupported_grant_type() {
        let f = fixture();
        let mut req = password_request("joe", "password");
        req.grant_type = "authorization_code".to_string();
        let err = f.gateway.grant(&app_client(), &req).await.unwrap_err();
        assert!(matches!(err, LockwardError::UnsupportedGrantType(_)));
    }

    #[test]
    fn test_resolve_scope() {
        let allowed = vec!["openid".to_string(), "password.write".to_string()];
        assert_eq!(resolve_scope(&allowed, None).unwrap(), allowed);
        assert_eq!(resolve_scope(&allowed, Some("  ")).unwrap(), allowed);
        assert_eq!(
            resolve_scope(&allowed, Some("openid openid")).unwrap(),
            vec!["openid".to_string()]
        );
        assert!(resolve_scope(&allowed, Some("admin")).is_err());
    }
}
