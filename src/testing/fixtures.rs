//! Test fixtures: fake data, test users and an in-process test app.

use super::scenario::{self, ScenarioAssert};
use crate::app::App;
use crate::auth::clients::{GrantType, RegisteredClient};
use crate::auth::lockout::LockoutEngine;
use crate::auth::storage::{InMemoryIdentityStore, Principal};
use crate::config::{Config, ConfigBuilder};
use axum::Router;
use std::sync::Arc;
use uuid::Uuid;

/// Client registered for the password grant in [`TestApp`]
pub const APP_CLIENT: (&str, &str) = ("app", "appclientsecret");

/// Client registered for the client-credentials grant in [`TestApp`]
pub const ADMIN_CLIENT: (&str, &str) = ("admin", "adminsecret");

const TEST_JWT_SECRET: &str = "lockward-test-secret-key-at-least-32-bytes";

/// Helper functions for generating fake test data
pub mod fake {
    use super::*;

    /// Generate a fake UUID as a string
    pub fn uuid() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate a fake username
    pub fn username() -> String {
        format!("user_{}", &Uuid::new_v4().simple().to_string()[..8])
    }

    /// Generate a random password
    pub fn password() -> String {
        string(16)
    }

    /// Generate a random alphanumeric string of the given length
    pub fn string(length: usize) -> String {
        (0..length).map(|_| fastrand::alphanumeric()).collect()
    }
}

/// Test account data
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub password: String,
    pub administrator: bool,
}

impl TestUser {
    /// Create a new TestUser builder
    pub fn builder() -> TestUserBuilder {
        TestUserBuilder::default()
    }

    /// Create a TestUser with generated values
    pub fn generate() -> Self {
        Self::builder().build()
    }

    pub fn principal(&self) -> Principal {
        let principal = Principal::new(&self.id, &self.username);
        if self.administrator {
            principal.administrator()
        } else {
            principal
        }
    }
}

/// Builder for TestUser
#[derive(Default)]
pub struct TestUserBuilder {
    id: Option<String>,
    username: Option<String>,
    password: Option<String>,
    administrator: bool,
}

impl TestUserBuilder {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn administrator(mut self) -> Self {
        self.administrator = true;
        self
    }

    pub fn build(self) -> TestUser {
        TestUser {
            id: self.id.unwrap_or_else(fake::uuid),
            username: self.username.unwrap_or_else(fake::username),
            password: self.password.unwrap_or_else(fake::password),
            administrator: self.administrator,
        }
    }
}

/// A fully wired app for HTTP-level tests
///
/// Uses a fast-hashing in-memory store and registers [`APP_CLIENT`] and
/// [`ADMIN_CLIENT`].
pub struct TestApp {
    router: Router,
    store: InMemoryIdentityStore,
    engine: Arc<LockoutEngine>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ConfigBuilder::new())
    }

    /// Build from a config builder; the test clients and signing secret are added to it
    pub fn with_config(builder: ConfigBuilder) -> Self {
        let config: Config = builder
            .with_token_secret(TEST_JWT_SECRET)
            .with_client(
                RegisteredClient::new(APP_CLIENT.0, APP_CLIENT.1)
                    .grant(GrantType::Password)
                    .scope(["openid", "password.write"]),
            )
            .with_client(
                RegisteredClient::new(ADMIN_CLIENT.0, ADMIN_CLIENT.1)
                    .grant(GrantType::ClientCredentials)
                    .authorities(["password.write", "uaa.admin"]),
            )
            .build()
            .expect("invalid test config");

        let store = InMemoryIdentityStore::fast();
        let app = App::builder()
            .with_config(config)
            .with_identity_store(Arc::new(store.clone()))
            .build()
            .expect("failed to build test app");

        Self {
            router: app.router(),
            engine: app.engine().clone(),
            store,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn store(&self) -> &InMemoryIdentityStore {
        &self.store
    }

    pub fn engine(&self) -> &Arc<LockoutEngine> {
        &self.engine
    }

    /// Insert `user` into the store
    pub fn add_user(&self, user: &TestUser) -> Principal {
        self.store
            .insert(user.principal(), &user.password)
            .expect("failed to add test user")
    }

    /// Request a password-grant token through [`APP_CLIENT`]
    pub async fn login(&self, username: &str, password: &str) -> ScenarioAssert {
        scenario::post(self.router(), "/oauth/token")
            .basic_auth(APP_CLIENT.0, APP_CLIENT.1)
            .form_body(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
            ])
            .execute()
            .await
    }

    /// Log in and return the access token, asserting success
    pub async fn user_token(&self, user: &TestUser) -> String {
        let body: serde_json::Value = self
            .login(&user.username, &user.password)
            .await
            .assert_ok()
            .json()
            .await;
        access_token(&body)
    }

    /// Obtain a client-credentials token for [`ADMIN_CLIENT`]
    pub async fn client_token(&self) -> String {
        let body: serde_json::Value = scenario::post(self.router(), "/oauth/token")
            .basic_auth(ADMIN_CLIENT.0, ADMIN_CLIENT.1)
            .form_body(&[("grant_type", "client_credentials")])
            .execute()
            .await
            .assert_ok()
            .json()
            .await;
        access_token(&body)
    }

    /// `PUT /Users/{id}/password` with `token`
    pub async fn change_password(
        &self,
        id: &str,
        token: &str,
        body: serde_json::Value,
    ) -> ScenarioAssert {
        scenario::put(self.router(), &format!("/Users/{}/password", id))
            .bearer_token(token)
            .json_body(&body)
            .execute()
            .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn access_token(body: &serde_json::Value) -> String {
    body["access_token"]
        .as_str()
        .expect("access_token missing from token response")
        .to_string()
}
