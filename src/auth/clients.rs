//! Registered OAuth2 clients.
//!
//! Every call to the token endpoint is made by a client authenticated with
//! HTTP Basic. The registry checks the secret and which grants the client
//! may use.

use crate::auth::token::BasicCredentials;
use crate::error::{LockwardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use subtle::ConstantTimeEq;

/// OAuth2 grant types served by the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    Password,
    ClientCredentials,
}

impl GrantType {
    /// Parse the `grant_type` form value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "password" => Some(Self::Password),
            "client_credentials" => Some(Self::ClientCredentials),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

/// A client allowed to call the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClient {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Grants this client may request.
    pub grants: Vec<GrantType>,
    /// Scope granted to tokens this client obtains for users.
    #[serde(default)]
    pub scope: Vec<String>,
    /// Scope granted to the client's own client-credential tokens.
    #[serde(default)]
    pub authorities: Vec<String>,
}

impl std::fmt::Debug for RegisteredClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredClient")
            .field("client_id", &self.client_id)
            .field("grants", &self.grants)
            .field("scope", &self.scope)
            .field("authorities", &self.authorities)
            .finish_non_exhaustive()
    }
}

impl RegisteredClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            grants: Vec::new(),
            scope: Vec::new(),
            authorities: Vec::new(),
        }
    }

    #[must_use]
    pub fn grant(mut self, grant: GrantType) -> Self {
        if !self.grants.contains(&grant) {
            self.grants.push(grant);
        }
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn authorities(mut self, authorities: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.authorities = authorities.into_iter().map(Into::into).collect();
        self
    }

    pub fn allows(&self, grant: GrantType) -> bool {
        self.grants.contains(&grant)
    }
}

/// Lookup table of registered clients.
#[derive(Clone, Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, RegisteredClient>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client, replacing any previous one with the same id.
    #[must_use]
    pub fn with_client(mut self, client: RegisteredClient) -> Self {
        self.register(client);
        self
    }

    pub fn register(&mut self, client: RegisteredClient) {
        self.clients.insert(client.client_id.clone(), client);
    }

    pub fn get(&self, client_id: &str) -> Option<&RegisteredClient> {
        self.clients.get(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Authenticate a client by its Basic credentials.
    ///
    /// Unknown ids and wrong secrets produce the same error.
    pub fn authenticate(&self, credentials: &BasicCredentials) -> Result<&RegisteredClient> {
        let client = self.clients.get(&credentials.client_id);

        let secret_matches = match client {
            Some(client) => constant_time_eq(&client.client_secret, &credentials.client_secret),
            None => {
                // Keep the comparison cost for unknown ids
                let _ = constant_time_eq(&credentials.client_secret, &credentials.client_secret);
                false
            }
        };

        match client {
            Some(client) if secret_matches => Ok(client),
            _ => {
                tracing::info!(
                    target: "auth.client.rejected",
                    client_id = %credentials.client_id,
                    "Client authentication failed"
                );
                Err(LockwardError::invalid_client("Bad client credentials"))
            }
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ClientRegistry {
        ClientRegistry::new()
            .with_client(RegisteredClient::new("app", "appclientsecret").grant(GrantType::Password))
            .with_client(
                RegisteredClient::new("admin", "adminsecret")
                    .grant(GrantType::ClientCredentials)
                    .authorities(["password.write"]),
            )
    }

    fn creds(id: &str, secret: &str) -> BasicCredentials {
        BasicCredentials {
            client_id: id.to_string(),
            client_secret: secret.to_string(),
        }
    }

    #[test]
    fn test_authenticate_client() {
        let registry = registry();
        let client = registry.authenticate(&creds("app", "appclientsecret")).unwrap();
        assert!(client.allows(GrantType::Password));
        assert!(!client.allows(GrantType::ClientCredentials));
    }

    #[test]
    fn test_wrong_secret_and_unknown_client_look_the_same() {
        let registry = registry();
        let wrong = registry.authenticate(&creds("app", "nope")).unwrap_err();
        let unknown = registry.authenticate(&creds("ghost", "nope")).unwrap_err();

        assert!(matches!(wrong, LockwardError::InvalidClient(_)));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn test_grant_type_parse() {
        assert_eq!(GrantType::parse("password"), Some(GrantType::Password));
        assert_eq!(GrantType::parse("client_credentials"), Some(GrantType::ClientCredentials));
        assert_eq!(GrantType::parse("authorization_code"), None);
        assert_eq!(GrantType::ClientCredentials.as_str(), "client_credentials");
    }

    #[test]
    fn test_secret_not_serialized_or_debugged() {
        let client = RegisteredClient::new("app", "s3cret");
        assert!(!serde_json::to_string(&client).unwrap().contains("s3cret"));
        assert!(!format!("{:?}", client).contains("s3cret"));
    }

    #[test]
    fn test_deserialize_from_config() {
        let client: RegisteredClient = serde_json::from_str(
            r#"{"client_id":"admin","client_secret":"x","grants":["client_credentials"]}"#,
        )
        .unwrap();
        assert!(client.allows(GrantType::ClientCredentials));
        assert!(client.authorities.is_empty());
    }
}
