use crate::auth::clients::ClientRegistry;
use crate::auth::flows::AuthenticationGateway;
use crate::auth::jwt::{JwtConfig, JwtTokenService, TokenService};
use crate::auth::lockout::LockoutEngine;
use crate::auth::storage::{IdentityStore, InMemoryIdentityStore, Principal};
use crate::config::{Config, SeedUser};
use crate::error::Result;
use crate::http::{self, AppState};
use axum::Router;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;

/// A configured lockward server
///
/// # Example
///
/// ```rust,no_run
/// use lockward::{App, ConfigBuilder};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ConfigBuilder::new().from_env().build()?;
///     lockward::init_tracing_with_config(&config);
///
///     App::from_config(config)?.serve().await?;
///     Ok(())
/// }
/// ```
pub struct App {
    config: Config,
    state: AppState,
    engine: Arc<LockoutEngine>,
}

impl App {
    /// Builder pattern for constructing an App
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Build an App backed by the in-memory identity store, seeded from `config.users`
    pub fn from_config(config: Config) -> Result<Self> {
        AppBuilder::new().with_config(config).build()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn engine(&self) -> &Arc<LockoutEngine> {
        &self.engine
    }

    /// The router with middleware applied, for in-process testing
    pub fn router(&self) -> Router {
        http::router(self.state.clone(), self.config.server.max_body_size)
    }

    /// Consume the app into its router
    pub fn into_test_router(self) -> Router {
        self.router()
    }

    /// Bind the configured address and serve until SIGINT/SIGTERM
    pub async fn serve(self) -> std::io::Result<()> {
        let addr = self
            .config
            .server
            .addr()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Server starting on http://{}", addr);

        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` completes
    ///
    /// The timed-lock sweep runs alongside the server when locks expire.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweep = self
            .engine
            .spawn_expiry_sweep(self.config.lockout.sweep_interval());
        if sweep.is_some() {
            tracing::info!(
                interval_secs = self.config.lockout.sweep_interval_secs,
                "Lock expiry sweep started"
            );
        }

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        if let Some(sweep) = sweep {
            sweep.abort();
        }
        tracing::info!("Shutdown complete");

        result
    }
}

/// Builder for App with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppBuilder {
    config: Config,
    store: Option<Arc<dyn IdentityStore>>,
    tokens: Option<Arc<dyn TokenService>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            store: None,
            tokens: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use an external identity store instead of the seeded in-memory one
    pub fn with_identity_store(mut self, store: Arc<dyn IdentityStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a custom token service instead of HS256 JWTs built from config
    pub fn with_token_service(mut self, tokens: Arc<dyn TokenService>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn build(self) -> Result<App> {
        let config = self.config;

        let store = match self.store {
            Some(store) => {
                if !config.users.is_empty() {
                    tracing::warn!(
                        count = config.users.len(),
                        "Seed users are ignored when an identity store is supplied"
                    );
                }
                store
            }
            None => Arc::new(seeded_store(&config.users)?),
        };

        let tokens = match self.tokens {
            Some(tokens) => tokens,
            None => {
                let secret = match &config.token.secret {
                    Some(secret) => secret.clone(),
                    None => {
                        tracing::warn!(
                            "No JWT secret configured; using a random one. Tokens will not survive a restart"
                        );
                        generate_secret()
                    }
                };
                let jwt = JwtConfig::with_secret(secret, config.token.issuer.clone())
                    .access_token_ttl(config.token.access_token_ttl());
                Arc::new(JwtTokenService::new(jwt)?)
            }
        };

        let engine = Arc::new(LockoutEngine::new(config.lockout.policy()));

        let mut clients = ClientRegistry::new();
        for client in &config.clients {
            clients.register(client.clone());
        }
        if clients.is_empty() {
            tracing::warn!("No OAuth2 clients configured; the token endpoint will reject every request");
        }

        let gateway = AuthenticationGateway::new(store, engine.clone(), tokens);

        Ok(App {
            state: AppState::new(gateway, clients),
            engine,
            config,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn seeded_store(users: &[SeedUser]) -> Result<InMemoryIdentityStore> {
    let store = InMemoryIdentityStore::new();
    for user in users {
        let id = user
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut principal = Principal::new(id, &user.username);
        if user.administrator {
            principal = principal.administrator();
        }
        store.insert(principal, &user.password)?;
    }
    if !users.is_empty() {
        tracing::info!(count = users.len(), "Seeded identity store");
    }
    Ok(store)
}

fn generate_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give connections a grace period to close
    tokio::time::sleep(Duration::from_secs(1)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;

    fn seed(username: &str, administrator: bool) -> SeedUser {
        SeedUser {
            id: Some(format!("{}-id", username)),
            username: username.to_string(),
            password: "password".to_string(),
            administrator,
        }
    }

    #[tokio::test]
    async fn test_build_seeds_users() {
        let config = ConfigBuilder::new()
            .with_user(seed("joe", false))
            .with_user(seed("root", true))
            .build()
            .unwrap();
        let app = App::from_config(config).unwrap();

        let principal = app.state().gateway.authenticate("root", "password").await.unwrap();
        assert_eq!(principal.id, "root-id");
        assert!(principal.administrator);
    }

    #[test]
    fn test_duplicate_seed_usernames_rejected() {
        let config = ConfigBuilder::new()
            .with_user(seed("joe", false))
            .with_user(SeedUser {
                id: None,
                ..seed("JOE", false)
            })
            .build()
            .unwrap();
        assert!(App::from_config(config).is_err());
    }

    #[test]
    fn test_engine_uses_configured_policy() {
        let config = ConfigBuilder::new().with_max_attempts(3).build().unwrap();
        let app = App::from_config(config).unwrap();
        assert_eq!(app.engine().policy().max_attempts, 3);
    }

    #[tokio::test]
    async fn test_serve_with_shutdown() {
        let config = ConfigBuilder::new()
            .with_lockout_duration(Duration::from_secs(60))
            .build()
            .unwrap();
        let app = App::from_config(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(app.serve_with_shutdown(listener, async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
