//! Lockward - account lockout and password-change authorization for an
//! OAuth2 identity service
//!
//! Lockward tracks authentication attempts per account, locks an account
//! after too many consecutive failures, and lets a password change clear
//! that lock under the right authorization.
//!
//! # Features
//!
//! - **Lockout**: bounded per-account attempt ledger and a configurable policy
//! - **Password change**: self-service changes need the old password; admin
//!   and client-credential callers do not
//! - **HTTP**: `POST /oauth/token` and `PUT /Users/{id}/password` on Axum
//! - **Testing**: Alba-style HTTP testing utilities
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lockward::{App, ConfigBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     lockward::init_tracing_with_config(&config);
//!
//!     App::from_config(config)?.serve().await?;
//!     Ok(())
//! }
//! ```

mod app;
pub mod auth;
mod config;
mod error;
pub mod http;
pub mod testing;
mod utils;

// Re-exports for public API
pub use app::{App, AppBuilder};
pub use config::{
    Config, ConfigBuilder, LockoutConfig, LoggingConfig, SeedUser, ServerConfig, TokenConfig,
};
pub use error::{ErrorResponse, LockwardError, Result};
pub use http::AppState;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "lockward=debug")
/// - `LOCKWARD_LOG_JSON`: Set to "true" for JSON formatted logs
///
/// Calling this more than once is a no-op.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logs = utils::env_flag("LOG_JSON").unwrap_or(false);
    install(env_filter, json_logs);
}

/// Initialize tracing from the `logging` section of a [`Config`]
///
/// `RUST_LOG` still wins over the configured level when it is set.
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    install(env_filter, config.logging.json);
}

fn install(env_filter: EnvFilter, json: bool) {
    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
