use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::{Duration, Instant, SystemTime};

use crate::auth::clients::RegisteredClient;
use crate::auth::jwt::MIN_SECRET_LENGTH;
use crate::auth::lockout::LockoutPolicy;
use crate::error::{LockwardError, Result};
use crate::utils::{env_flag, get_env_with_prefix};

/// Main configuration for a lockward server
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub lockout: LockoutConfig,
    #[serde(default)]
    pub token: TokenConfig,
    /// OAuth2 clients allowed to call the token endpoint
    #[serde(default)]
    pub clients: Vec<RegisteredClient>,
    /// Accounts loaded into the in-memory identity store at startup
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in bytes (default: 64KB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

/// Account lockout settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LockoutConfig {
    /// Consecutive failures that lock an account (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Window in which failures are counted, in seconds (default: 3600)
    #[serde(default = "default_lookback_window_secs")]
    pub lookback_window_secs: u64,
    /// Lock lifetime in seconds. `None` keeps accounts locked until a
    /// password change clears them.
    #[serde(default)]
    pub lockout_duration_secs: Option<u64>,
    /// Attempt history kept per principal (default: 64)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// How often lapsed timed locks are swept, in seconds (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Access token settings
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// HS256 signing secret. A random per-process secret is used when unset.
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Access token lifetime in seconds (default: 43200)
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: u64,
}

/// An account to create at startup
#[derive(Clone, Deserialize, Serialize)]
pub struct SeedUser {
    /// Fixed id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub administrator: bool,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .finish()
    }
}

impl std::fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("administrator", &self.administrator)
            .finish_non_exhaustive()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            lookback_window_secs: default_lookback_window_secs(),
            lockout_duration_secs: None,
            history_capacity: default_history_capacity(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: default_issuer(),
            access_token_ttl_secs: default_access_token_ttl_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_max_body_size() -> usize {
    64 * 1024
}

fn default_max_attempts() -> u32 {
    crate::auth::lockout::DEFAULT_MAX_ATTEMPTS
}

fn default_lookback_window_secs() -> u64 {
    crate::auth::lockout::DEFAULT_LOOKBACK_WINDOW.as_secs()
}

fn default_history_capacity() -> usize {
    crate::auth::lockout::DEFAULT_HISTORY_CAPACITY
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_issuer() -> String {
    "lockward".to_string()
}

fn default_access_token_ttl_secs() -> u64 {
    12 * 60 * 60
}

impl ServerConfig {
    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl LockoutConfig {
    /// The lockout policy these settings describe.
    pub fn policy(&self) -> LockoutPolicy {
        let policy = LockoutPolicy::new()
            .max_attempts(self.max_attempts)
            .lookback_window(Duration::from_secs(self.lookback_window_secs))
            .history_capacity(self.history_capacity);

        match self.lockout_duration_secs {
            Some(secs) => policy.lockout_duration(Duration::from_secs(secs)),
            None => policy.indefinite(),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl TokenConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration, e.g. one deserialized from a file
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.config.server.max_body_size = max_body_size;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_lockout(mut self, lockout: LockoutConfig) -> Self {
        self.config.lockout = lockout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.lockout.max_attempts = max_attempts;
        self
    }

    /// Release locks automatically after `duration`
    pub fn with_lockout_duration(mut self, duration: Duration) -> Self {
        self.config.lockout.lockout_duration_secs = Some(duration.as_secs());
        self
    }

    pub fn with_token_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.token.secret = Some(secret.into());
        self
    }

    pub fn with_token_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.token.issuer = issuer.into();
        self
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.config.token.access_token_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_client(mut self, client: RegisteredClient) -> Self {
        self.config.clients.push(client);
        self
    }

    pub fn with_user(mut self, user: SeedUser) -> Self {
        self.config.users.push(user);
        self
    }

    /// Load configuration from environment variables with LOCKWARD_ prefix
    ///
    /// `CLIENTS` and `USERS` hold JSON arrays and replace the configured lists.
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        // Check LOCKWARD_PORT first, fall back to PORT
        if let Some(port) = parse_env("PORT") {
            self.config.server.port = port;
        }
        if let Some(size) = parse_env("MAX_BODY_SIZE") {
            self.config.server.max_body_size = size;
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = env_flag("LOG_JSON") {
            self.config.logging.json = json;
        }

        if let Some(max) = parse_env("LOCKOUT_MAX_ATTEMPTS") {
            self.config.lockout.max_attempts = max;
        }
        if let Some(secs) = parse_env("LOCKOUT_WINDOW_SECS") {
            self.config.lockout.lookback_window_secs = secs;
        }
        if let Some(secs) = parse_env("LOCKOUT_DURATION_SECS") {
            self.config.lockout.lockout_duration_secs = Some(secs);
        }
        if let Some(capacity) = parse_env("LOCKOUT_HISTORY_CAPACITY") {
            self.config.lockout.history_capacity = capacity;
        }
        if let Some(secs) = parse_env("LOCKOUT_SWEEP_SECS") {
            self.config.lockout.sweep_interval_secs = secs;
        }

        if let Some(secret) = get_env_with_prefix("JWT_SECRET") {
            self.config.token.secret = Some(secret);
        }
        if let Some(issuer) = get_env_with_prefix("JWT_ISSUER") {
            self.config.token.issuer = issuer;
        }
        if let Some(ttl) = parse_env("ACCESS_TOKEN_TTL_SECS") {
            self.config.token.access_token_ttl_secs = ttl;
        }

        if let Some(clients) = parse_json_env("CLIENTS") {
            self.config.clients = clients;
        }
        if let Some(users) = parse_json_env("USERS") {
            self.config.users = users;
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration is invalid:
    /// - Invalid server address (host:port)
    /// - Invalid log level
    /// - Zero lockout threshold, window or sweep interval
    /// - Durations too large to add to the current time
    /// - Token secret shorter than 32 bytes
    /// - Duplicate client ids
    pub fn build(self) -> Result<Config> {
        let config = self.config;

        config.server.addr().map_err(|e| {
            LockwardError::bad_request(format!(
                "Invalid server address {}:{} - {}",
                config.server.host, config.server.port, e
            ))
        })?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(LockwardError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if config.server.max_body_size == 0 {
            return Err(LockwardError::bad_request(
                "Maximum body size must be greater than 0",
            ));
        }

        if config.lockout.max_attempts == 0 {
            return Err(LockwardError::bad_request(
                "Lockout max_attempts must be greater than 0",
            ));
        }
        if config.lockout.lookback_window_secs == 0 {
            return Err(LockwardError::bad_request(
                "Lockout lookback window must be greater than 0",
            ));
        }
        if config.lockout.lockout_duration_secs == Some(0) {
            return Err(LockwardError::bad_request(
                "Lockout duration must be greater than 0 when set",
            ));
        }
        if config.lockout.sweep_interval_secs == 0 {
            return Err(LockwardError::bad_request(
                "Lockout sweep interval must be greater than 0",
            ));
        }
        check_representable("Lockout lookback window", config.lockout.lookback_window_secs)?;
        if let Some(secs) = config.lockout.lockout_duration_secs {
            check_representable("Lockout duration", secs)?;
        }
        check_representable("Lockout sweep interval", config.lockout.sweep_interval_secs)?;

        if let Some(secret) = &config.token.secret {
            if secret.len() < MIN_SECRET_LENGTH {
                return Err(LockwardError::bad_request(format!(
                    "JWT secret must be at least {} bytes",
                    MIN_SECRET_LENGTH
                )));
            }
        }
        if config.token.access_token_ttl_secs == 0 {
            return Err(LockwardError::bad_request(
                "Access token TTL must be greater than 0",
            ));
        }
        check_representable("Access token TTL", config.token.access_token_ttl_secs)?;

        let mut seen = std::collections::HashSet::new();
        for client in &config.clients {
            if !seen.insert(client.client_id.as_str()) {
                return Err(LockwardError::bad_request(format!(
                    "Duplicate client id: {}",
                    client.client_id
                )));
            }
        }

        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = get_env_with_prefix(key)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key = key, value = %value, "Ignoring unparseable environment variable");
            None
        }
    }
}

fn parse_json_env<T: serde::de::DeserializeOwned>(key: &str) -> Option<T> {
    let value = get_env_with_prefix(key)?;
    match serde_json::from_str(&value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(key = key, error = %e, "Ignoring malformed JSON environment variable");
            None
        }
    }
}

/// Reject durations that overflow when added to the current time.
fn check_representable(name: &str, secs: u64) -> Result<()> {
    let duration = Duration::from_secs(secs);
    if SystemTime::now().checked_add(duration).is_none()
        || Instant::now().checked_add(duration).is_none()
    {
        return Err(LockwardError::bad_request(format!(
            "{} of {} seconds is out of range",
            name, secs
        )));
    }
    Ok(())
}
