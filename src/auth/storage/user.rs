//! Identity store trait.

use crate::error::Result;
use async_trait::async_trait;

/// An account as seen by this crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    /// Stable identifier.
    pub id: String,
    pub username: String,
    /// Whether tokens issued to this user carry administrative privilege.
    pub administrator: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            administrator: false,
        }
    }

    #[must_use]
    pub fn administrator(mut self) -> Self {
        self.administrator = true;
        self
    }
}

/// User identity storage required by the lockout and password-change flows.
///
/// Implement this trait for your database layer. Credentials are handed
/// over in plain text; hashing is the store's concern.
///
/// # Example
///
/// ```rust,ignore
/// use lockward::auth::storage::{IdentityStore, Principal};
/// use async_trait::async_trait;
///
/// struct PgIdentityStore {
///     pool: PgPool,
///     hasher: PasswordHasher,
/// }
///
/// #[async_trait]
/// impl IdentityStore for PgIdentityStore {
///     async fn get_user(&self, id: &str) -> Result<Option<Principal>> {
///         // Query your database
///     }
///
///     // ... implement other methods
/// }
/// ```
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find a user by id.
    async fn get_user(&self, id: &str) -> Result<Option<Principal>>;

    /// Find a user by username (case-insensitive).
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>>;

    /// Check `password` against the user's current credential.
    ///
    /// Returns `Ok(false)` on mismatch. An unknown user is `NotFound`.
    async fn verify_password(&self, id: &str, password: &str) -> Result<bool>;

    /// Replace the user's credential. An unknown user is `NotFound`.
    async fn update_password(&self, id: &str, new_password: &str) -> Result<()>;
}
