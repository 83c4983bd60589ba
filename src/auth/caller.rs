//! Who is calling, and with which privilege.

use serde::{Deserialize, Serialize};

/// Privilege class of an authenticated caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    /// An end user acting on their own account.
    SelfService,
    /// An end user holding administrative rights over other accounts.
    Administrative,
    /// A trusted client acting for the system, with no end user involved.
    ClientCredential,
}

impl Privilege {
    /// Whether this caller may change passwords without proving the old one.
    #[must_use]
    pub fn is_trusted(self) -> bool {
        matches!(self, Self::Administrative | Self::ClientCredential)
    }
}

/// Authenticated caller, derived from a verified access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerContext {
    /// Principal id for user tokens, client id for client-credential tokens.
    pub subject: String,
    pub privilege: Privilege,
}

impl CallerContext {
    pub fn new(subject: impl Into<String>, privilege: Privilege) -> Self {
        Self {
            subject: subject.into(),
            privilege,
        }
    }

    pub fn self_service(principal_id: impl Into<String>) -> Self {
        Self::new(principal_id, Privilege::SelfService)
    }

    pub fn administrative(principal_id: impl Into<String>) -> Self {
        Self::new(principal_id, Privilege::Administrative)
    }

    pub fn client(client_id: impl Into<String>) -> Self {
        Self::new(client_id, Privilege::ClientCredential)
    }

    /// Whether the caller is the given principal.
    #[must_use]
    pub fn is_principal(&self, principal_id: &str) -> bool {
        self.privilege != Privilege::ClientCredential && self.subject == principal_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trusted_privileges() {
        assert!(!Privilege::SelfService.is_trusted());
        assert!(Privilege::Administrative.is_trusted());
        assert!(Privilege::ClientCredential.is_trusted());
    }

    #[test]
    fn test_client_is_never_a_principal() {
        let caller = CallerContext::client("user-1");
        assert!(!caller.is_principal("user-1"));

        let caller = CallerContext::self_service("user-1");
        assert!(caller.is_principal("user-1"));
        assert!(!caller.is_principal("user-2"));
    }

    #[test]
    fn test_privilege_wire_format() {
        assert_eq!(
            serde_json::to_string(&Privilege::ClientCredential).unwrap(),
            "\"client_credential\""
        );
        let parsed: Privilege = serde_json::from_str("\"self_service\"").unwrap();
        assert_eq!(parsed, Privilege::SelfService);
    }
}
