//! Authentication flows.
//!
//! Login attempts and token grants go through the [`AuthenticationGateway`],
//! which consults the lockout engine on every attempt. Password changes are
//! authorized by caller privilege and applied together with a lock clear.

mod change;
mod login;
mod types;

pub use change::{PasswordChangeAuthorizer, PasswordChangeCoordinator};
pub use login::AuthenticationGateway;
pub use types::*;
