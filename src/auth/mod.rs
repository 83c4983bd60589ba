//! Authentication: account lockout, password change authorization and
//! the OAuth2 token surface around them.

pub mod caller;
pub mod clients;
pub mod extractors;
pub mod flows;
pub mod jwt;
pub mod lockout;
pub mod password;
pub mod storage;
pub mod token;

pub use caller::{CallerContext, Privilege};
pub use clients::{ClientRegistry, GrantType, RegisteredClient};
pub use extractors::{AuthenticatedClient, Caller};
pub use flows::{
    AuthenticationGateway, PasswordChangeAuthorizer, PasswordChangeCoordinator,
    PasswordChangeRequest, PasswordChangeResponse, TokenRequest,
};
pub use jwt::{AccessClaims, IssuedToken, JwtConfig, JwtTokenService, TokenService, TokenSubject};
pub use lockout::{
    AttemptLedger, AttemptOutcome, AttemptRecord, LOCKED_REASON, LockDecision, LockState,
    LockedUntil, LockoutEngine, LockoutPolicy,
};
pub use password::{PasswordConfig, PasswordHasher};
pub use storage::{IdentityStore, InMemoryIdentityStore, Principal};
pub use token::{BasicCredentials, TokenExtractor};
