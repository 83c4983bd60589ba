//! Testing utilities for lockward
//!
//! - Alba-style HTTP endpoint testing without running a server
//! - A pre-wired [`TestApp`] with test clients and a fast password hasher
//! - Fake data and test users
//!
//! # Example
//!
//! ```rust,ignore
//! use lockward::testing::{TestApp, TestUser};
//!
//! #[tokio::test]
//! async fn test_login() {
//!     let app = TestApp::new();
//!     let user = TestUser::generate();
//!     app.add_user(&user);
//!
//!     app.login(&user.username, &user.password).await.assert_ok();
//! }
//! ```

mod fixtures;
mod scenario;

pub use fixtures::{ADMIN_CLIENT, APP_CLIENT, TestApp, TestUser, TestUserBuilder, fake};
pub use scenario::{Scenario, ScenarioAssert, get, post, put};
