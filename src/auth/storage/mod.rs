//! Storage traits for the identity collaborator.
//!
//! Implement [`IdentityStore`] for your database layer; [`InMemoryIdentityStore`]
//! is provided for tests and single-node deployments.

mod memory;
pub mod user;

pub use memory::InMemoryIdentityStore;
pub use user::{IdentityStore, Principal};
