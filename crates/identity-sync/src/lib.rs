//! Maps OAuth2 provider profiles onto local accounts and keeps local group
//! memberships in sync with the provider's group claims.

pub mod logic;
pub mod repository;
#[cfg(any(test, feature = "integration_test"))]
pub mod test;

pub use logic::user_auth_flow::{Authenticator, AuthenticatorConfig};
