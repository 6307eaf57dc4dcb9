//! External API integrations

pub mod identity;

pub use identity::IdentityProviderClient;
