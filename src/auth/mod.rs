//! # Auth Module
//!
//! Exchanges an identity provider's authorization code for locally issued
//! session tokens and guards protected routes with them:
//! - `tokens`: signed access/refresh tokens
//! - `store`: users keyed by provider subject
//! - `oauth`: authorization-code exchange and id_token verification
//! - `service`: login, verify and refresh
//! - HTTP handlers, routes and the `AuthedUser` extractor

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod oauth;
pub mod routes;
pub mod service;
pub mod store;
pub mod tokens;

#[cfg(test)]
mod tests;

pub use error::AuthError;
pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
pub use service::AuthService;
