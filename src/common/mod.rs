// Common module - shared types and utilities

pub mod config;
pub mod error;
pub mod helpers;
pub mod ids;
pub mod migrations;
pub mod state;

// Re-export commonly used types for convenience
pub use config::GatewayConfig;
pub use error::ApiError;
pub use helpers::{read_cookie, safe_email_log, safe_token_log};
pub use ids::generate_state_token;
pub use state::AppState;
