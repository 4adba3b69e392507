//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /auth/login` - Redirect to the identity provider
/// - `GET /auth/token` - Provider callback, issues session tokens
/// - `GET /auth/user` - Current user for a bearer access token
/// - `POST /auth/refresh` - New access token from a refresh token
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/login", get(handlers::login_handler))
        .route("/auth/token", get(handlers::token_handler))
        .route("/auth/user", get(handlers::user_handler))
        .route("/auth/refresh", post(handlers::refresh_handler))
}
