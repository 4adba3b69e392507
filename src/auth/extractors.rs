//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::User;
use crate::common::{safe_token_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Verifies the bearer access token and re-loads the user from the store, so
/// profile edits and removals take effect on the very next request.
#[derive(Debug)]
pub struct AuthedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::internal("missing app state"))?;

        let token = bearer_token(parts);
        match &token {
            Some(t) => debug!(token = %safe_token_log(t), "Bearer token presented"),
            None => warn!("Authentication failed: missing Authorization header"),
        }

        let user = app_state.auth.verify(token.as_deref()).await?;
        Ok(AuthedUser(user))
    }
}

/// Token from the `Authorization` header, accepting `Bearer <token>` or a raw token.
fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = if value.eq_ignore_ascii_case("bearer") {
        ""
    } else {
        match value.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            _ => value,
        }
    };
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
