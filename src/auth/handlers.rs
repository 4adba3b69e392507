//! Authentication handlers

use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Query},
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{info, warn};

use super::extractors::AuthedUser;
use super::models::{AccessGrant, CallbackParams, RefreshRequest, UserResponse};
use crate::common::{read_cookie, ApiError, AppState};

/// Cookie carrying the anti-forgery state across the provider redirect
pub const STATE_COOKIE: &str = "oauth_state";

/// Seconds a pending login may take before its state cookie lapses
const STATE_COOKIE_MAX_AGE: u32 = 600;

fn state_cookie(value: &str, max_age: u32, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/auth; HttpOnly; SameSite=Lax; Max-Age={}",
        STATE_COOKIE, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// GET /auth/login
/// Redirects the browser to the provider's authorization page
pub async fn login_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let redirect = state.auth.start_login();
    info!("Redirecting to identity provider for login");

    let cookie = state_cookie(&redirect.state, STATE_COOKIE_MAX_AGE, state.cookie_secure);
    ([(SET_COOKIE, cookie)], Redirect::to(&redirect.url)).into_response()
}

/// GET /auth/token
/// Provider callback: exchanges the code and hands tokens to the client app
///
/// On success redirects to `{CLIENT_URL}/app#access_token=...&refresh_token=...`.
/// The state cookie is cleared whatever the outcome, since a state value is
/// good for one callback only.
pub async fn token_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let expected_state = read_cookie(&headers, STATE_COOKIE);
    let clear_state = [(SET_COOKIE, state_cookie("", 0, state.cookie_secure))];

    match state.auth.login(&params, expected_state.as_deref()).await {
        Ok(outcome) => {
            let url = format!(
                "{}/app#access_token={}&refresh_token={}",
                state.client_url,
                urlencoding::encode(&outcome.tokens.access_token),
                urlencoding::encode(&outcome.tokens.refresh_token),
            );
            (clear_state, Redirect::to(&url)).into_response()
        }
        Err(e) => {
            warn!(reason = e.kind(), retryable = e.is_retryable(), error = %e, "Login callback failed");
            (clear_state, ApiError::from(e)).into_response()
        }
    }
}

/// GET /auth/user
/// Returns the user behind the bearer access token
///
/// # Response
/// ```json
/// { "user": { "subject": "...", "email": "...", ... } }
/// ```
pub async fn user_handler(AuthedUser(user): AuthedUser) -> Json<UserResponse> {
    Json(UserResponse { user })
}

/// POST /auth/refresh
/// Mints a new access token from a refresh token
///
/// # Request Body
/// ```json
/// { "refresh_token": "<refresh token>" }
/// ```
/// A bare JSON string is accepted as well.
pub async fn refresh_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AccessGrant>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest {
        code: "INVALID_REQUEST",
        message: rejection.body_text(),
    })?;

    let grant = state.auth.refresh(&request.into_token()).await?;
    Ok(Json(grant))
}
