//! Authentication data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Stored user, keyed by the provider's stable subject identifier
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity claims extracted from a verified provider id_token.
///
/// Only ever used to populate or refresh a [`User`]; never persisted as is.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalIdentityClaims {
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub picture_url: Option<String>,
}

/// Purpose a session token was minted for
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims carried by both access and refresh tokens
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionClaims {
    pub sub: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Tokens issued by a successful login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Response body of `POST /auth/refresh`. Deliberately has no refresh token.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccessGrant {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Query parameters the provider appends to the callback redirect
#[derive(Deserialize, Debug, Default, Clone)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Refresh request body.
///
/// Accepts `{"refresh_token": "..."}` as well as a bare JSON string.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RefreshRequest {
    Wrapped { refresh_token: String },
    Bare(String),
}

impl RefreshRequest {
    pub fn into_token(self) -> String {
        match self {
            RefreshRequest::Wrapped { refresh_token } => refresh_token,
            RefreshRequest::Bare(token) => token,
        }
    }
}

/// Response body of `GET /auth/user`
#[derive(Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub user: User,
}
