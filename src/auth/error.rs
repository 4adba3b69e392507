//! Authentication error taxonomy

use thiserror::Error;

/// Every way login, verification or refresh can fail.
///
/// Variants are kept distinct all the way to the HTTP boundary so clients can
/// tell an expired token (refresh and retry) from a forged one (re-login).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("provider rejected the authorization: {0}")]
    ProviderRejected(String),

    #[error("identity assertion invalid: {0}")]
    ClaimsInvalid(String),

    #[error("concurrent creation of subject {0}")]
    DuplicateSubject(String),

    #[error("token has expired")]
    ExpiredToken,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token kind mismatch: expected {expected}, got {actual}")]
    KindMismatch { expected: String, actual: String },

    #[error("token is malformed")]
    Malformed,

    #[error("no authentication token provided")]
    Unauthenticated,

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("identity store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable label used in logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::ProviderRejected(_) => "OAUTH_ERROR",
            AuthError::ClaimsInvalid(_) => "CLAIMS_INVALID",
            AuthError::DuplicateSubject(_) => "DUPLICATE_SUBJECT",
            AuthError::ExpiredToken => "TOKEN_EXPIRED",
            AuthError::BadSignature => "BAD_SIGNATURE",
            AuthError::KindMismatch { .. } => "TOKEN_KIND_MISMATCH",
            AuthError::Malformed => "MALFORMED_TOKEN",
            AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::UserNotFound(_) => "USER_NOT_FOUND",
            AuthError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            AuthError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AuthError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::ProviderUnavailable(_)
                | AuthError::StoreUnavailable(_)
                | AuthError::DuplicateSubject(_)
        )
    }
}
