// Error handling types for the API

use axum::{
    http::{header::WWW_AUTHENTICATE, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::ids::generate_correlation_id;
use crate::auth::AuthError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// 401 with a `WWW-Authenticate` challenge
    Unauthorized {
        code: &'static str,
        message: String,
        challenge: String,
    },
    BadRequest {
        code: &'static str,
        message: String,
    },
    BadGateway {
        code: &'static str,
        message: String,
    },
    ServiceUnavailable {
        code: &'static str,
        message: String,
    },
    /// Details stay in the logs; clients only get the correlation id
    InternalServer { correlation_id: String },
}

impl ApiError {
    /// Log `detail` under a fresh correlation id and hide it from the client.
    pub fn internal(detail: impl fmt::Display) -> Self {
        let correlation_id = generate_correlation_id();
        error!(correlation_id = %correlation_id, error = %detail, "Unhandled server error");
        ApiError::InternalServer { correlation_id }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalServer { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized { message, .. } => write!(f, "Unauthorized: {}", message),
            ApiError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
            ApiError::BadGateway { message, .. } => write!(f, "Bad Gateway: {}", message),
            ApiError::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {}", message)
            }
            ApiError::InternalServer { correlation_id } => {
                write!(f, "Internal Server Error (correlation id {})", correlation_id)
            }
        }
    }
}

fn invalid_token(code: &'static str, message: &str) -> ApiError {
    ApiError::Unauthorized {
        code,
        message: message.to_string(),
        challenge: format!(r#"Bearer error="invalid_token", error_description="{}""#, message),
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = err.kind();
        match err {
            AuthError::Unauthenticated => ApiError::Unauthorized {
                code,
                message: "No authentication token provided".to_string(),
                challenge: "Bearer".to_string(),
            },
            AuthError::ExpiredToken => invalid_token(code, "token has expired"),
            AuthError::BadSignature => invalid_token(code, "token signature is invalid"),
            AuthError::Malformed => invalid_token(code, "token is malformed"),
            AuthError::KindMismatch { .. } => invalid_token(code, "wrong token kind"),
            AuthError::UserNotFound(_) => invalid_token(code, "user not found"),
            AuthError::ProviderRejected(reason) => ApiError::BadRequest {
                code,
                message: format!("OAuth error: {}", reason),
            },
            AuthError::ClaimsInvalid(reason) => ApiError::BadGateway {
                code,
                message: format!("Failed to authenticate user: {}", reason),
            },
            AuthError::ProviderUnavailable(_) => ApiError::ServiceUnavailable {
                code,
                message: "identity provider unavailable, retry later".to_string(),
            },
            AuthError::StoreUnavailable(_) => ApiError::ServiceUnavailable {
                code,
                message: "identity store unavailable, retry later".to_string(),
            },
            AuthError::DuplicateSubject(_) => ApiError::ServiceUnavailable {
                code,
                message: "concurrent login in progress, retry".to_string(),
            },
            AuthError::Internal(detail) => ApiError::internal(detail),
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        match self {
            ApiError::Unauthorized {
                code,
                message,
                challenge,
            } => {
                let body = ErrorResponse {
                    error: message,
                    code: code.to_string(),
                    correlation_id: None,
                };
                (status, [(WWW_AUTHENTICATE, challenge)], Json(body)).into_response()
            }
            ApiError::BadRequest { code, message }
            | ApiError::BadGateway { code, message }
            | ApiError::ServiceUnavailable { code, message } => {
                let body = ErrorResponse {
                    error: message,
                    code: code.to_string(),
                    correlation_id: None,
                };
                (status, Json(body)).into_response()
            }
            ApiError::InternalServer { correlation_id } => {
                let body = ErrorResponse {
                    error: format!("Internal server error (correlation id {})", correlation_id),
                    code: "INTERNAL_SERVER_ERROR".to_string(),
                    correlation_id: Some(correlation_id),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
