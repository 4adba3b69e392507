//! User persistence keyed by external subject

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use super::error::AuthError;
use super::models::{ExternalIdentityClaims, User};
use crate::common::safe_email_log;

/// Persistence contract the authentication core needs.
///
/// Implementations must guarantee at most one [`User`] per subject, even when
/// several first logins for the same subject race each other.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create the user on first sight, otherwise refresh its profile fields.
    async fn upsert(&self, claims: &ExternalIdentityClaims) -> Result<User, AuthError>;

    /// Load the current stored profile for `subject`.
    async fn find(&self, subject: &str) -> Result<User, AuthError>;
}

const USER_COLUMNS: &str = "subject, email, display_name, picture_url, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct SqliteIdentityStore {
    db: SqlitePool,
}

impl SqliteIdentityStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Refresh the profile of an existing user; `None` when the subject is unknown.
    async fn update_profile(
        &self,
        claims: &ExternalIdentityClaims,
    ) -> Result<Option<User>, AuthError> {
        let sql = format!(
            r#"
            UPDATE users SET
                email = COALESCE(?, email),
                display_name = COALESCE(?, display_name),
                picture_url = COALESCE(?, picture_url),
                updated_at = ?
            WHERE subject = ?
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(claims.email.as_deref())
            .bind(claims.display_name.as_deref())
            .bind(claims.picture_url.as_deref())
            .bind(Utc::now())
            .bind(&claims.subject)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| store_error(e, &claims.subject))
    }

    async fn insert_user(&self, claims: &ExternalIdentityClaims) -> Result<User, AuthError> {
        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO users (subject, email, display_name, picture_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&claims.subject)
            .bind(claims.email.as_deref())
            .bind(claims.display_name.as_deref())
            .bind(claims.picture_url.as_deref())
            .bind(now)
            .bind(now)
            .fetch_one(&self.db)
            .await
            .map_err(|e| store_error(e, &claims.subject))
    }

    /// Create a user the update step did not find.
    ///
    /// A concurrent first login may have created the same subject since; the
    /// primary key then rejects this insert and the row is updated instead.
    pub(crate) async fn create_or_update(
        &self,
        claims: &ExternalIdentityClaims,
    ) -> Result<User, AuthError> {
        match self.insert_user(claims).await {
            Err(AuthError::DuplicateSubject(subject)) => {
                warn!(subject = %subject, "Concurrent user creation detected, retrying as update");
                self.update_profile(claims)
                    .await?
                    .ok_or(AuthError::UserNotFound(subject))
            }
            other => other,
        }
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn upsert(&self, claims: &ExternalIdentityClaims) -> Result<User, AuthError> {
        if let Some(user) = self.update_profile(claims).await? {
            debug!(subject = %user.subject, "Refreshed existing user profile");
            return Ok(user);
        }

        let user = self.create_or_update(claims).await?;
        if user.created_at == user.updated_at {
            info!(
                subject = %user.subject,
                email = %user.email.as_deref().map(safe_email_log).unwrap_or_default(),
                "Created new user"
            );
        }
        Ok(user)
    }

    async fn find(&self, subject: &str) -> Result<User, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE subject = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(subject)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| store_error(e, subject))?
            .ok_or_else(|| AuthError::UserNotFound(subject.to_string()))
    }
}

fn store_error(e: sqlx::Error, subject: &str) -> AuthError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AuthError::DuplicateSubject(subject.to_string())
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::WorkerCrashed => {
            warn!(error = %e, subject = %subject, "Identity store unavailable");
            AuthError::StoreUnavailable(e.to_string())
        }
        other => {
            error!(error = %other, subject = %subject, "Unexpected identity store error");
            AuthError::Internal(other.to_string())
        }
    }
}
