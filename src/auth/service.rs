//! Login, bearer verification and refresh orchestration

use chrono::Duration;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::models::{AccessGrant, CallbackParams, TokenKind, TokenPair, User};
use super::oauth::{LoginRedirect, OAuthExchanger};
use super::store::IdentityStore;
use super::tokens::TokenCodec;
use crate::common::safe_email_log;

const TOKEN_TYPE: &str = "bearer";

/// Lifetimes and deadlines applied by [`AuthService`]
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Callback URL registered with the provider
    pub redirect_uri: String,
    pub provider_timeout: std::time::Duration,
    pub store_timeout: std::time::Duration,
}

/// Result of a completed login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

/// The authentication protocol.
///
/// Holds no per-request state; every operation can run concurrently with any
/// other. Nothing is retried here, so a single-use authorization code is never
/// replayed against the provider.
pub struct AuthService {
    codec: TokenCodec,
    store: Arc<dyn IdentityStore>,
    exchanger: Arc<dyn OAuthExchanger>,
    policy: SessionPolicy,
}

impl AuthService {
    pub fn new(
        codec: TokenCodec,
        store: Arc<dyn IdentityStore>,
        exchanger: Arc<dyn OAuthExchanger>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            codec,
            store,
            exchanger,
            policy,
        }
    }

    pub fn start_login(&self) -> LoginRedirect {
        self.exchanger.start_login(&self.policy.redirect_uri)
    }

    /// Provider callback → user upsert → fresh access and refresh tokens.
    pub async fn login(
        &self,
        params: &CallbackParams,
        expected_state: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        let claims = tokio::time::timeout(
            self.policy.provider_timeout,
            self.exchanger.complete_login(params, expected_state),
        )
        .await
        .map_err(|_| {
            warn!("Identity provider exchange timed out");
            AuthError::ProviderUnavailable("provider exchange timed out".to_string())
        })??;

        let user = self.with_store_deadline(self.store.upsert(&claims)).await?;

        let tokens = TokenPair {
            access_token: self.mint(&user.subject, TokenKind::Access)?,
            refresh_token: self.mint(&user.subject, TokenKind::Refresh)?,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: self.policy.access_ttl.num_seconds(),
        };

        info!(
            subject = %user.subject,
            email = %user.email.as_deref().map(safe_email_log).unwrap_or_default(),
            "User login successful"
        );

        Ok(LoginOutcome { user, tokens })
    }

    /// Resolve the user behind a bearer access token.
    pub async fn verify(&self, bearer: Option<&str>) -> Result<User, AuthError> {
        let token = match bearer.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthError::Unauthenticated),
        };

        let subject = self.codec.verify(token, TokenKind::Access).map_err(|e| {
            warn!(reason = e.kind(), "Access token rejected");
            e
        })?;

        let user = self.with_store_deadline(self.store.find(&subject)).await?;
        debug!(subject = %user.subject, "Access token verified");
        Ok(user)
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The refresh token itself is never renewed, so its window is fixed at
    /// login time.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(AuthError::Unauthenticated);
        }

        let subject = self
            .codec
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                warn!(reason = e.kind(), "Refresh token rejected");
                e
            })?;

        let user = self.with_store_deadline(self.store.find(&subject)).await?;
        let access_token = self.mint(&user.subject, TokenKind::Access)?;

        info!(subject = %user.subject, "Access token refreshed");

        Ok(AccessGrant {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: self.policy.access_ttl.num_seconds(),
        })
    }

    fn mint(&self, subject: &str, kind: TokenKind) -> Result<String, AuthError> {
        let ttl = match kind {
            TokenKind::Access => self.policy.access_ttl,
            TokenKind::Refresh => self.policy.refresh_ttl,
        };
        self.codec.mint(subject, kind, ttl)
    }

    async fn with_store_deadline<T, F>(&self, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        tokio::time::timeout(self.policy.store_timeout, fut)
            .await
            .map_err(|_| {
                warn!("Identity store call timed out");
                AuthError::StoreUnavailable("store call timed out".to_string())
            })?
    }
}
