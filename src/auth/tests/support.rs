//! Shared fixtures: codec, in-memory store, scripted provider

use async_trait::async_trait;
use chrono::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::auth::error::AuthError;
use crate::auth::models::{CallbackParams, ExternalIdentityClaims};
use crate::auth::oauth::{LoginRedirect, OAuthExchanger};
use crate::auth::service::{AuthService, SessionPolicy};
use crate::auth::store::{IdentityStore, SqliteIdentityStore};
use crate::auth::tokens::{SigningKey, SigningKeys, TokenCodec};
use crate::common::migrations::run_migrations;

pub const TEST_SECRET: &str = "test-signing-secret-0123456789abcdef";
pub const FAKE_STATE: &str = "fixed-test-state";

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(SigningKeys::new(SigningKey::new("v1", TEST_SECRET)))
}

pub fn test_policy() -> SessionPolicy {
    SessionPolicy {
        access_ttl: Duration::minutes(15),
        refresh_ttl: Duration::days(7),
        redirect_uri: "http://gateway.test/auth/token".to_string(),
        provider_timeout: std::time::Duration::from_secs(5),
        store_timeout: std::time::Duration::from_secs(5),
    }
}

/// Single-connection pool so every query sees the same in-memory database
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").expect("sqlite options");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}

pub async fn count_users(pool: &SqlitePool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .expect("count users");
    count
}

pub fn identity(subject: &str, email: Option<&str>) -> ExternalIdentityClaims {
    ExternalIdentityClaims {
        subject: subject.to_string(),
        email: email.map(str::to_string),
        display_name: Some("Test User".to_string()),
        picture_url: Some("https://example.com/avatar.png".to_string()),
    }
}

pub fn callback(code: &str) -> CallbackParams {
    CallbackParams {
        code: Some(code.to_string()),
        state: Some(FAKE_STATE.to_string()),
        ..Default::default()
    }
}

/// What the scripted provider answers with
#[derive(Clone)]
pub enum FakeOutcome {
    Identity(ExternalIdentityClaims),
    Reject(String),
    InvalidClaims,
    Unavailable,
    Hang,
}

/// Provider stand-in that enforces the state check and counts exchanges
pub struct FakeExchanger {
    outcome: std::sync::Mutex<FakeOutcome>,
    exchanges: AtomicUsize,
}

impl FakeExchanger {
    pub fn new(outcome: FakeOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome: std::sync::Mutex::new(outcome),
            exchanges: AtomicUsize::new(0),
        })
    }

    pub fn set_outcome(&self, outcome: FakeOutcome) {
        *self.outcome.lock().expect("outcome lock") = outcome;
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthExchanger for FakeExchanger {
    fn start_login(&self, redirect_uri: &str) -> LoginRedirect {
        LoginRedirect {
            url: format!(
                "https://provider.test/authorize?redirect_uri={}&state={}",
                urlencoding::encode(redirect_uri),
                FAKE_STATE
            ),
            state: FAKE_STATE.to_string(),
        }
    }

    async fn complete_login(
        &self,
        params: &CallbackParams,
        expected_state: Option<&str>,
    ) -> Result<ExternalIdentityClaims, AuthError> {
        if expected_state.is_none() || params.state.as_deref() != expected_state {
            return Err(AuthError::ProviderRejected("state mismatch".to_string()));
        }
        self.exchanges.fetch_add(1, Ordering::SeqCst);

        let outcome = self.outcome.lock().expect("outcome lock").clone();
        match outcome {
            FakeOutcome::Identity(claims) => Ok(claims),
            FakeOutcome::Reject(reason) => Err(AuthError::ProviderRejected(reason)),
            FakeOutcome::InvalidClaims => {
                Err(AuthError::ClaimsInvalid("audience mismatch".to_string()))
            }
            FakeOutcome::Unavailable => {
                Err(AuthError::ProviderUnavailable("connection refused".to_string()))
            }
            FakeOutcome::Hang => {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                Err(AuthError::ProviderUnavailable("unreachable".to_string()))
            }
        }
    }
}

/// Store that never answers in time
pub struct StalledStore;

#[async_trait]
impl IdentityStore for StalledStore {
    async fn upsert(&self, _claims: &ExternalIdentityClaims) -> Result<crate::auth::User, AuthError> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Err(AuthError::StoreUnavailable("stalled".to_string()))
    }

    async fn find(&self, _subject: &str) -> Result<crate::auth::User, AuthError> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Err(AuthError::StoreUnavailable("stalled".to_string()))
    }
}

pub fn service_with(
    pool: SqlitePool,
    exchanger: Arc<FakeExchanger>,
    policy: SessionPolicy,
) -> AuthService {
    AuthService::new(
        test_codec(),
        Arc::new(SqliteIdentityStore::new(pool)),
        exchanger,
        policy,
    )
}
