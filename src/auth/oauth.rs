//! OAuth2 authorization-code exchange against the identity provider

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::error::AuthError;
use super::models::{CallbackParams, ExternalIdentityClaims};
use crate::common::generate_state_token;

/// Where to send the browser to start a login, plus the anti-forgery state
/// the request layer must carry across the redirect.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub url: String,
    pub state: String,
}

/// Drives the provider half of a login.
#[async_trait]
pub trait OAuthExchanger: Send + Sync {
    /// Build the authorization URL with a fresh state value.
    fn start_login(&self, redirect_uri: &str) -> LoginRedirect;

    /// Exchange the callback's authorization code for verified identity claims.
    ///
    /// The code is presented to the provider at most once; callers must never
    /// retry after a rejection.
    async fn complete_login(
        &self,
        params: &CallbackParams,
        expected_state: Option<&str>,
    ) -> Result<ExternalIdentityClaims, AuthError>;
}

/// Provider client settings. Defaults point at Google.
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub jwks_url: String,
    pub issuers: Vec<String>,
    pub scopes: Vec<String>,
    pub timeout: Duration,
    /// How long a fetched key set is trusted before it is fetched again
    pub jwks_ttl: Duration,
}

impl OAuthProviderConfig {
    pub fn google(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            jwks_url: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
            issuers: vec![
                "https://accounts.google.com".to_string(),
                "accounts.google.com".to_string(),
            ],
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
            timeout: Duration::from_secs(10),
            jwks_ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

impl JwkSet {
    /// RSA key named by `kid`, or any RSA key when the token names none
    fn rsa_key(&self, kid: Option<&str>) -> Option<&Jwk> {
        self.keys
            .iter()
            .filter(|k| k.kty == "RSA")
            .find(|k| kid.is_none() || k.kid.as_deref() == kid)
    }
}

#[derive(Debug, Clone)]
struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// OIDC id_token payload; only the fields we map onto a user.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    config: OAuthProviderConfig,
    client: Client,
    jwks: Arc<RwLock<Option<CachedJwks>>>,
}

impl GoogleOAuth {
    pub fn new(config: OAuthProviderConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            config,
            client,
            jwks: Arc::new(RwLock::new(None)),
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for provider tokens");

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %self.config.token_url, "HTTP error contacting token endpoint");
                AuthError::ProviderUnavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_server_error() {
            warn!(http_status = %status, "Token endpoint returned server error");
            return Err(AuthError::ProviderUnavailable(format!("token endpoint returned {status}")));
        }
        if !status.is_success() {
            let reason = match response.json::<OAuthErrorBody>().await {
                Ok(body) => match body.error_description {
                    Some(desc) => format!("{}: {}", body.error, desc),
                    None => body.error,
                },
                Err(_) => format!("token endpoint returned {status}"),
            };
            warn!(http_status = %status, reason = %reason, "Provider rejected authorization code");
            return Err(AuthError::ProviderRejected(reason));
        }

        let body = response.json::<TokenResponse>().await.map_err(|e| {
            error!(error = %e, "Failed to parse token endpoint response");
            AuthError::ClaimsInvalid("unreadable token response".to_string())
        })?;

        body.id_token
            .ok_or_else(|| AuthError::ClaimsInvalid("token response has no id_token".to_string()))
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.config.jwks_url)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %self.config.jwks_url, "HTTP error fetching provider keys");
                AuthError::ProviderUnavailable(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(AuthError::ProviderUnavailable(format!(
                "key endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("unreadable key set: {e}")))
    }

    /// Signing key for `kid`, from the cached key set while it is fresh.
    ///
    /// An unknown `kid` forces a refetch since the provider may have rotated.
    /// When the key endpoint is down, a stale cached key is still used.
    async fn provider_key(&self, kid: Option<&str>) -> Result<Jwk, AuthError> {
        let cached = self.jwks.read().await.clone();
        if let Some(cache) = &cached {
            if cache.fetched_at.elapsed() < self.config.jwks_ttl {
                if let Some(jwk) = cache.keys.rsa_key(kid) {
                    return Ok(jwk.clone());
                }
            }
        }

        match self.fetch_jwks().await {
            Ok(keys) => {
                let jwk = keys.rsa_key(kid).cloned();
                *self.jwks.write().await = Some(CachedJwks {
                    keys,
                    fetched_at: Instant::now(),
                });
                jwk.ok_or_else(|| AuthError::ClaimsInvalid("id_token signed with unknown key".to_string()))
            }
            Err(e) => match cached.as_ref().and_then(|c| c.keys.rsa_key(kid)) {
                Some(jwk) => {
                    warn!(error = %e, "Provider key endpoint failed, using cached keys");
                    Ok(jwk.clone())
                }
                None => Err(e),
            },
        }
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<ExternalIdentityClaims, AuthError> {
        let header = decode_header(id_token)
            .map_err(|e| AuthError::ClaimsInvalid(format!("unreadable id_token header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::ClaimsInvalid(format!(
                "unexpected id_token algorithm {:?}",
                header.alg
            )));
        }

        let jwk = self.provider_key(header.kid.as_deref()).await?;
        let (n, e) = match (&jwk.n, &jwk.e) {
            (Some(n), Some(e)) => (n, e),
            _ => return Err(AuthError::ClaimsInvalid("provider key lacks RSA components".to_string())),
        };
        let key = DecodingKey::from_rsa_components(n, e)
            .map_err(|e| AuthError::ClaimsInvalid(format!("bad provider key: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.config.client_id.as_str()]);
        validation.set_issuer(self.config.issuers.as_slice());

        let claims = decode::<IdTokenClaims>(id_token, &key, &validation)
            .map_err(|e| {
                warn!(error = %e, "id_token verification failed");
                AuthError::ClaimsInvalid(e.to_string())
            })?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::ClaimsInvalid("id_token has empty subject".to_string()));
        }

        Ok(ExternalIdentityClaims {
            subject: claims.sub,
            email: claims.email,
            display_name: claims.name,
            picture_url: claims.picture,
        })
    }
}

#[async_trait]
impl OAuthExchanger for GoogleOAuth {
    fn start_login(&self, redirect_uri: &str) -> LoginRedirect {
        let state = generate_state_token();
        let url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.config.authorize_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&self.config.scopes.join(" ")),
            urlencoding::encode(&state),
        );
        debug!(redirect_uri = %redirect_uri, "Generated provider authorization URL");
        LoginRedirect { url, state }
    }

    async fn complete_login(
        &self,
        params: &CallbackParams,
        expected_state: Option<&str>,
    ) -> Result<ExternalIdentityClaims, AuthError> {
        if let Some(err) = &params.error {
            let reason = match &params.error_description {
                Some(desc) => format!("{err}: {desc}"),
                None => err.clone(),
            };
            warn!(oauth_error = %reason, "Provider returned error on callback");
            return Err(AuthError::ProviderRejected(reason));
        }

        match (expected_state, params.state.as_deref()) {
            (Some(expected), Some(returned)) if expected == returned => {}
            (None, _) => {
                warn!("Callback without a pending login state");
                return Err(AuthError::ProviderRejected("missing login state".to_string()));
            }
            _ => {
                warn!("Callback state does not match the pending login");
                return Err(AuthError::ProviderRejected("state mismatch".to_string()));
            }
        }

        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::ProviderRejected("no authorization code provided".to_string()))?;

        let id_token = self.exchange_code(code).await?;
        let claims = self.verify_id_token(&id_token).await?;

        info!(subject = %claims.subject, "Provider identity verified");
        Ok(claims)
    }
}
