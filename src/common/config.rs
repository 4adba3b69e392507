// src/common/config.rs
//! Gateway configuration loaded from environment variables

use anyhow::{bail, Context};
use axum::http::{HeaderValue, Uri};
use chrono::Duration;
use std::env;

use crate::auth::oauth::OAuthProviderConfig;
use crate::auth::service::SessionPolicy;
use crate::auth::tokens::{SigningKey, SigningKeys};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub database_url: String,
    pub port: u16,
    pub signing_keys: SigningKeys,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Base URL of the client application tokens are handed to
    pub client_url: String,
    pub provider: OAuthProviderConfig,
    pub store_timeout: std::time::Duration,
    pub cookie_secure: bool,
    pub cors_origins: Vec<String>,
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key/value source; `from_env` uses the process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 bytes");
        }
        let mut signing_keys =
            SigningKeys::new(SigningKey::new(get_or("JWT_KEY_ID", "v1"), jwt_secret));
        let previous = get_or("JWT_PREVIOUS_KEYS", "");
        for entry in previous.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (kid, secret) = entry
                .split_once(':')
                .context("JWT_PREVIOUS_KEYS entries must be kid:secret")?;
            signing_keys = signing_keys.with_previous(SigningKey::new(kid, secret));
        }

        let client_id = get("GOOGLE_CLIENT_ID").context("GOOGLE_CLIENT_ID must be set")?;
        let client_secret =
            get("GOOGLE_CLIENT_SECRET").context("GOOGLE_CLIENT_SECRET must be set")?;
        let redirect_uri = get_or("GOOGLE_OAUTH_REDIRECT_URI", "http://localhost:8080/auth/token");

        let mut provider = OAuthProviderConfig::google(client_id, client_secret, redirect_uri);
        if let Some(url) = get("OAUTH_AUTHORIZE_URL") {
            provider.authorize_url = url;
        }
        redirect_base(&provider.authorize_url, "OAUTH_AUTHORIZE_URL")?;
        if let Some(url) = get("OAUTH_TOKEN_URL") {
            provider.token_url = url;
        }
        if let Some(url) = get("OAUTH_JWKS_URL") {
            provider.jwks_url = url;
        }
        provider.timeout = std::time::Duration::from_secs(parse_num(
            &get_or("PROVIDER_TIMEOUT_SECS", "10"),
            "PROVIDER_TIMEOUT_SECS",
        )?);
        provider.jwks_ttl = std::time::Duration::from_secs(parse_num(
            &get_or("OAUTH_JWKS_CACHE_SECS", "3600"),
            "OAUTH_JWKS_CACHE_SECS",
        )?);

        let client_url = get_or("CLIENT_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();
        redirect_base(&client_url, "CLIENT_URL")?;

        Ok(Self {
            database_url: get_or("DATABASE_URL", "sqlite://auth_gateway.db"),
            port: parse_num(&get_or("PORT", "8080"), "PORT")?,
            signing_keys,
            access_ttl: Duration::minutes(parse_num(
                &get_or("ACCESS_TOKEN_TTL_MINUTES", "15"),
                "ACCESS_TOKEN_TTL_MINUTES",
            )?),
            refresh_ttl: Duration::days(parse_num(
                &get_or("REFRESH_TOKEN_TTL_DAYS", "7"),
                "REFRESH_TOKEN_TTL_DAYS",
            )?),
            client_url,
            provider,
            store_timeout: std::time::Duration::from_secs(parse_num(
                &get_or("STORE_TIMEOUT_SECS", "5"),
                "STORE_TIMEOUT_SECS",
            )?),
            cookie_secure: get_or("COOKIE_SECURE", "false").to_lowercase() == "true",
            cors_origins: get_or("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        })
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
            redirect_uri: self.provider.redirect_uri.clone(),
            provider_timeout: self.provider.timeout,
            store_timeout: self.store_timeout,
        }
    }
}

/// Browsers are redirected to URLs built on `url`, so it must be absolute and
/// usable as a `Location` header.
fn redirect_base(url: &str, key: &str) -> anyhow::Result<()> {
    let uri: Uri = url
        .parse()
        .with_context(|| format!("{} is not a valid URL", key))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        bail!("{} must be an absolute URL with scheme and host", key);
    }
    HeaderValue::from_str(url).with_context(|| format!("{} cannot be used in a redirect", key))?;
    Ok(())
}

fn parse_num<T: std::str::FromStr>(raw: &str, key: &str) -> anyhow::Result<T> {
    match raw.trim().parse::<T>() {
        Ok(v) => Ok(v),
        Err(_) => bail!("{} must be a number, got '{}'", key, raw),
    }
}
