//! Session token minting and verification
//!
//! Access and refresh tokens are HS256 JWTs sharing one claim layout
//! ([`SessionClaims`]); the `kind` claim keeps one from being accepted where the
//! other is expected. Every instance serving the same users must be built
//! from the same [`SigningKeys`].

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use std::fmt;
use uuid::Uuid;

use super::error::AuthError;
use super::models::{SessionClaims, TokenKind};

/// One HMAC secret and the `kid` it is published under
#[derive(Clone)]
pub struct SigningKey {
    pub kid: String,
    secret: Vec<u8>,
}

impl SigningKey {
    pub fn new(kid: impl Into<String>, secret: impl AsRef<[u8]>) -> Self {
        Self {
            kid: kid.into(),
            secret: secret.as_ref().to_vec(),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("secret", &"***")
            .finish()
    }
}

/// The current signing key plus retired keys still accepted for verification.
///
/// Rotating a secret means publishing a new current key and moving the old one
/// to `previous` until every token it signed has expired.
#[derive(Clone, Debug)]
pub struct SigningKeys {
    current: SigningKey,
    previous: Vec<SigningKey>,
}

impl SigningKeys {
    pub fn new(current: SigningKey) -> Self {
        Self {
            current,
            previous: Vec::new(),
        }
    }

    pub fn with_previous(mut self, key: SigningKey) -> Self {
        self.previous.push(key);
        self
    }

    pub fn current_kid(&self) -> &str {
        &self.current.kid
    }

    fn lookup(&self, kid: Option<&str>) -> Option<&SigningKey> {
        match kid {
            None => Some(&self.current),
            Some(kid) => std::iter::once(&self.current)
                .chain(self.previous.iter())
                .find(|k| k.kid == kid),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TokenCodec {
    keys: SigningKeys,
}

impl TokenCodec {
    pub fn new(keys: SigningKeys) -> Self {
        Self { keys }
    }

    /// Mint a signed token for `subject` valid for `ttl` from now.
    pub fn mint(&self, subject: &str, kind: TokenKind, ttl: Duration) -> Result<String, AuthError> {
        self.mint_at(subject, kind, ttl, Utc::now())
    }

    pub(crate) fn mint_at(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: subject.to_string(),
            kind,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.keys.current.kid.clone());

        encode(
            &header,
            &claims,
            &EncodingKey::from_secret(&self.keys.current.secret),
        )
        .map_err(|e| AuthError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verify `token` was minted by us for `expected` and has not expired.
    ///
    /// Returns the subject only; callers re-resolve the user from the store.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<String, AuthError> {
        // Only input with no JWS shape at all is malformed. A dotted token
        // with the wrong segment layout has been altered in transit.
        if !token.contains('.') {
            return Err(AuthError::Malformed);
        }
        if !is_compact_jws(token) {
            return Err(AuthError::BadSignature);
        }

        // A header we cannot read is a header we cannot authenticate.
        let header = decode_header(token).map_err(|_| AuthError::BadSignature)?;
        if header.alg != Algorithm::HS256 {
            return Err(AuthError::BadSignature);
        }
        let key = self
            .keys
            .lookup(header.kid.as_deref())
            .ok_or(AuthError::BadSignature)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<SessionClaims>(token, &DecodingKey::from_secret(&key.secret), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::InvalidKeyFormat => AuthError::BadSignature,
                // signature already checked out, so the payload itself is unusable
                _ => AuthError::Malformed,
            })?;

        if data.claims.kind != expected {
            return Err(AuthError::KindMismatch {
                expected: expected.to_string(),
                actual: data.claims.kind.to_string(),
            });
        }

        Ok(data.claims.sub)
    }
}

fn is_compact_jws(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}
