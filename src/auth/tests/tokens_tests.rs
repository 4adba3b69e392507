use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use pretty_assertions::assert_eq;

use super::support::{test_codec, TEST_SECRET};
use crate::auth::error::AuthError;
use crate::auth::models::{SessionClaims, TokenKind};
use crate::auth::tokens::{SigningKey, SigningKeys, TokenCodec};

fn hand_signed(header: Header, secret: &str, kind: TokenKind) -> String {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: "u123".to_string(),
        kind,
        iat: now,
        exp: now + 600,
        jti: "jti-1".to_string(),
    };
    encode(&header, &claims, &EncodingKey::from_secret(secret.as_bytes())).expect("encode")
}

#[test]
fn test_mint_then_verify_both_kinds() {
    let codec = test_codec();
    for kind in [TokenKind::Access, TokenKind::Refresh] {
        let token = codec.mint("u123", kind, Duration::minutes(5)).expect("mint");
        assert_eq!(codec.verify(&token, kind).expect("verify"), "u123");
    }
}

#[test]
fn test_tokens_are_unique_per_mint() {
    let codec = test_codec();
    let a = codec.mint("u123", TokenKind::Access, Duration::minutes(5)).expect("mint");
    let b = codec.mint("u123", TokenKind::Access, Duration::minutes(5)).expect("mint");
    assert_ne!(a, b);
}

#[test]
fn test_expired_after_ttl_elapses() {
    let codec = test_codec();
    let ttl = Duration::minutes(10);

    // ttl elapsed a second ago
    let stale = codec
        .mint_at("u123", TokenKind::Access, ttl, Utc::now() - ttl - Duration::seconds(1))
        .expect("mint");
    assert!(matches!(codec.verify(&stale, TokenKind::Access), Err(AuthError::ExpiredToken)));

    // still inside the window
    let fresh = codec
        .mint_at("u123", TokenKind::Access, ttl, Utc::now() - ttl + Duration::seconds(30))
        .expect("mint");
    assert!(codec.verify(&fresh, TokenKind::Access).is_ok());
}

#[test]
fn test_kind_mismatch_both_directions() {
    let codec = test_codec();
    let access = codec.mint("u123", TokenKind::Access, Duration::minutes(5)).expect("mint");
    let refresh = codec.mint("u123", TokenKind::Refresh, Duration::days(1)).expect("mint");

    match codec.verify(&access, TokenKind::Refresh) {
        Err(AuthError::KindMismatch { expected, actual }) => {
            assert_eq!(expected, "refresh");
            assert_eq!(actual, "access");
        }
        other => panic!("expected KindMismatch, got {:?}", other),
    }
    assert!(matches!(
        codec.verify(&refresh, TokenKind::Access),
        Err(AuthError::KindMismatch { .. })
    ));
}

#[test]
fn test_any_tampered_byte_is_bad_signature() {
    let codec = test_codec();
    let token = codec.mint("u123", TokenKind::Access, Duration::minutes(5)).expect("mint");

    for (i, c) in token.char_indices() {
        // every byte, segment separators included
        let replacement = if c == 'A' { 'B' } else { 'A' };
        let mut tampered = token.clone();
        tampered.replace_range(i..i + 1, &replacement.to_string());

        match codec.verify(&tampered, TokenKind::Access) {
            Err(AuthError::BadSignature) => {}
            other => panic!("byte {} {:?} -> {:?}: expected BadSignature, got {:?}", i, c, replacement, other),
        }
    }
}

#[test]
fn test_injected_separator_is_bad_signature() {
    let codec = test_codec();
    let token = codec.mint("u123", TokenKind::Access, Duration::minutes(5)).expect("mint");

    for (i, c) in token.char_indices().filter(|(_, c)| *c != '.') {
        let mut tampered = token.clone();
        tampered.replace_range(i..i + 1, ".");

        match codec.verify(&tampered, TokenKind::Access) {
            Err(AuthError::BadSignature) => {}
            other => panic!("byte {} {:?} -> '.': expected BadSignature, got {:?}", i, c, other),
        }
    }
}

#[test]
fn test_dropped_or_extra_segments_are_bad_signature() {
    let codec = test_codec();
    let token = codec.mint("u123", TokenKind::Access, Duration::minutes(5)).expect("mint");
    let (signed, _) = token.rsplit_once('.').expect("three segments");

    for altered in [
        signed.to_string(),
        format!("{}.", signed),
        format!("{}.extra", token),
        token.replacen('.', "", 1),
    ] {
        assert!(
            matches!(codec.verify(&altered, TokenKind::Access), Err(AuthError::BadSignature)),
            "{:?} should fail the signature check",
            altered
        );
    }
}

#[test]
fn test_wrong_secret_is_bad_signature() {
    let token = test_codec()
        .mint("u123", TokenKind::Access, Duration::minutes(5))
        .expect("mint");
    let other = TokenCodec::new(SigningKeys::new(SigningKey::new("v1", "another-secret-entirely-0123456789")));
    assert!(matches!(other.verify(&token, TokenKind::Access), Err(AuthError::BadSignature)));
}

#[test]
fn test_undotted_input_is_malformed() {
    let codec = test_codec();
    for garbage in ["", "not-a-token", "eyJhbGciOiJIUzI1NiJ9"] {
        assert!(
            matches!(codec.verify(garbage, TokenKind::Access), Err(AuthError::Malformed)),
            "{:?} should be malformed",
            garbage
        );
    }
}

#[test]
fn test_dotted_garbage_is_bad_signature() {
    let codec = test_codec();
    for garbage in ["a.b", "a.b.c", "a.b.c.d", "a..c", ".b.c", "..", "."] {
        assert!(
            matches!(codec.verify(garbage, TokenKind::Access), Err(AuthError::BadSignature)),
            "{:?} should fail the signature check",
            garbage
        );
    }
}

#[test]
fn test_other_algorithm_is_rejected() {
    let codec = test_codec();
    let token = hand_signed(Header::new(Algorithm::HS512), TEST_SECRET, TokenKind::Access);
    assert!(matches!(codec.verify(&token, TokenKind::Access), Err(AuthError::BadSignature)));
}

#[test]
fn test_token_without_kid_checked_against_current_key() {
    let codec = test_codec();
    let token = hand_signed(Header::new(Algorithm::HS256), TEST_SECRET, TokenKind::Access);
    assert_eq!(codec.verify(&token, TokenKind::Access).expect("verify"), "u123");
}

#[test]
fn test_rotation_accepts_previous_key() {
    let old = TokenCodec::new(SigningKeys::new(SigningKey::new("v1", TEST_SECRET)));
    let rotated = TokenCodec::new(
        SigningKeys::new(SigningKey::new("v2", "rotated-secret-0123456789abcdef0123"))
            .with_previous(SigningKey::new("v1", TEST_SECRET)),
    );
    let token = old.mint("u123", TokenKind::Refresh, Duration::days(1)).expect("mint");
    assert_eq!(rotated.verify(&token, TokenKind::Refresh).expect("verify"), "u123");

    // new tokens are signed with the new key, which the old codec does not know
    let fresh = rotated.mint("u123", TokenKind::Access, Duration::minutes(5)).expect("mint");
    assert!(matches!(old.verify(&fresh, TokenKind::Access), Err(AuthError::BadSignature)));
}

#[test]
fn test_retired_key_is_rejected() {
    let old = TokenCodec::new(SigningKeys::new(SigningKey::new("v1", TEST_SECRET)));
    let rotated = TokenCodec::new(SigningKeys::new(SigningKey::new(
        "v2",
        "rotated-secret-0123456789abcdef0123",
    )));
    let token = old.mint("u123", TokenKind::Access, Duration::minutes(5)).expect("mint");
    assert!(matches!(rotated.verify(&token, TokenKind::Access), Err(AuthError::BadSignature)));
}

#[test]
fn test_signing_key_debug_hides_secret() {
    let rendered = format!("{:?}", SigningKey::new("v1", TEST_SECRET));
    assert!(rendered.contains("v1"));
    assert!(!rendered.contains(TEST_SECRET));
}
