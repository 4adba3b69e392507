// src/common/ids.rs
//! Random identifiers: correlation ids for error reports and OAuth state values

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{Rng, RngCore};

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Bytes of entropy in an OAuth state value
const STATE_BYTES: usize = 32;

fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CROCKFORD_ALPHABET[rng.gen_range(0..32)] as char)
        .collect()
}

/// Correlation id handed to clients in place of internal error details.
///
/// Short and unambiguous so it can be read out over a support call, e.g.
/// `ERR_K7NP3XY2QM`.
pub fn generate_correlation_id() -> String {
    format!("ERR_{}", generate_crockford_string(10))
}

/// Fresh anti-forgery state for one authorization redirect (base64url, 256 bits)
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
