/// Hashing and encoding primitives
///
/// Everything the token engine, the credential store and the URL service
/// need to turn bytes into wire-safe strings.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

use crate::error::TokenError;

const BASE32_DIGITS: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Lowercase hex SHA-256 digest of `input`.
///
/// Used for token signatures, stored password hashes (`email + password`)
/// and session fingerprints (`refresh token string`).
pub fn short_hash(input: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_ref());
    format!("{:x}", hasher.finalize())
}

/// Standard base64 (with padding).
pub fn base64_encode(input: impl AsRef<[u8]>) -> String {
    general_purpose::STANDARD.encode(input)
}

/// Strict standard base64 decode into a UTF-8 string.
///
/// # Errors
/// `TokenError::Decode` on a foreign alphabet, wrong padding or a result
/// that is not valid UTF-8.
pub fn base64_decode(input: impl AsRef<[u8]>) -> Result<String, TokenError> {
    let bytes = general_purpose::STANDARD
        .decode(input)
        .map_err(|e| TokenError::Decode(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| TokenError::Decode(e.to_string()))
}

/// Radix-32 rendering of an integer id (`0-9a-v`), used as the short code
/// of a stored URL.
pub fn to_base32(value: i64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut n = value.unsigned_abs();
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE32_DIGITS[(n % 32) as usize]);
        n /= 32;
    }
    if value < 0 {
        digits.push(b'-');
    }
    digits.reverse();

    digits.into_iter().map(char::from).collect()
}
