//! # Credential Digesting
//!
//! RT-CV never receives the raw API key. The server compares against the
//! SHA-512 digest of the key, hex encoded, so the algorithm here is fixed by
//! the server's auth check.

use sha2::{Digest, Sha512};

/// Returns the lowercase hex SHA-512 digest of an API key.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Builds the value of the `Authorization` header: `Basic {key_id}:{digest}`.
pub fn authorization_value(api_key_id: &str, api_key: &str) -> String {
    format!("Basic {}:{}", api_key_id, hash_api_key(api_key))
}
