//! Callback token derivation
//!
//! Telegram caps `callback_data` at 64 bytes, and feed item ids are URLs that
//! routinely blow past that. Buttons therefore carry a short opaque token
//! instead of the candidate id; the store maps tokens back to ids on the way
//! in.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of a callback token in hex characters.
pub const TOKEN_LEN: usize = 16;

/// Deterministic token for a candidate id. Ids are compared
/// case-insensitively, so the digest runs over the lower-cased id.
pub fn derive(candidate_id: &str) -> String {
    digest_prefix(candidate_id.to_lowercase().as_bytes())
}

/// Fallback token for the (pathological) case where two distinct ids collide
/// on their digest prefix.
pub fn derive_salted(candidate_id: &str, salt: &Uuid) -> String {
    let salted = format!("{}:{}", candidate_id.to_lowercase(), salt);
    digest_prefix(salted.as_bytes())
}

fn digest_prefix(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    let digest = hasher.finalize();

    let mut token = hex::encode(digest);
    token.truncate(TOKEN_LEN);
    token
}
