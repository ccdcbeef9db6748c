//! # Request Integrity
//!
//! Every request sent over a session carries an integrity tag: an
//! HMAC-SHA256 over the raw payload, keyed with the secret bound to that
//! session. The receiver recomputes the tag with its copy of the secret.
//!
//! ## Security Properties
//!
//! - **Keyed Digest**: a mismatched secret yields a different tag
//! - **Constant-Time Compare**: verification never short-circuits on the
//!   first differing byte
//! - **Exact Length**: truncated or extended tags are rejected

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of an integrity tag.
pub const TAG_LEN: usize = 32;

/// Computes the integrity tag of `payload` under `secret`.
pub fn compute_tag(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Verifies that `tag` is the integrity tag of `payload` under `secret`.
///
/// Uses constant-time comparison to prevent timing attacks.
pub fn verify_tag(payload: &[u8], tag: &[u8], secret: &[u8]) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(m) => m,
        Err(_) => return false,
    };

    mac.update(payload);
    mac.verify_slice(tag).is_ok()
}
