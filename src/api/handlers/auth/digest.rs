//! Reset-link digest: keyed HMAC-SHA256 over the `{email, token}` payload.
//!
//! The forgot-password flow computes `hash_msg`, stores it in the short-lived
//! `msg_hash` cookie, and the set-password handler recomputes it from the
//! link's query parameters plus the server secret. The digest never travels
//! in the link itself, so the link is only usable from the browser context
//! that initiated the request.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the deterministic, order-sensitive digest for a reset payload.
///
/// Each field is length-prefixed before entering the MAC, so the encoding
/// is injective: no two distinct `{email, token}` pairs produce the same
/// MAC input, even when a field contains delimiter-looking bytes.
pub(crate) fn hash_msg(secret: &SecretString, email: &str, token: &str) -> String {
    // HMAC-SHA256 accepts keys of any length, so this cannot fail.
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts keys of any size");
    mac_field(&mut mac, email);
    mac_field(&mut mac, token);
    Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes())
}

fn mac_field(mac: &mut HmacSha256, value: &str) {
    mac.update(&(value.len() as u64).to_be_bytes());
    mac.update(value.as_bytes());
}

/// Compare two digests without leaking where they differ.
#[must_use]
pub(crate) fn verify_hash(old: &str, new: &str) -> bool {
    constant_time_eq(old.as_bytes(), new.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
