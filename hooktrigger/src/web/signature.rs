//! GitHub webhook signature verification.
//!
//! GitHub signs the raw request body with HMAC using the webhook secret and
//! sends the digest as `<algorithm>=<hex>`: `X-Hub-Signature` carries
//! `sha1=...`, `X-Hub-Signature-256` carries `sha256=...`.
//! Reference: https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use tracing::warn;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";
pub const SIGNATURE_256_HEADER: &str = "X-Hub-Signature-256";

/// Verify a signature header against the body and shared secret.
///
/// Returns `false` for malformed headers, unknown algorithms, wrong digest
/// lengths and mismatches. The comparison is constant time.
pub fn verify_signature(secret: &[u8], signature_header: &str, body: &[u8]) -> bool {
    let Some((algorithm, hex_digest)) = signature_header.trim().split_once('=') else {
        warn!(header_length = signature_header.len(), "github_signature_malformed");
        return false;
    };

    let Ok(expected) = hex::decode(hex_digest) else {
        warn!(algorithm = %algorithm, "github_signature_invalid_hex");
        return false;
    };

    let valid = match algorithm {
        "sha1" => HmacSha1::new_from_slice(secret)
            .map(|mut mac| {
                mac.update(body);
                mac.verify_slice(&expected).is_ok()
            })
            .unwrap_or(false),
        "sha256" => HmacSha256::new_from_slice(secret)
            .map(|mut mac| {
                mac.update(body);
                mac.verify_slice(&expected).is_ok()
            })
            .unwrap_or(false),
        other => {
            warn!(algorithm = %other, "github_signature_unsupported_algorithm");
            return false;
        }
    };

    if !valid {
        warn!(
            algorithm = %algorithm,
            digest_length = expected.len(),
            "github_signature_mismatch"
        );
    }

    valid
}

/// Compute an `X-Hub-Signature` value (`sha1=<hex>`) for a body.
pub fn sign_sha1(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

/// Compute an `X-Hub-Signature-256` value (`sha256=<hex>`) for a body.
pub fn sign_sha256(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
