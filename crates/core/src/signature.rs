//! The shared signature primitive.
//!
//! Gateway-payment verification and webhook verification are the same
//! operation — HMAC-SHA256 over a payload, compared against a caller-supplied
//! hex digest — with different secrets and payload shapes. Both call through
//! here; neither re-implements the comparison.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn sign(secret: &[u8], payload: &[u8]) -> String {
    // HMAC accepts keys of any length; new_from_slice only fails for
    // variable-output MACs, which HMAC-SHA256 is not.
    let mut mac = HmacSha256::new_from_slice(secret)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(payload);
    format!("{:x}", mac.finalize().into_bytes())
}

/// Verify a hex-encoded signature over `payload`. Fails closed: any
/// mismatch, including malformed hex, is simply `false`.
pub fn verify(secret: &[u8], payload: &[u8], provided: &str) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(payload);
    let Ok(provided_bytes) = decode_hex(provided) else {
        return false;
    };
    // verify_slice is constant-time.
    mac.verify_slice(&provided_bytes).is_ok()
}

/// The payload signed by the gateway-verification path: "order_id|payment_id".
pub fn gateway_payload(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}|{payment_id}")
}

fn decode_hex(s: &str) -> Result<Vec<u8>, ()> {
    if s.len() % 2 != 0 {
        return Err(());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
        .collect()
}
