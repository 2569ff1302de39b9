use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Base64 HMAC-SHA256 of the raw body, the platform's webhook signature.
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Verifies the `X-Line-Signature` header against the raw request body.
/// Comparison runs over the full digest regardless of where a mismatch
/// occurs.
pub fn verify(channel_secret: &str, body: &[u8], signature_header: &str) -> bool {
    let Ok(provided) = BASE64.decode(signature_header.trim()) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    if provided.len() != expected.len() {
        return false;
    }
    provided.iter().zip(expected.iter()).fold(0u8, |diff, (a, b)| diff | (a ^ b)) == 0
}
