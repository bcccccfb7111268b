use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Hex HMAC-SHA512 digest of a payload, as carried in the provider's signature header.
/// Must be fed the raw wire bytes: re-encoding semantically identical JSON changes the
/// byte layout and breaks verification.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a signature header against the expected digest of the raw body.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let expected = sign_payload(secret, payload);
    ConstantTimeEq::ct_eq(signature.as_bytes(), expected.as_bytes()).into()
}
