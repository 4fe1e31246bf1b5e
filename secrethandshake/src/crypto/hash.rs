// Hashing primitives: SHA-256 over concatenated parts and the HMAC-SHA512/256 app MAC.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::error::{HandshakeError, Result};

/// SHA-256 of the concatenation of `parts`, returning a 32-byte digest.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// HMAC-SHA512 of `data` keyed with `key`, truncated to the first 32 bytes.
pub fn hmac_sha512_256(key: &[u8], data: &[u8]) -> Result<[u8; 32]> {
    let mut mac = <Hmac<Sha512> as Mac>::new_from_slice(key)
        .map_err(|e| HandshakeError::InvalidKey(format!("hmac key: {e}")))?;
    mac.update(data);
    let full = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&full[..32]);
    Ok(out)
}

/// Constant-time equality for MACs and tags.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
