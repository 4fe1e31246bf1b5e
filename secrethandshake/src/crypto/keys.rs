// Ed25519 long-term identity keys and their Curve25519 forms.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::{CryptoRng, RngCore};
use x25519_dalek::StaticSecret;
use zeroize::Zeroize;

use crate::error::{HandshakeError, Result};

/// Length of an Ed25519 public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of the `seed ‖ public` secret key layout.
pub const SECRET_KEY_LENGTH: usize = 64;

/// Length of an Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// A 32-byte Ed25519 public key as it travels on the wire.
///
/// The bytes are not validated on construction: a peer may claim any 32
/// bytes, and the handshake decides what to do with them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, failing unless it is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            HandshakeError::InvalidKey(format!(
                "public key must be {PUBLIC_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0
    }

    /// Standard base64 of the key bytes.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Map the key to its Curve25519 (Montgomery) form for Diffie-Hellman.
    pub fn to_curve25519(&self) -> Result<x25519_dalek::PublicKey> {
        let vk = VerifyingKey::from_bytes(&self.0)
            .map_err(|e| HandshakeError::InvalidKey(format!("{e}")))?;
        Ok(x25519_dalek::PublicKey::from(vk.to_montgomery().to_bytes()))
    }

    /// True when the bytes do not decode to a point, or decode to a point
    /// in the small-order subgroup.
    pub fn is_low_order(&self) -> bool {
        is_low_order_point(&self.0)
    }

    /// Strictly verify `signature` over `message` with this key.
    ///
    /// Returns `false` for undecodable keys instead of an error; callers
    /// treat every failure the same way.
    pub fn verify(&self, message: &[u8], signature: &[u8; SIGNATURE_LENGTH]) -> bool {
        let Ok(vk) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let sig = Signature::from_bytes(signature);
        vk.verify_strict(message, &sig).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl From<[u8; PUBLIC_KEY_LENGTH]> for PublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Low-order check on a compressed Edwards point.
pub fn is_low_order_point(bytes: &[u8; 32]) -> bool {
    match CompressedEdwardsY(*bytes).decompress() {
        Some(point) => point.is_small_order(),
        None => true,
    }
}

/// An Ed25519 long-term identity keypair.
///
/// The signing key is zeroized on drop by `ed25519-dalek`.
#[derive(Clone)]
pub struct LongTermKeyPair {
    signing_key: SigningKey,
}

impl LongTermKeyPair {
    /// Generate a fresh keypair from the given CSPRNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            signing_key: SigningKey::generate(rng),
        }
    }

    /// Reconstruct from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Import the 64-byte `seed ‖ public` layout. The public half must match
    /// the seed.
    pub fn from_keypair_bytes(bytes: &[u8; SECRET_KEY_LENGTH]) -> Result<Self> {
        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|e| HandshakeError::InvalidKey(format!("{e}")))?;
        Ok(Self { signing_key })
    }

    /// Export the 64-byte `seed ‖ public` layout.
    pub fn to_keypair_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_keypair_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, data: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(data).to_bytes()
    }

    /// The Curve25519 form of the secret key (SHA-512 of the seed, first
    /// half; clamping happens inside X25519).
    pub fn to_curve25519(&self) -> StaticSecret {
        let mut scalar = self.signing_key.to_scalar_bytes();
        let secret = StaticSecret::from(scalar);
        scalar.zeroize();
        secret
    }
}

impl fmt::Debug for LongTermKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongTermKeyPair")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}
