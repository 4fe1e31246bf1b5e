// Secret derivation pipeline. Every step is a pure function of its inputs.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::NetworkKey;
use crate::crypto::hash::{hmac_sha512_256, sha256_concat};
use crate::crypto::keys::PublicKey;
use crate::error::Result;
use crate::handshake::messages::APP_MAC_LENGTH;

/// Length of a box-stream key.
pub const KEY_LENGTH: usize = 32;

/// Length of a box-stream starting nonce.
pub const NONCE_LENGTH: usize = 24;

/// Per-direction keys handed to the box-stream layer.
///
/// `encryption_*` seals what we send, `decryption_*` opens what we
/// receive. The two directions never share a key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    pub encryption_key: [u8; KEY_LENGTH],
    pub encryption_nonce: [u8; NONCE_LENGTH],
    pub decryption_key: [u8; KEY_LENGTH],
    pub decryption_nonce: [u8; NONCE_LENGTH],
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys").finish_non_exhaustive()
    }
}

/// `HMAC-SHA512(networkKey, ephemeralPublic)[..32]`.
pub fn app_mac(network_key: &NetworkKey, ephemeral_public: &[u8; 32]) -> Result<[u8; APP_MAC_LENGTH]> {
    hmac_sha512_256(network_key.as_bytes(), ephemeral_public)
}

/// `SHA256(secret)`, the value both signatures commit to.
pub fn transcript_hash(secret: &[u8; 32]) -> [u8; 32] {
    sha256_concat(&[secret])
}

/// `SHA256(networkKey ‖ secret ‖ aBob)`, the ClientAuth box key.
pub fn derive_secret2(network_key: &NetworkKey, secret: &[u8; 32], a_bob: &[u8; 32]) -> [u8; 32] {
    sha256_concat(&[network_key.as_bytes(), secret, a_bob])
}

/// `SHA256(networkKey ‖ secret ‖ aBob ‖ bAlice)`, the ServerAuth box key.
pub fn derive_secret3(
    network_key: &NetworkKey,
    secret: &[u8; 32],
    a_bob: &[u8; 32],
    b_alice: &[u8; 32],
) -> [u8; 32] {
    sha256_concat(&[network_key.as_bytes(), secret, a_bob, b_alice])
}

pub fn derive_final_secret(secret3: &[u8; 32]) -> [u8; 32] {
    sha256_concat(&[secret3])
}

/// Derive both directions' keys and starting nonces.
///
/// We encrypt under the key bound to the remote identity and start from the
/// nonce the remote side advertised in its challenge; the peer computes the
/// mirror image.
pub fn derive_session_keys(
    final_secret: &[u8; 32],
    local_public: &PublicKey,
    remote_public: &PublicKey,
    local_app_mac: &[u8; APP_MAC_LENGTH],
    remote_app_mac: &[u8; APP_MAC_LENGTH],
) -> SessionKeys {
    let mut encryption_nonce = [0u8; NONCE_LENGTH];
    encryption_nonce.copy_from_slice(&remote_app_mac[..NONCE_LENGTH]);
    let mut decryption_nonce = [0u8; NONCE_LENGTH];
    decryption_nonce.copy_from_slice(&local_app_mac[..NONCE_LENGTH]);

    SessionKeys {
        encryption_key: sha256_concat(&[final_secret, remote_public.as_bytes()]),
        encryption_nonce,
        decryption_key: sha256_concat(&[final_secret, local_public.as_bytes()]),
        decryption_nonce,
    }
}
