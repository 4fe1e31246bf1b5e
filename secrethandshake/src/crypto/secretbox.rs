// NaCl secret-box (XSalsa20-Poly1305) with the `tag ‖ ciphertext` layout.

use crypto_secretbox::aead::{Aead, AeadInPlace, KeyInit};
use crypto_secretbox::{Key, Nonce, Tag, XSalsa20Poly1305};
use thiserror::Error;

/// Length of the Poly1305 tag prepended to every box.
pub const TAG_LENGTH: usize = 16;

/// Length of a secret-box nonce.
pub const NONCE_LENGTH: usize = 24;

/// The all-zero nonce used for the two handshake auth boxes. Each of those
/// keys seals exactly one message.
pub const ZERO_NONCE: [u8; NONCE_LENGTH] = [0u8; NONCE_LENGTH];

/// A box failed to authenticate (or could not be produced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("secret box authentication failed")]
pub struct SecretBoxError;

/// XSalsa20-Poly1305 keyed with a 32-byte secret.
pub struct SecretBox {
    cipher: XSalsa20Poly1305,
}

impl SecretBox {
    /// Create a new secret box from a 32-byte key.
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: XSalsa20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Seal `plaintext`; returns `tag ‖ ciphertext`.
    pub fn seal(&self, nonce: &[u8; NONCE_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>, SecretBoxError> {
        self.cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|_| SecretBoxError)
    }

    /// Open a `tag ‖ ciphertext` box.
    pub fn open(&self, nonce: &[u8; NONCE_LENGTH], boxed: &[u8]) -> Result<Vec<u8>, SecretBoxError> {
        self.cipher
            .decrypt(Nonce::from_slice(nonce), boxed)
            .map_err(|_| SecretBoxError)
    }

    /// Encrypt `buffer` in place and return the detached tag.
    pub fn seal_detached(
        &self,
        nonce: &[u8; NONCE_LENGTH],
        buffer: &mut [u8],
    ) -> Result<[u8; TAG_LENGTH], SecretBoxError> {
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", buffer)
            .map_err(|_| SecretBoxError)?;
        Ok(tag.into())
    }

    /// Authenticate and decrypt `buffer` in place against a detached tag.
    /// On failure the buffer is left untouched.
    pub fn open_detached(
        &self,
        nonce: &[u8; NONCE_LENGTH],
        buffer: &mut [u8],
        tag: &[u8; TAG_LENGTH],
    ) -> Result<(), SecretBoxError> {
        self.cipher
            .decrypt_in_place_detached(Nonce::from_slice(nonce), b"", buffer, Tag::from_slice(tag))
            .map_err(|_| SecretBoxError)
    }
}
