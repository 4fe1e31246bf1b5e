// Wire messages exchanged during the four-message secret handshake.
//
//   Client                              Server
//     |--- Challenge (64) ------------->|
//     |<-- Challenge (64) --------------|
//     |--- ClientAuth (112) ----------->|
//     |<-- ServerAuth (80) -------------|

use crate::crypto::keys::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use crate::crypto::secretbox::TAG_LENGTH;

/// `hmac(32) ‖ ephemeral public key(32)`.
pub const CHALLENGE_LENGTH: usize = 64;

/// `signature(64) ‖ client public key(32)`, the plaintext of ClientAuth.
pub const HELLO_LENGTH: usize = SIGNATURE_LENGTH + PUBLIC_KEY_LENGTH;

/// Secret-boxed hello.
pub const CLIENT_AUTH_LENGTH: usize = TAG_LENGTH + HELLO_LENGTH;

/// Secret-boxed server signature.
pub const SERVER_AUTH_LENGTH: usize = TAG_LENGTH + SIGNATURE_LENGTH;

/// Length of the app MAC carried at the front of a challenge.
pub const APP_MAC_LENGTH: usize = 32;

/// Message 1 and 2: `HMAC-SHA512(networkKey, ephPub)[..32] ‖ ephPub`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge(pub [u8; CHALLENGE_LENGTH]);

impl Challenge {
    pub fn new(mac: &[u8; APP_MAC_LENGTH], ephemeral_public: &[u8; 32]) -> Self {
        let mut bytes = [0u8; CHALLENGE_LENGTH];
        bytes[..APP_MAC_LENGTH].copy_from_slice(mac);
        bytes[APP_MAC_LENGTH..].copy_from_slice(ephemeral_public);
        Self(bytes)
    }

    pub fn mac(&self) -> [u8; APP_MAC_LENGTH] {
        let mut mac = [0u8; APP_MAC_LENGTH];
        mac.copy_from_slice(&self.0[..APP_MAC_LENGTH]);
        mac
    }

    pub fn ephemeral_public(&self) -> [u8; 32] {
        let mut key = [0u8; 32];
        key.copy_from_slice(&self.0[APP_MAC_LENGTH..]);
        key
    }
}

/// Message 3: the client's secret-boxed hello.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAuth(pub [u8; CLIENT_AUTH_LENGTH]);

/// Message 4: the server's secret-boxed signature over the hello.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerAuth(pub [u8; SERVER_AUTH_LENGTH]);
