//! Peer addresses for secret-stream connections.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrethandshake::PublicKey;

use crate::error::SecretStreamError;

/// Network name reported for secret-stream addresses.
pub const NETWORK: &str = "shs-bs";

const PREFIX: char = '@';
const SUFFIX: &str = ".ed25519";

/// The identity half of a peer's address: its long-term public key.
///
/// Rendered and parsed as `@<base64 key>.ed25519`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddr {
    public_key: PublicKey,
}

impl PeerAddr {
    pub fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    pub fn network(&self) -> &'static str {
        NETWORK
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }
}

impl From<PublicKey> for PeerAddr {
    fn from(public_key: PublicKey) -> Self {
        Self::new(public_key)
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}{SUFFIX}", self.public_key.to_base64())
    }
}

impl FromStr for PeerAddr {
    type Err = SecretStreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_suffix(SUFFIX))
            .ok_or_else(|| SecretStreamError::InvalidAddress(format!("expected @<key>.ed25519, got {s:?}")))?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| SecretStreamError::InvalidAddress(format!("bad base64 key: {e}")))?;
        let public_key = PublicKey::from_slice(&bytes)
            .map_err(|e| SecretStreamError::InvalidAddress(e.to_string()))?;
        Ok(Self { public_key })
    }
}
