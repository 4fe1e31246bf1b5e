// Network key configuration.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::HandshakeError;

/// Length of a network key.
pub const NETWORK_KEY_LENGTH: usize = 32;

/// The 32-byte pre-shared capability ("app key") that scopes a network.
///
/// Peers holding different network keys fail at the very first message.
/// The key is not secret in the usual sense (the main network key is
/// public), so it is freely copyable.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkKey([u8; NETWORK_KEY_LENGTH]);

impl NetworkKey {
    /// The public main-network key, `1KHLiKZvAvjbY1ziZEHMXawbCEIM6qwjCDm3VYRan/s=`.
    pub const SSB_MAIN: NetworkKey = NetworkKey([
        0xd4, 0xa1, 0xcb, 0x88, 0xa6, 0x6f, 0x02, 0xf8, 0xdb, 0x63, 0x5c, 0xe2, 0x64, 0x41, 0xcc,
        0x5d, 0xac, 0x1b, 0x08, 0x42, 0x0c, 0xea, 0xac, 0x23, 0x08, 0x39, 0xb7, 0x55, 0x84, 0x5a,
        0x9f, 0xfb,
    ]);

    pub const fn from_bytes(bytes: [u8; NETWORK_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, failing unless it is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HandshakeError> {
        let arr: [u8; NETWORK_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            HandshakeError::InvalidKey(format!(
                "network key must be {NETWORK_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, HandshakeError> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| HandshakeError::InvalidKey(format!("network key hex: {e}")))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NETWORK_KEY_LENGTH] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl Default for NetworkKey {
    fn default() -> Self {
        Self::SSB_MAIN
    }
}

/// Parses the standard base64 form.
impl FromStr for NetworkKey {
    type Err = HandshakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = STANDARD
            .decode(s.trim())
            .map_err(|e| HandshakeError::InvalidKey(format!("network key base64: {e}")))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetworkKey({})", self.to_base64())
    }
}

impl fmt::Display for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl From<[u8; NETWORK_KEY_LENGTH]> for NetworkKey {
    fn from(bytes: [u8; NETWORK_KEY_LENGTH]) -> Self {
        Self(bytes)
    }
}
