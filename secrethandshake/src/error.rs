// Secret handshake error types

use std::fmt;

use thiserror::Error;

/// Which side of the handshake could not be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Server => write!(f, "server"),
        }
    }
}

/// Top-level error type for the secrethandshake crate.
#[derive(Debug, Error)]
pub enum HandshakeError {
    // ── Verification failures (terminal) ────────────────────────────────
    /// The peer's challenge MAC did not match: it uses a different network key.
    #[error("network key mismatch: challenge authentication failed")]
    NetworkKeyMismatch,

    /// The auth box could not be opened, the signature did not verify or the
    /// claimed key material was a low-order point. The three causes are
    /// deliberately reported the same way.
    #[error("{0} not authenticated")]
    PeerAuthenticationFailed(Role),

    // ── Transport ───────────────────────────────────────────────────────
    #[error("transport error while {stage}: {source}")]
    Transport {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    // ── Usage ───────────────────────────────────────────────────────────
    #[error("invalid handshake state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    // ── Crypto ──────────────────────────────────────────────────────────
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("secret box encryption failed")]
    Encryption,
}

impl HandshakeError {
    pub(crate) fn transport(stage: &'static str, source: std::io::Error) -> Self {
        HandshakeError::Transport { stage, source }
    }

    /// True for failures caused by the peer's cryptographic material rather
    /// than the transport or local misuse.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            HandshakeError::NetworkKeyMismatch | HandshakeError::PeerAuthenticationFailed(_)
        )
    }
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, HandshakeError>;
