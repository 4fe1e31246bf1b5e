// Handshake state machine.

use std::fmt;

/// Progress of one handshake attempt. Shared by both roles.
///
/// `Failed` is terminal: every verification failure lands here and the
/// attempt's secrets are wiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Ephemeral key generated, no challenge verified yet.
    Start,

    /// Both challenges are known; the shared ephemeral secret is derived.
    ChallengeExchanged,

    /// Client: ClientAuth sent, awaiting ServerAuth.
    /// Server: ClientAuth verified, ServerAuth not yet produced.
    AuthExchanged,

    /// Session keys are ready.
    Done,

    /// A verification step failed.
    Failed,
}

impl HandshakeState {
    /// Human-readable label for the current state (used in error messages).
    pub fn label(&self) -> &'static str {
        match self {
            HandshakeState::Start => "Start",
            HandshakeState::ChallengeExchanged => "ChallengeExchanged",
            HandshakeState::AuthExchanged => "AuthExchanged",
            HandshakeState::Done => "Done",
            HandshakeState::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, HandshakeState::Done | HandshakeState::Failed)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
