// Secret handshake protocol: four messages, two ephemeral and two long-term DH terms.
//
//   Client                            Server
//     |--- Challenge ----------------->|
//     |<-- Challenge ------------------|
//     |--- ClientAuth ---------------->|
//     |<-- ServerAuth -----------------|
//     |==== box-stream both ways ======|

use crate::config::NetworkKey;
use crate::crypto::keys::{LongTermKeyPair, PublicKey};
use crate::crypto::x25519::EphemeralKeyPair;
use crate::error::{HandshakeError, Result, Role};
use crate::handshake::context::HandshakeContext;
use crate::handshake::derive::SessionKeys;
use crate::handshake::messages::{Challenge, ClientAuth, ServerAuth};
use crate::handshake::state::HandshakeState;

/// What a successful handshake hands to the transport layer.
#[derive(Debug)]
pub struct HandshakeOutcome {
    pub keys: SessionKeys,
    pub local_public: PublicKey,
    pub remote_public: PublicKey,
}

fn transition_error(from: HandshakeState, to: HandshakeState) -> HandshakeError {
    HandshakeError::InvalidStateTransition {
        from: from.label().into(),
        to: to.label().into(),
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// Client side of the handshake. Must know the server's long-term key.
pub struct ClientHandshake {
    ctx: HandshakeContext,
    state: HandshakeState,
}

impl ClientHandshake {
    /// Start an attempt with a fresh ephemeral key from the OS RNG.
    pub fn new(
        network_key: NetworkKey,
        local: LongTermKeyPair,
        server_public: PublicKey,
    ) -> Result<Self> {
        Self::with_ephemeral(network_key, local, server_public, EphemeralKeyPair::generate_os())
    }

    /// Start an attempt with a caller-supplied ephemeral key.
    ///
    /// Fails with `InvalidKey` if `server_public` is not a valid Ed25519 point.
    pub fn with_ephemeral(
        network_key: NetworkKey,
        local: LongTermKeyPair,
        server_public: PublicKey,
        ephemeral: EphemeralKeyPair,
    ) -> Result<Self> {
        server_public.to_curve25519()?;
        Ok(Self {
            ctx: HandshakeContext::new(network_key, local, ephemeral, Some(server_public))?,
            state: HandshakeState::Start,
        })
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Message 1. Available until the handshake finishes or fails.
    pub fn challenge(&self) -> Result<Challenge> {
        if self.state.is_terminal() {
            return Err(transition_error(self.state, HandshakeState::ChallengeExchanged));
        }
        Ok(self.ctx.challenge())
    }

    /// Verify message 2.
    pub fn verify_server_challenge(&mut self, challenge: &Challenge) -> Result<()> {
        self.expect(HandshakeState::Start, HandshakeState::ChallengeExchanged)?;
        if !self.ctx.verify_challenge(challenge)? {
            return Err(self.fail(HandshakeError::NetworkKeyMismatch));
        }
        self.state = HandshakeState::ChallengeExchanged;
        tracing::trace!("client verified server challenge");
        Ok(())
    }

    /// Produce message 3.
    pub fn client_auth(&mut self) -> Result<ClientAuth> {
        self.expect(HandshakeState::ChallengeExchanged, HandshakeState::AuthExchanged)?;
        let auth = self.ctx.client_auth()?;
        self.state = HandshakeState::AuthExchanged;
        Ok(auth)
    }

    /// Verify message 4 and derive the session keys.
    pub fn verify_server_auth(&mut self, auth: &ServerAuth) -> Result<HandshakeOutcome> {
        self.expect(HandshakeState::AuthExchanged, HandshakeState::Done)?;
        if !self.ctx.verify_server_auth(auth)? {
            return Err(self.fail(HandshakeError::PeerAuthenticationFailed(Role::Server)));
        }
        let outcome = finish(&mut self.ctx)?;
        self.state = HandshakeState::Done;
        Ok(outcome)
    }

    fn expect(&self, required: HandshakeState, to: HandshakeState) -> Result<()> {
        if self.state != required {
            return Err(transition_error(self.state, to));
        }
        Ok(())
    }

    fn fail(&mut self, err: HandshakeError) -> HandshakeError {
        self.ctx.wipe();
        self.state = HandshakeState::Failed;
        err
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// Server side of the handshake. Learns the client's identity from message 3.
pub struct ServerHandshake {
    ctx: HandshakeContext,
    state: HandshakeState,
}

impl ServerHandshake {
    pub fn new(network_key: NetworkKey, local: LongTermKeyPair) -> Result<Self> {
        Self::with_ephemeral(network_key, local, EphemeralKeyPair::generate_os())
    }

    pub fn with_ephemeral(
        network_key: NetworkKey,
        local: LongTermKeyPair,
        ephemeral: EphemeralKeyPair,
    ) -> Result<Self> {
        Ok(Self {
            ctx: HandshakeContext::new(network_key, local, ephemeral, None)?,
            state: HandshakeState::Start,
        })
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Verify message 1.
    pub fn verify_client_challenge(&mut self, challenge: &Challenge) -> Result<()> {
        self.expect(HandshakeState::Start, HandshakeState::ChallengeExchanged)?;
        if !self.ctx.verify_challenge(challenge)? {
            return Err(self.fail(HandshakeError::NetworkKeyMismatch));
        }
        self.state = HandshakeState::ChallengeExchanged;
        tracing::trace!("server verified client challenge");
        Ok(())
    }

    /// Message 2. Only sent once the client's challenge has been verified.
    pub fn challenge(&self) -> Result<Challenge> {
        if self.state != HandshakeState::ChallengeExchanged {
            return Err(transition_error(self.state, HandshakeState::ChallengeExchanged));
        }
        Ok(self.ctx.challenge())
    }

    /// Verify message 3. Returns the client's long-term public key.
    pub fn verify_client_auth(&mut self, auth: &ClientAuth) -> Result<PublicKey> {
        self.expect(HandshakeState::ChallengeExchanged, HandshakeState::AuthExchanged)?;
        if !self.ctx.verify_client_auth(auth)? {
            return Err(self.fail(HandshakeError::PeerAuthenticationFailed(Role::Client)));
        }
        self.state = HandshakeState::AuthExchanged;
        self.ctx
            .remote_public()
            .ok_or_else(|| HandshakeError::InvalidKey("client key missing after auth".into()))
    }

    /// Produce message 4 and derive the session keys.
    pub fn server_auth(&mut self) -> Result<(ServerAuth, HandshakeOutcome)> {
        self.expect(HandshakeState::AuthExchanged, HandshakeState::Done)?;
        let auth = self.ctx.server_auth()?;
        let outcome = finish(&mut self.ctx)?;
        self.state = HandshakeState::Done;
        Ok((auth, outcome))
    }

    fn expect(&self, required: HandshakeState, to: HandshakeState) -> Result<()> {
        if self.state != required {
            return Err(transition_error(self.state, to));
        }
        Ok(())
    }

    fn fail(&mut self, err: HandshakeError) -> HandshakeError {
        self.ctx.wipe();
        self.state = HandshakeState::Failed;
        err
    }
}

fn finish(ctx: &mut HandshakeContext) -> Result<HandshakeOutcome> {
    let remote_public = ctx
        .remote_public()
        .ok_or_else(|| HandshakeError::InvalidKey("remote public key not known".into()))?;
    Ok(HandshakeOutcome {
        keys: ctx.session_keys()?,
        local_public: ctx.local_public(),
        remote_public,
    })
}
