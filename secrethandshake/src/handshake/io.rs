// Async drivers that run a handshake over any tokio byte stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::NetworkKey;
use crate::crypto::keys::{LongTermKeyPair, PublicKey};
use crate::error::{HandshakeError, Result};
use crate::handshake::messages::{
    Challenge, ClientAuth, ServerAuth, CHALLENGE_LENGTH, CLIENT_AUTH_LENGTH, SERVER_AUTH_LENGTH,
};
use crate::handshake::protocol::{ClientHandshake, HandshakeOutcome, ServerHandshake};

async fn send<S>(stream: &mut S, bytes: &[u8], stage: &'static str) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream
        .write_all(bytes)
        .await
        .map_err(|e| HandshakeError::transport(stage, e))?;
    stream
        .flush()
        .await
        .map_err(|e| HandshakeError::transport(stage, e))
}

async fn recv<S, const N: usize>(stream: &mut S, stage: &'static str) -> Result<[u8; N]>
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; N];
    stream
        .read_exact(&mut buf)
        .await
        .map_err(|e| HandshakeError::transport(stage, e))?;
    Ok(buf)
}

/// Run the client side with a fresh ephemeral key.
pub async fn client_handshake<S>(
    stream: &mut S,
    network_key: NetworkKey,
    local: LongTermKeyPair,
    server_public: PublicKey,
) -> Result<HandshakeOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let machine = ClientHandshake::new(network_key, local, server_public)?;
    run_client(stream, machine).await
}

/// Run the server side with a fresh ephemeral key.
pub async fn server_handshake<S>(
    stream: &mut S,
    network_key: NetworkKey,
    local: LongTermKeyPair,
) -> Result<HandshakeOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let machine = ServerHandshake::new(network_key, local)?;
    run_server(stream, machine).await
}

/// Drive a prepared client state machine to completion.
pub async fn run_client<S>(stream: &mut S, mut machine: ClientHandshake) -> Result<HandshakeOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tracing::debug!("client handshake started");
    let result = async {
        send(stream, &machine.challenge()?.0, "sending client challenge").await?;

        let reply = recv::<_, CHALLENGE_LENGTH>(stream, "receiving server challenge").await?;
        machine.verify_server_challenge(&Challenge(reply))?;

        let auth = machine.client_auth()?;
        send(stream, &auth.0, "sending client auth").await?;

        let reply = recv::<_, SERVER_AUTH_LENGTH>(stream, "receiving server auth").await?;
        machine.verify_server_auth(&ServerAuth(reply))
    }
    .await;

    match &result {
        Ok(outcome) => tracing::debug!(
            peer = %outcome.remote_public,
            "client handshake complete"
        ),
        Err(e) => tracing::debug!(
            state = %machine.state(),
            verification = e.is_verification_failure(),
            error = %e,
            "client handshake failed"
        ),
    }
    result
}

/// Drive a prepared server state machine to completion.
pub async fn run_server<S>(stream: &mut S, mut machine: ServerHandshake) -> Result<HandshakeOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tracing::debug!("server handshake started");
    let result = async {
        let hello = recv::<_, CHALLENGE_LENGTH>(stream, "receiving client challenge").await?;
        machine.verify_client_challenge(&Challenge(hello))?;

        send(stream, &machine.challenge()?.0, "sending server challenge").await?;

        let auth = recv::<_, CLIENT_AUTH_LENGTH>(stream, "receiving client auth").await?;
        machine.verify_client_auth(&ClientAuth(auth))?;

        let (reply, outcome) = machine.server_auth()?;
        send(stream, &reply.0, "sending server auth").await?;
        Ok::<_, HandshakeError>(outcome)
    }
    .await;

    match &result {
        Ok(outcome) => tracing::debug!(
            peer = %outcome.remote_public,
            "server handshake complete"
        ),
        Err(e) => tracing::debug!(
            state = %machine.state(),
            verification = e.is_verification_failure(),
            error = %e,
            "server handshake failed"
        ),
    }
    result
}
