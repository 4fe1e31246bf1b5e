//! Secure connection: a handshaken transport wrapped in box-streams.
//!
//! Lifecycle: Dialing / Accepting -> Handshaking -> Secure -> Closed or Failed.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use secrethandshake::{
    client_handshake, server_handshake, HandshakeOutcome, LongTermKeyPair, NetworkKey, PublicKey,
};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::boxstream::{BoxReader, BoxWriter};
use crate::config::StreamConfig;
use crate::error::Result;

/// Connection state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Client side, before the first handshake message.
    Dialing,
    /// Server side, before the first handshake message.
    Accepting,
    /// Handshake messages in flight.
    Handshaking,
    /// Box-streams established in both directions.
    Secure,
    /// Goodbye sent and received.
    Closed,
    /// A direction hit a terminal error.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Dialing => write!(f, "Dialing"),
            ConnectionState::Accepting => write!(f, "Accepting"),
            ConnectionState::Handshaking => write!(f, "Handshaking"),
            ConnectionState::Secure => write!(f, "Secure"),
            ConnectionState::Closed => write!(f, "Closed"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

/// Read half of a secure connection.
pub type SecretReader<T> = BoxReader<tokio::io::ReadHalf<T>>;

/// Write half of a secure connection.
pub type SecretWriter<T> = BoxWriter<tokio::io::WriteHalf<T>>;

/// An authenticated, encrypted, ordered byte stream over `T`.
pub struct SecretStream<T> {
    reader: SecretReader<T>,
    writer: SecretWriter<T>,
    local_public: PublicKey,
    remote_public: PublicKey,
}

impl<T: AsyncRead + AsyncWrite + Unpin> SecretStream<T> {
    /// Run the client handshake on `io` and wrap it.
    pub async fn client(
        io: T,
        network_key: NetworkKey,
        keypair: LongTermKeyPair,
        server_public: PublicKey,
    ) -> Result<Self> {
        Self::client_with_config(io, network_key, keypair, server_public, StreamConfig::default())
            .await
    }

    pub async fn client_with_config(
        mut io: T,
        network_key: NetworkKey,
        keypair: LongTermKeyPair,
        server_public: PublicKey,
        config: StreamConfig,
    ) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            state = %ConnectionState::Handshaking,
            server = %server_public,
            "client handshake starting"
        );
        let outcome = client_handshake(&mut io, network_key, keypair, server_public).await?;
        Ok(Self::from_outcome(io, outcome, &config))
    }

    /// Run the server handshake on `io` and wrap it.
    pub async fn server(io: T, network_key: NetworkKey, keypair: LongTermKeyPair) -> Result<Self> {
        Self::server_with_config(io, network_key, keypair, StreamConfig::default()).await
    }

    pub async fn server_with_config(
        mut io: T,
        network_key: NetworkKey,
        keypair: LongTermKeyPair,
        config: StreamConfig,
    ) -> Result<Self> {
        config.validate()?;
        tracing::debug!(state = %ConnectionState::Handshaking, "server handshake starting");
        let outcome = server_handshake(&mut io, network_key, keypair).await?;
        Ok(Self::from_outcome(io, outcome, &config))
    }

    /// Wrap a transport whose handshake has already completed.
    pub fn from_outcome(io: T, outcome: HandshakeOutcome, config: &StreamConfig) -> Self {
        let (read_half, write_half) = tokio::io::split(io);
        let keys = &outcome.keys;
        let reader = BoxReader::new(read_half, &keys.decryption_key, keys.decryption_nonce);
        let writer = BoxWriter::with_max_segment_size(
            write_half,
            &keys.encryption_key,
            keys.encryption_nonce,
            config.max_segment_size,
        );
        tracing::debug!(
            state = %ConnectionState::Secure,
            peer = %outcome.remote_public,
            "secret stream established"
        );
        Self {
            reader,
            writer,
            local_public: outcome.local_public,
            remote_public: outcome.remote_public,
        }
    }

    pub fn local_public_key(&self) -> PublicKey {
        self.local_public
    }

    pub fn remote_public_key(&self) -> PublicKey {
        self.remote_public
    }

    pub fn state(&self) -> ConnectionState {
        if self.reader.terminal_error().is_some() || self.writer.terminal_error().is_some() {
            ConnectionState::Failed
        } else if self.writer.is_closed() && self.reader.is_finished() {
            ConnectionState::Closed
        } else {
            ConnectionState::Secure
        }
    }

    /// Split into halves that can be driven from separate tasks.
    pub fn into_split(self) -> (SecretReader<T>, SecretWriter<T>) {
        (self.reader, self.writer)
    }

    /// Send the goodbye, shut the transport down and report the first error
    /// seen on either direction: the write side first, then any terminal
    /// read error recorded earlier.
    pub async fn close(mut self) -> io::Result<()> {
        let write_result = self.writer.shutdown().await;
        let read_error = self.reader.terminal_error();
        tracing::debug!(peer = %self.remote_public, "secret stream closed");
        write_result?;
        match read_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> AsyncRead for SecretStream<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> AsyncWrite for SecretStream<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().writer).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().writer).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().writer).poll_shutdown(cx)
    }
}

impl<T> fmt::Debug for SecretStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStream")
            .field("local", &self.local_public)
            .field("remote", &self.remote_public)
            .finish_non_exhaustive()
    }
}
