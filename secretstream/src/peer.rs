//! Client and server endpoints holding a long-term identity and a network key.

use secrethandshake::{LongTermKeyPair, NetworkKey, PublicKey};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::addr::PeerAddr;
use crate::config::StreamConfig;
use crate::connection::{ConnectionState, SecretStream};
use crate::error::Result;

/// Dials servers whose public key is known in advance.
#[derive(Debug, Clone)]
pub struct Client {
    keypair: LongTermKeyPair,
    network_key: NetworkKey,
    config: StreamConfig,
}

impl Client {
    pub fn new(keypair: LongTermKeyPair, network_key: NetworkKey) -> Self {
        Self {
            keypair,
            network_key,
            config: StreamConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Run the handshake over an already-connected transport.
    pub async fn connect<T>(&self, io: T, server: impl Into<PeerAddr>) -> Result<SecretStream<T>>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let server = server.into();
        tracing::debug!(state = %ConnectionState::Dialing, server = %server, "connecting");
        SecretStream::client_with_config(
            io,
            self.network_key,
            self.keypair.clone(),
            server.public_key(),
            self.config,
        )
        .await
    }
}

/// Accepts clients of the same network and learns their identity.
#[derive(Debug, Clone)]
pub struct Server {
    keypair: LongTermKeyPair,
    network_key: NetworkKey,
    config: StreamConfig,
}

impl Server {
    pub fn new(keypair: LongTermKeyPair, network_key: NetworkKey) -> Self {
        Self {
            keypair,
            network_key,
            config: StreamConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// The address clients dial to reach this server.
    pub fn addr(&self) -> PeerAddr {
        PeerAddr::new(self.keypair.public_key())
    }

    /// Run the handshake over an accepted transport.
    pub async fn accept<T>(&self, io: T) -> Result<SecretStream<T>>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        tracing::debug!(state = %ConnectionState::Accepting, local = %self.addr(), "accepting");
        SecretStream::server_with_config(io, self.network_key, self.keypair.clone(), self.config)
            .await
    }
}
