// Secret handshake: mutually authenticated key agreement scoped by a network key.
//
// Crate root: module declarations and public re-exports.

pub mod config;
pub mod crypto;
pub mod error;
pub mod handshake;

// Re-export key types at crate root for convenience.
pub use config::NetworkKey;
pub use crypto::keys::{LongTermKeyPair, PublicKey};
pub use crypto::x25519::EphemeralKeyPair;
pub use error::{HandshakeError, Result, Role};
pub use handshake::derive::SessionKeys;
pub use handshake::io::{client_handshake, run_client, run_server, server_handshake};
pub use handshake::messages::{
    CHALLENGE_LENGTH, CLIENT_AUTH_LENGTH, SERVER_AUTH_LENGTH,
};
pub use handshake::protocol::{ClientHandshake, HandshakeOutcome, ServerHandshake};
pub use handshake::state::HandshakeState;
