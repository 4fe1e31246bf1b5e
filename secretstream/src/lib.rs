//! Secret stream -- authenticated, encrypted byte streams for peer-to-peer links.
//!
//! A connection runs the four-message secret handshake from the
//! `secrethandshake` crate, then carries application bytes in box-stream
//! frames, one independently keyed stream per direction:
//! - **boxstream**: frame codec plus async encoder and decoder
//! - **connection**: `SecretStream`, the duplex wrapper with orderly close
//! - **peer**: `Client` / `Server` endpoints bound to an identity and network key

pub mod addr;
pub mod boxstream;
pub mod config;
pub mod connection;
pub mod error;
pub mod peer;

// Re-export key public types at crate root.
pub use addr::PeerAddr;
pub use boxstream::{BoxReader, BoxWriter, HEADER_LENGTH, MAC_LENGTH, MAX_SEGMENT_SIZE};
pub use config::StreamConfig;
pub use connection::{ConnectionState, SecretReader, SecretStream, SecretWriter};
pub use error::{BoxStreamError, FramePart, Result, SecretStreamError};
pub use peer::{Client, Server};
pub use secrethandshake::{LongTermKeyPair, NetworkKey, PublicKey};
