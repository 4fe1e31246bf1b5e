//! Box-stream: a byte stream cut into independently authenticated frames.
//!
//! Each frame is a 34-byte secret-boxed header carrying the body length and
//! the body's MAC, followed by the body ciphertext without its MAC. Header
//! and body nonces are consecutive values of one 24-byte big-endian counter.
//! A header sealing 18 zero bytes marks the end of the stream.

pub mod codec;
pub mod nonce;
pub mod reader;
pub mod writer;

/// Poly1305 tag length.
pub const MAC_LENGTH: usize = 16;

/// Plaintext header: `u16be body length ‖ body MAC`.
pub const HEADER_PLAIN_LENGTH: usize = 2 + MAC_LENGTH;

/// Sealed header as it appears on the wire.
pub const HEADER_LENGTH: usize = MAC_LENGTH + HEADER_PLAIN_LENGTH;

/// Largest body a single frame may carry.
pub const MAX_SEGMENT_SIZE: usize = 4096;

/// Plaintext of the end-of-stream header.
pub const GOODBYE: [u8; HEADER_PLAIN_LENGTH] = [0u8; HEADER_PLAIN_LENGTH];

pub use codec::{FrameHeader, FrameOpener, FrameSealer};
pub use nonce::NonceCounter;
pub use reader::BoxReader;
pub use writer::BoxWriter;
