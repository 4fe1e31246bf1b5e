//! Pure frame sealing and opening, independent of any transport.

use bytes::{BufMut, BytesMut};
use secrethandshake::crypto::secretbox::SecretBox;

use super::nonce::{NonceCounter, NONCE_LENGTH};
use super::{GOODBYE, HEADER_LENGTH, HEADER_PLAIN_LENGTH, MAC_LENGTH, MAX_SEGMENT_SIZE};
use crate::error::{BoxStreamError, FramePart};

/// A successfully opened header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameHeader {
    /// A body of `len` bytes authenticated by `tag` follows.
    Body { len: usize, tag: [u8; MAC_LENGTH] },
    /// End of stream; no body follows.
    Goodbye,
}

/// Seals plaintext chunks into frames for one direction.
pub struct FrameSealer {
    secretbox: SecretBox,
    nonce: NonceCounter,
}

impl FrameSealer {
    pub fn new(key: &[u8; 32], nonce: [u8; NONCE_LENGTH]) -> Self {
        Self {
            secretbox: SecretBox::new(key),
            nonce: NonceCounter::new(nonce),
        }
    }

    /// The nonce the next header will be sealed under.
    pub fn next_header_nonce(&self) -> [u8; NONCE_LENGTH] {
        self.nonce.current()
    }

    /// Append one frame carrying `chunk` (1..=4096 bytes) to `out`.
    pub fn seal_into(&mut self, chunk: &[u8], out: &mut BytesMut) -> Result<(), BoxStreamError> {
        if chunk.is_empty() || chunk.len() > MAX_SEGMENT_SIZE {
            return Err(BoxStreamError::InvalidFrameLength(
                u16::try_from(chunk.len()).unwrap_or(u16::MAX),
            ));
        }
        let header_nonce = self.nonce.next_nonce();
        let body_nonce = self.nonce.next_nonce();

        out.reserve(HEADER_LENGTH + chunk.len());
        let start = out.len();
        out.resize(start + HEADER_LENGTH, 0);
        out.put_slice(chunk);

        let body_tag = self
            .secretbox
            .seal_detached(&body_nonce, &mut out[start + HEADER_LENGTH..])
            .map_err(|_| BoxStreamError::Encryption)?;

        // `chunk.len()` is bounded by MAX_SEGMENT_SIZE above.
        let len = chunk.len() as u16;
        let mut header = [0u8; HEADER_PLAIN_LENGTH];
        header[..2].copy_from_slice(&len.to_be_bytes());
        header[2..].copy_from_slice(&body_tag);
        self.seal_header(&header_nonce, header, &mut out[start..start + HEADER_LENGTH])?;

        tracing::trace!(len = chunk.len(), "sealed box-stream frame");
        Ok(())
    }

    /// Append the end-of-stream header to `out`.
    pub fn seal_goodbye_into(&mut self, out: &mut BytesMut) -> Result<(), BoxStreamError> {
        let header_nonce = self.nonce.next_nonce();
        let start = out.len();
        out.resize(start + HEADER_LENGTH, 0);
        self.seal_header(&header_nonce, GOODBYE, &mut out[start..])
    }

    fn seal_header(
        &self,
        nonce: &[u8; NONCE_LENGTH],
        mut plain: [u8; HEADER_PLAIN_LENGTH],
        dst: &mut [u8],
    ) -> Result<(), BoxStreamError> {
        let tag = self
            .secretbox
            .seal_detached(nonce, &mut plain)
            .map_err(|_| BoxStreamError::Encryption)?;
        dst[..MAC_LENGTH].copy_from_slice(&tag);
        dst[MAC_LENGTH..].copy_from_slice(&plain);
        Ok(())
    }
}

/// Opens frames for one direction. Any failure is terminal for the stream.
pub struct FrameOpener {
    secretbox: SecretBox,
    nonce: NonceCounter,
}

impl FrameOpener {
    pub fn new(key: &[u8; 32], nonce: [u8; NONCE_LENGTH]) -> Self {
        Self {
            secretbox: SecretBox::new(key),
            nonce: NonceCounter::new(nonce),
        }
    }

    /// Open a sealed header. Consumes one nonce.
    pub fn open_header(&mut self, sealed: &[u8; HEADER_LENGTH]) -> Result<FrameHeader, BoxStreamError> {
        let nonce = self.nonce.next_nonce();
        let mut tag = [0u8; MAC_LENGTH];
        tag.copy_from_slice(&sealed[..MAC_LENGTH]);
        let mut plain = [0u8; HEADER_PLAIN_LENGTH];
        plain.copy_from_slice(&sealed[MAC_LENGTH..]);

        self.secretbox
            .open_detached(&nonce, &mut plain, &tag)
            .map_err(|_| BoxStreamError::StreamCorrupted(FramePart::Header))?;

        if plain == GOODBYE {
            return Ok(FrameHeader::Goodbye);
        }

        let len = u16::from_be_bytes([plain[0], plain[1]]);
        if len == 0 || usize::from(len) > MAX_SEGMENT_SIZE {
            return Err(BoxStreamError::InvalidFrameLength(len));
        }
        let mut body_tag = [0u8; MAC_LENGTH];
        body_tag.copy_from_slice(&plain[2..]);
        Ok(FrameHeader::Body {
            len: usize::from(len),
            tag: body_tag,
        })
    }

    /// Authenticate and decrypt a body in place. Consumes one nonce.
    pub fn open_body(&mut self, body: &mut [u8], tag: &[u8; MAC_LENGTH]) -> Result<(), BoxStreamError> {
        let nonce = self.nonce.next_nonce();
        self.secretbox
            .open_detached(&nonce, body, tag)
            .map_err(|_| BoxStreamError::StreamCorrupted(FramePart::Body))?;
        tracing::trace!(len = body.len(), "opened box-stream frame");
        Ok(())
    }
}
