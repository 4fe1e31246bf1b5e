use std::fmt;
use std::io;

use secrethandshake::HandshakeError;
use thiserror::Error;

/// Which box of a frame failed to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePart {
    Header,
    Body,
}

impl fmt::Display for FramePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramePart::Header => write!(f, "header"),
            FramePart::Body => write!(f, "body"),
        }
    }
}

/// Errors produced by the box-stream codec.
///
/// The async adapters surface these through `io::Error` with kind
/// `InvalidData`; use [`BoxStreamError::is_corruption`] to tell them apart
/// from plain transport failures.
#[derive(Debug, Error)]
pub enum BoxStreamError {
    #[error("box-stream corrupted: {0} failed to authenticate")]
    StreamCorrupted(FramePart),

    #[error("box-stream corrupted: invalid body length {0}")]
    InvalidFrameLength(u16),

    #[error("box-stream encryption failed")]
    Encryption,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl BoxStreamError {
    /// True if `err` carries a box-stream corruption error.
    pub fn is_corruption(err: &io::Error) -> bool {
        err.get_ref()
            .and_then(|inner| inner.downcast_ref::<BoxStreamError>())
            .is_some_and(|e| {
                matches!(
                    e,
                    BoxStreamError::StreamCorrupted(_) | BoxStreamError::InvalidFrameLength(_)
                )
            })
    }
}

impl From<BoxStreamError> for io::Error {
    fn from(err: BoxStreamError) -> Self {
        match err {
            BoxStreamError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// The error that ended one direction of a box-stream, kept so that every
/// later call can report it again with its original type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TerminalError {
    Corrupted(FramePart),
    InvalidFrameLength(u16),
    Encryption,
    Io { kind: io::ErrorKind, message: String },
}

impl TerminalError {
    pub(crate) fn capture(err: &io::Error) -> Self {
        match err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<BoxStreamError>())
        {
            Some(BoxStreamError::StreamCorrupted(part)) => TerminalError::Corrupted(*part),
            Some(BoxStreamError::InvalidFrameLength(len)) => TerminalError::InvalidFrameLength(*len),
            Some(BoxStreamError::Encryption) => TerminalError::Encryption,
            _ => TerminalError::Io {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }

    pub(crate) fn to_io_error(&self) -> io::Error {
        match self {
            TerminalError::Corrupted(part) => BoxStreamError::StreamCorrupted(*part).into(),
            TerminalError::InvalidFrameLength(len) => BoxStreamError::InvalidFrameLength(*len).into(),
            TerminalError::Encryption => BoxStreamError::Encryption.into(),
            TerminalError::Io { kind, message } => io::Error::new(*kind, message.clone()),
        }
    }
}

/// All errors produced when establishing or closing a secret stream.
#[derive(Debug, Error)]
pub enum SecretStreamError {
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SecretStreamError>;
