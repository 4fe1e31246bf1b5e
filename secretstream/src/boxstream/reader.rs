//! Async box-stream decoder.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, ReadBuf};

use super::codec::{FrameHeader, FrameOpener};
use super::nonce::NONCE_LENGTH;
use super::{HEADER_LENGTH, MAC_LENGTH, MAX_SEGMENT_SIZE};
use crate::error::{BoxStreamError, TerminalError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Header,
    Body { len: usize, tag: [u8; MAC_LENGTH] },
    /// Goodbye received; every further read returns 0 bytes.
    Done,
    Failed,
}

/// Opens box-stream frames read from `inner` and yields their plaintext.
///
/// Plaintext of a frame is delivered only after the whole frame has been
/// authenticated. A failed frame is terminal: the stream is never
/// resynchronized and every later read returns the same error.
pub struct BoxReader<R> {
    inner: R,
    opener: FrameOpener,
    state: ReaderState,
    header: [u8; HEADER_LENGTH],
    body: BytesMut,
    filled: usize,
    ready: BytesMut,
    failed: Option<TerminalError>,
}

impl<R: AsyncRead + Unpin> BoxReader<R> {
    pub fn new(inner: R, key: &[u8; 32], nonce: [u8; NONCE_LENGTH]) -> Self {
        Self {
            inner,
            opener: FrameOpener::new(key, nonce),
            state: ReaderState::Header,
            header: [0u8; HEADER_LENGTH],
            body: BytesMut::with_capacity(MAX_SEGMENT_SIZE),
            filled: 0,
            ready: BytesMut::new(),
            failed: None,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// True once the peer's goodbye has been received.
    pub fn is_finished(&self) -> bool {
        self.state == ReaderState::Done
    }

    /// The error that ended this stream, if any.
    pub fn terminal_error(&self) -> Option<io::Error> {
        self.failed.as_ref().map(TerminalError::to_io_error)
    }

    fn fail(&mut self, err: io::Error) -> io::Error {
        if BoxStreamError::is_corruption(&err) {
            tracing::warn!(error = %err, "box-stream corruption detected");
        }
        self.failed = Some(TerminalError::capture(&err));
        self.state = ReaderState::Failed;
        err
    }

    /// Fill `dst[filled..]` from the transport. EOF before the buffer is full
    /// is `UnexpectedEof`.
    fn poll_fill(
        inner: &mut R,
        cx: &mut Context<'_>,
        dst: &mut [u8],
        filled: &mut usize,
    ) -> Poll<io::Result<()>> {
        while *filled < dst.len() {
            let mut buf = ReadBuf::new(&mut dst[*filled..]);
            ready!(Pin::new(&mut *inner).poll_read(cx, &mut buf))?;
            let n = buf.filled().len();
            if n == 0 {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "box-stream transport closed mid-frame",
                )));
            }
            *filled += n;
        }
        Poll::Ready(Ok(()))
    }

    /// Advance the state machine until plaintext is available, the stream
    /// ends, or an error occurs.
    fn poll_frame(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        loop {
            match self.state {
                ReaderState::Done => return Poll::Ready(Ok(())),
                ReaderState::Failed => {
                    let err = self
                        .terminal_error()
                        .unwrap_or_else(|| io::Error::from(io::ErrorKind::InvalidData));
                    return Poll::Ready(Err(err));
                }
                ReaderState::Header => {
                    if let Err(e) = ready!(Self::poll_fill(
                        &mut self.inner,
                        cx,
                        &mut self.header,
                        &mut self.filled
                    )) {
                        return Poll::Ready(Err(self.fail(e)));
                    }
                    self.filled = 0;
                    match self.opener.open_header(&self.header) {
                        Ok(FrameHeader::Goodbye) => {
                            tracing::debug!("box-stream goodbye received");
                            self.state = ReaderState::Done;
                        }
                        Ok(FrameHeader::Body { len, tag }) => {
                            self.body.clear();
                            self.body.resize(len, 0);
                            self.state = ReaderState::Body { len, tag };
                        }
                        Err(e) => return Poll::Ready(Err(self.fail(e.into()))),
                    }
                }
                ReaderState::Body { len, tag } => {
                    if let Err(e) = ready!(Self::poll_fill(
                        &mut self.inner,
                        cx,
                        &mut self.body[..len],
                        &mut self.filled
                    )) {
                        return Poll::Ready(Err(self.fail(e)));
                    }
                    self.filled = 0;
                    if let Err(e) = self.opener.open_body(&mut self.body[..len], &tag) {
                        return Poll::Ready(Err(self.fail(e.into())));
                    }
                    self.ready = self.body.split();
                    self.state = ReaderState::Header;
                    return Poll::Ready(Ok(()));
                }
            }
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for BoxReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        if this.ready.is_empty() {
            ready!(this.poll_frame(cx))?;
        }
        let n = this.ready.len().min(buf.remaining());
        buf.put_slice(&this.ready[..n]);
        this.ready.advance(n);
        Poll::Ready(Ok(()))
    }
}
