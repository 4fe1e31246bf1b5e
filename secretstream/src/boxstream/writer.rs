//! Async box-stream encoder.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Buf, BytesMut};
use tokio::io::AsyncWrite;

use super::codec::FrameSealer;
use super::nonce::NONCE_LENGTH;
use super::{HEADER_LENGTH, MAX_SEGMENT_SIZE};
use crate::error::TerminalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Open,
    /// Goodbye sealed into the pending buffer, transport not yet shut down.
    Closing,
    Closed,
}

/// Seals everything written to it into box-stream frames on `inner`.
///
/// Each `poll_write` seals at most one frame. Sealed bytes are buffered until
/// the transport accepts them; call `flush` to push them out. Shutting the
/// writer down sends the goodbye frame exactly once and then shuts down
/// `inner`.
pub struct BoxWriter<W> {
    inner: W,
    sealer: FrameSealer,
    max_segment_size: usize,
    pending: BytesMut,
    state: WriterState,
    failed: Option<TerminalError>,
}

impl<W: AsyncWrite + Unpin> BoxWriter<W> {
    pub fn new(inner: W, key: &[u8; 32], nonce: [u8; NONCE_LENGTH]) -> Self {
        Self::with_max_segment_size(inner, key, nonce, MAX_SEGMENT_SIZE)
    }

    /// `max_segment_size` is clamped to 1..=4096.
    pub fn with_max_segment_size(
        inner: W,
        key: &[u8; 32],
        nonce: [u8; NONCE_LENGTH],
        max_segment_size: usize,
    ) -> Self {
        let max_segment_size = max_segment_size.clamp(1, MAX_SEGMENT_SIZE);
        Self {
            inner,
            sealer: FrameSealer::new(key, nonce),
            max_segment_size,
            pending: BytesMut::with_capacity(HEADER_LENGTH + max_segment_size),
            state: WriterState::Open,
            failed: None,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// True once the goodbye frame has been handed to the transport.
    pub fn is_closed(&self) -> bool {
        self.state == WriterState::Closed
    }

    /// The first transport error this writer hit, if any.
    pub fn terminal_error(&self) -> Option<io::Error> {
        self.failed.as_ref().map(TerminalError::to_io_error)
    }

    fn check_failed(&self) -> io::Result<()> {
        match self.terminal_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&mut self, err: io::Error) -> io::Error {
        if self.failed.is_none() {
            self.failed = Some(TerminalError::capture(&err));
        }
        err
    }

    /// Write out buffered frames.
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while !self.pending.is_empty() {
            let written = match ready!(Pin::new(&mut self.inner).poll_write(cx, &self.pending)) {
                Ok(0) => {
                    return Poll::Ready(Err(
                        self.record(io::Error::from(io::ErrorKind::WriteZero))
                    ))
                }
                Ok(n) => n,
                Err(e) => return Poll::Ready(Err(self.record(e))),
            };
            self.pending.advance(written);
        }
        Poll::Ready(Ok(()))
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for BoxWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.check_failed()?;
        if this.state != WriterState::Open {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "box-stream writer is closed",
            )));
        }

        ready!(this.poll_drain(cx))?;
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let n = buf.len().min(this.max_segment_size);
        this.sealer
            .seal_into(&buf[..n], &mut this.pending)
            .map_err(io::Error::from)?;

        // Push the frame out if the transport has room; otherwise it goes
        // with the next write or flush. The segment is already accepted, so a
        // drain error is left in `failed` for the next call to report.
        match this.poll_drain(cx) {
            Poll::Ready(Err(err)) => {
                tracing::debug!(error = %err, "box-stream drain failed after seal");
            }
            Poll::Ready(Ok(())) | Poll::Pending => {}
        }
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.check_failed()?;
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.check_failed()?;
        if this.state == WriterState::Open {
            this.sealer
                .seal_goodbye_into(&mut this.pending)
                .map_err(io::Error::from)?;
            this.state = WriterState::Closing;
        }
        if this.state == WriterState::Closing {
            ready!(this.poll_drain(cx))?;
            tracing::debug!("box-stream goodbye sent");
            this.state = WriterState::Closed;
        }
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}
