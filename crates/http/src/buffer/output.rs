use std::io;
use std::io::ErrorKind;

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::session::Session;

/// Outbound byte window of a connection.
///
/// Message heads are written regardless of the capacity (a head has to go out as a
/// whole), body bytes only up to [`remaining_capacity`](Self::remaining_capacity).
#[derive(Debug, Default)]
pub struct SessionOutputBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl SessionOutputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity), capacity }
    }

    /// Writes buffered bytes to the session until it stops accepting them.
    pub fn flush<S: Session + ?Sized>(&mut self, session: &mut S) -> io::Result<usize> {
        let mut written = 0;
        while !self.buf.is_empty() {
            match session.write(&self.buf) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => {
                    self.buf.advance(n);
                    written += n;
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => break,
                Err(e) => return Err(e),
            }
        }

        if written > 0 {
            trace!(size = written, pending = self.buf.len(), "flushed output buffer");
        }
        Ok(written)
    }

    /// Appends as much of `src` as fits, returns the number of bytes taken.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.remaining_capacity());
        self.buf.extend_from_slice(&src[..n]);
        n
    }

    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.buf.len())
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        !self.buf.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub(crate) fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::QueueSession;

    #[test]
    fn write_is_bounded_by_capacity() {
        let mut buffer = SessionOutputBuffer::new(4);
        assert_eq!(buffer.write(b"abcdef"), 4);
        assert_eq!(buffer.remaining_capacity(), 0);
        assert_eq!(buffer.write(b"gh"), 0);
    }

    #[test]
    fn flush_stops_when_session_blocks() {
        let mut session = QueueSession { write_limit: 3, ..Default::default() };
        let mut buffer = SessionOutputBuffer::new(16);
        buffer.write(b"hello world");

        assert_eq!(buffer.flush(&mut session).unwrap(), 11);
        assert_eq!(session.outgoing, b"hello world");
        assert!(!buffer.has_data());

        session.write_limit = 0;
        buffer.write(b"more");
        assert_eq!(buffer.flush(&mut session).unwrap(), 0);
        assert_eq!(buffer.len(), 4);
    }
}
