use std::io;
use std::io::ErrorKind;

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::protocol::ParseError;
use crate::session::Session;

/// Outcome of one [`SessionInputBuffer::fill`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// bytes appended, zero when the session had nothing to offer or the buffer is full
    Read(usize),
    /// the peer closed its side of the channel
    Eof,
}

impl Fill {
    pub fn is_eof(&self) -> bool {
        matches!(self, Fill::Eof)
    }

    pub fn bytes_read(&self) -> usize {
        match self {
            Fill::Read(n) => *n,
            Fill::Eof => 0,
        }
    }
}

/// Inbound byte window of a connection.
///
/// Bytes are appended by [`fill`](Self::fill) and taken off the front by the message
/// parser (line by line) or by a body decoder (through [`buf_mut`](Self::buf_mut)).
#[derive(Debug, Default)]
pub struct SessionInputBuffer {
    buf: BytesMut,
    capacity: usize,
    eof: bool,
}

impl SessionInputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity), capacity, eof: false }
    }

    /// Reads once from the session into the free space of the buffer.
    pub fn fill<S: Session + ?Sized>(&mut self, session: &mut S) -> io::Result<Fill> {
        let start = self.buf.len();
        if start >= self.capacity {
            return Ok(Fill::Read(0));
        }

        self.buf.resize(self.capacity, 0);
        let result = session.read(&mut self.buf[start..]);
        match result {
            Ok(0) => {
                self.buf.truncate(start);
                self.eof = true;
                trace!("session reached end of stream");
                Ok(Fill::Eof)
            }
            Ok(n) => {
                self.buf.truncate(start + n);
                trace!(size = n, buffered = self.buf.len(), "filled input buffer");
                Ok(Fill::Read(n))
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                self.buf.truncate(start);
                Ok(Fill::Read(0))
            }
            Err(e) => {
                self.buf.truncate(start);
                Err(e)
            }
        }
    }

    /// Takes one LF or CRLF terminated line off the buffer, without its terminator.
    ///
    /// Returns `Ok(None)` while the line is incomplete. Once the session reached end of
    /// stream the unterminated remainder is returned as the last line.
    pub fn read_line(&mut self, max_line_length: usize) -> Result<Option<Bytes>, ParseError> {
        match self.buf.iter().position(|b| *b == b'\n') {
            Some(lf) => {
                let mut line = self.buf.split_to(lf + 1);
                line.truncate(lf);
                if line.last() == Some(&b'\r') {
                    line.truncate(lf - 1);
                }
                if line.len() > max_line_length {
                    return Err(ParseError::line_too_long(max_line_length));
                }
                Ok(Some(line.freeze()))
            }
            None => {
                if self.buf.len() > max_line_length || self.buf.len() >= self.capacity {
                    return Err(ParseError::line_too_long(max_line_length.min(self.capacity)));
                }
                if self.eof && !self.buf.is_empty() {
                    let line = self.buf.split().freeze();
                    return Ok(Some(line));
                }
                Ok(None)
            }
        }
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

    /// True once a `fill` observed end of stream.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub(crate) fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}
