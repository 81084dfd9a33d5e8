//! Body I/O handles handed to event handlers.
//!
//! A [`ContentDecoder`] or [`ContentEncoder`] only borrows the session buffer and the
//! framing state of the connection for the duration of one callback. Neither moves bytes
//! to or from the session, the connection does that around the callback.

use bytes::BytesMut;
use http::HeaderMap;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

use crate::buffer::{SessionInputBuffer, SessionOutputBuffer};
use crate::codec::body::{PayloadDecoder, PayloadEncoder};
use crate::ensure;
use crate::protocol::{ParseError, PayloadItem, SendError};

/// What a [`ContentDecoder`] does when the peer closes the channel in the middle of a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TruncationPolicy {
    /// Report [`ParseError::TruncatedChunk`] or [`ParseError::PrematureEndOfBody`].
    #[default]
    Strict,
    /// Treat the bytes received so far as the complete, short body.
    Lenient,
}

#[derive(Debug)]
pub struct ContentDecoder<'a> {
    buffer: &'a mut SessionInputBuffer,
    decoder: &'a mut PayloadDecoder,
}

impl<'a> ContentDecoder<'a> {
    pub(crate) fn new(buffer: &'a mut SessionInputBuffer, decoder: &'a mut PayloadDecoder) -> Self {
        Self { buffer, decoder }
    }

    /// Moves the buffered body bytes into `dst`, stopping at the frame boundary.
    ///
    /// Truncation by the peer is an error, see [`read_with`](Self::read_with).
    pub fn read(&mut self, dst: &mut BytesMut) -> Result<usize, ParseError> {
        self.read_with(dst, TruncationPolicy::Strict)
    }

    pub fn read_with(&mut self, dst: &mut BytesMut, policy: TruncationPolicy) -> Result<usize, ParseError> {
        let mut read = 0;
        while !self.decoder.is_finished() {
            let eof = self.buffer.is_eof();
            let src = self.buffer.buf_mut();
            let item = if eof { self.decoder.decode_eof(src) } else { self.decoder.decode(src) };

            match item {
                Ok(Some(PayloadItem::Chunk(bytes))) => {
                    dst.extend_from_slice(&bytes);
                    read += bytes.len();
                }
                Ok(Some(PayloadItem::Eof)) | Ok(None) => break,
                Err(e) if e.is_truncated() && policy == TruncationPolicy::Lenient => {
                    warn!(cause = %e, "body truncated by peer, keeping the partial body");
                    *self.decoder = PayloadDecoder::empty();
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        trace!(size = read, completed = self.decoder.is_finished(), "decoded body bytes");
        Ok(read)
    }

    pub fn is_completed(&self) -> bool {
        self.decoder.is_finished()
    }

    /// Trailer fields of a chunked body, once it is complete.
    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.decoder.trailers()
    }
}

#[derive(Debug)]
pub struct ContentEncoder<'a> {
    buffer: &'a mut SessionOutputBuffer,
    encoder: &'a mut PayloadEncoder,
    fragment_size_hint: usize,
}

impl<'a> ContentEncoder<'a> {
    pub(crate) fn new(
        buffer: &'a mut SessionOutputBuffer,
        encoder: &'a mut PayloadEncoder,
        fragment_size_hint: usize,
    ) -> Self {
        Self { buffer, encoder, fragment_size_hint }
    }

    /// Frames as much of `src` as the output buffer takes, returns the number of bytes taken.
    ///
    /// `Ok(0)` means the output buffer is full, write again from the next `output_ready`.
    pub fn write(&mut self, src: &[u8]) -> Result<usize, SendError> {
        ensure!(!self.encoder.is_finish(), SendError::EncoderCompleted);
        if self.encoder.is_fix_length() {
            let remaining = self.encoder.remaining();
            ensure!(
                src.len() as u64 <= remaining,
                SendError::invalid_body(format!("{} bytes exceed the remaining content-length {remaining}", src.len()))
            );
        }

        let space = self.buffer.remaining_capacity().min(self.fragment_size_hint);
        let mut n = self.encoder.writable(space);
        if n == 0 && self.buffer.is_empty() {
            // no flush can make room, let one frame overshoot a buffer smaller than the framing
            n = space.max(1);
        }
        let n = n.min(src.len());
        if n == 0 {
            return Ok(0);
        }

        self.encoder.encode(PayloadItem::Chunk(&src[..n]), self.buffer.buf_mut())?;
        Ok(n)
    }

    /// Ends the body, writing the last chunk for chunked framing.
    pub fn complete(&mut self) -> Result<(), SendError> {
        self.encoder.encode(PayloadItem::<&[u8]>::Eof, self.buffer.buf_mut())
    }

    pub fn is_completed(&self) -> bool {
        self.encoder.is_finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::QueueSession;

    fn input_of(bytes: &[u8], eof: bool) -> SessionInputBuffer {
        let mut session = QueueSession::with_input(bytes);
        session.eof = eof;
        let mut buffer = SessionInputBuffer::new(1024);
        buffer.fill(&mut session).unwrap();
        if eof {
            buffer.fill(&mut session).unwrap();
        }
        buffer
    }

    #[test]
    fn decoder_stops_at_frame_boundary() {
        let mut buffer = input_of(b"blah blah blah\r\nGET / HTTP/1.1\r\n", false);
        let mut decoder = PayloadDecoder::fix_length(16);
        let mut dst = BytesMut::new();

        let mut content = ContentDecoder::new(&mut buffer, &mut decoder);
        assert_eq!(content.read(&mut dst).unwrap(), 16);
        assert!(content.is_completed());
        assert_eq!(&dst[..], b"blah blah blah\r\n");
        assert_eq!(buffer.len(), 16);
    }

    #[test]
    fn truncation_policy() {
        let mut buffer = input_of(b"a\r\n12345", true);
        let mut decoder = PayloadDecoder::chunked();
        let mut dst = BytesMut::new();
        let err = ContentDecoder::new(&mut buffer, &mut decoder).read(&mut dst).unwrap_err();
        assert!(matches!(err, ParseError::TruncatedChunk { remaining: 5 }));

        let mut buffer = input_of(b"a\r\n12345", true);
        let mut decoder = PayloadDecoder::chunked();
        let mut dst = BytesMut::new();
        let mut content = ContentDecoder::new(&mut buffer, &mut decoder);
        assert_eq!(content.read_with(&mut dst, TruncationPolicy::Lenient).unwrap(), 5);
        assert!(content.is_completed());
        assert_eq!(&dst[..], b"12345");
    }

    #[test]
    fn lenient_policy_does_not_hide_malformed_coding() {
        let mut buffer = input_of(b"zz\r\n", true);
        let mut decoder = PayloadDecoder::chunked();
        let mut dst = BytesMut::new();
        let err = ContentDecoder::new(&mut buffer, &mut decoder).read_with(&mut dst, TruncationPolicy::Lenient).unwrap_err();
        assert!(matches!(err, ParseError::InvalidChunk { .. }));
    }

    #[test]
    fn encoder_respects_capacity() {
        let mut buffer = SessionOutputBuffer::new(8);
        let mut encoder = PayloadEncoder::identity();
        let mut content = ContentEncoder::new(&mut buffer, &mut encoder, 1024);

        assert_eq!(content.write(b"0123456789").unwrap(), 8);
        assert_eq!(content.write(b"89").unwrap(), 0);
        content.complete().unwrap();
        assert!(content.is_completed());
        assert!(matches!(content.write(b"x").unwrap_err(), SendError::EncoderCompleted));
    }

    #[test]
    fn encoder_rejects_bytes_past_content_length() {
        let mut buffer = SessionOutputBuffer::new(64);
        let mut encoder = PayloadEncoder::fix_length(4);
        let mut content = ContentEncoder::new(&mut buffer, &mut encoder, 64);

        assert!(content.write(b"12345").is_err());
        assert_eq!(content.write(b"1234").unwrap(), 4);
        content.complete().unwrap();
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn chunked_encoder_leaves_room_for_framing() {
        let mut buffer = SessionOutputBuffer::new(64);
        let mut encoder = PayloadEncoder::chunked();
        let mut content = ContentEncoder::new(&mut buffer, &mut encoder, 64);

        let body = [b'x'; 100];
        let n = content.write(&body).unwrap();
        assert_eq!(n, 64 - 25);
        content.complete().unwrap();
        assert!(buffer.len() <= 64 + 5);
    }

    #[test]
    fn chunked_encoder_progresses_in_a_tiny_buffer() {
        let mut session = QueueSession::default();
        let mut buffer = SessionOutputBuffer::new(16);
        let mut encoder = PayloadEncoder::chunked();

        let mut content = ContentEncoder::new(&mut buffer, &mut encoder, 16);
        assert_eq!(content.write(b"0123456789abcdefXYZ").unwrap(), 16);
        assert_eq!(content.write(b"XYZ").unwrap(), 0);
        buffer.flush(&mut session).unwrap();

        let mut content = ContentEncoder::new(&mut buffer, &mut encoder, 16);
        assert_eq!(content.write(b"XYZ").unwrap(), 3);
        content.complete().unwrap();
        buffer.flush(&mut session).unwrap();

        assert_eq!(session.outgoing, b"10\r\n0123456789abcdef\r\n3\r\nXYZ\r\n0\r\n\r\n");
    }
}
