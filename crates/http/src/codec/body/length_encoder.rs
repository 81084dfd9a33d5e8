use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
    eof: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length, eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }

    /// Declared bytes not written yet.
    pub fn remaining(&self) -> u64 {
        self.length
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            warn!("encode payload_item but the body is already complete");
            return Err(SendError::EncoderCompleted);
        }

        match item {
            PayloadItem::Chunk(bytes) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }
                let size = bytes.remaining();
                if size as u64 > self.length {
                    return Err(SendError::invalid_body(format!(
                        "{size} bytes exceed the remaining content-length {}",
                        self.length
                    )));
                }
                dst.reserve(size);
                dst.put(bytes);
                self.length -= size as u64;
                Ok(())
            }
            PayloadItem::Eof => {
                if self.length > 0 {
                    return Err(SendError::LengthMismatch { remaining: self.length });
                }
                self.eof = true;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn writes_exactly_declared_length() {
        let mut encoder = LengthEncoder::new(5);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"abc")), &mut dst).unwrap();
        let err = encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap_err();
        assert!(matches!(err, SendError::LengthMismatch { remaining: 2 }));

        assert!(encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"def")), &mut dst).is_err());

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"de")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        assert!(encoder.is_finish());
        assert_eq!(&dst[..], b"abcde");
    }

    #[test]
    fn chained_buffer_counts_every_segment() {
        let mut encoder = LengthEncoder::new(4);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"ab").chain(Bytes::from_static(b"cd"))), &mut dst).unwrap();
        assert_eq!(&dst[..], b"abcd");
        assert_eq!(encoder.remaining(), 0);

        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        assert!(encoder.is_finish());
    }
}
