use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

/// Unframed body, the end of the body is signalled by closing the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityEncoder {
    eof: bool,
}

impl IdentityEncoder {
    pub fn new() -> Self {
        Self { eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for IdentityEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Err(SendError::EncoderCompleted);
        }

        match item {
            PayloadItem::Chunk(bytes) => {
                dst.put(bytes);
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                Ok(())
            }
        }
    }
}
