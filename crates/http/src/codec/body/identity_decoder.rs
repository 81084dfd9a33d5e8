use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Body delimited by the peer closing the connection, legal for responses only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityDecoder {
    eof: bool,
}

impl IdentityDecoder {
    pub fn new() -> Self {
        Self { eof: false }
    }

    pub fn is_finished(&self) -> bool {
        self.eof
    }
}

impl Decoder for IdentityDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.eof {
            return Ok(Some(PayloadItem::Eof));
        }
        if src.is_empty() {
            return Ok(None);
        }
        Ok(Some(PayloadItem::Chunk(src.split().freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            return self.decode(src);
        }
        if !self.eof {
            trace!("identity body completed by end of stream");
            self.eof = true;
        }
        Ok(Some(PayloadItem::Eof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_until_end_of_stream() {
        let mut decoder = IdentityDecoder::new();
        let mut buffer = BytesMut::from(&b"some"[..]);

        assert_eq!(decoder.decode(&mut buffer).unwrap().unwrap().as_bytes().unwrap(), &b"some"[..]);
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b" body");
        assert_eq!(decoder.decode_eof(&mut buffer).unwrap().unwrap().as_bytes().unwrap(), &b" body"[..]);
        assert!(decoder.decode_eof(&mut buffer).unwrap().unwrap().is_eof());
        assert!(decoder.is_finished());
    }
}
