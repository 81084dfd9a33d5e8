//! Message head writer.
//!
//! Serializes the start line, the header fields and the terminating empty line. The
//! framing headers are made to agree with the [`PayloadSize`] the head is sent with,
//! whatever the application put into the header map.

use crate::protocol::{MessageHead, PayloadSize, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, header};
use tokio_util::codec::Encoder;
use tracing::trace;

/// Initial buffer size allocated for head serialization
const INIT_HEADER_SIZE: usize = 1024;

const CHUNKED: HeaderValue = HeaderValue::from_static("chunked");

/// Writes one message head per `encode` call, the writer keeps no state between messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageWriter;

impl<H: MessageHead> Encoder<(H, PayloadSize)> for MessageWriter {
    type Error = SendError;

    fn encode(&mut self, item: (H, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;
        let start = dst.len();

        dst.reserve(INIT_HEADER_SIZE);
        head.encode_start_line(dst)?;

        let headers = head.headers_mut();
        match payload_size {
            PayloadSize::Length(n) => {
                headers.remove(header::TRANSFER_ENCODING);
                headers.insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Chunked => {
                headers.remove(header::CONTENT_LENGTH);
                headers.insert(header::TRANSFER_ENCODING, CHUNKED);
            }
            PayloadSize::Identity => {
                headers.remove(header::CONTENT_LENGTH);
                headers.remove(header::TRANSFER_ENCODING);
            }
            PayloadSize::Empty => {
                headers.remove(header::TRANSFER_ENCODING);
            }
        }

        for (header_name, header_value) in head.headers().iter() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");

        trace!(head_size = dst.len() - start, ?payload_size, "wrote message head");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RequestHeader, ResponseHeader};
    use http::{Method, StatusCode, Uri, Version};

    #[test]
    fn response_with_length() {
        let mut head = ResponseHeader::new(StatusCode::OK, Version::HTTP_11);
        head.headers_mut().insert(header::TRANSFER_ENCODING, CHUNKED);

        let mut dst = BytesMut::new();
        MessageWriter.encode((head, PayloadSize::Length(19)), &mut dst).unwrap();

        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\ncontent-length: 19\r\n\r\n");
    }

    #[test]
    fn request_with_chunked_body() {
        let mut head = RequestHeader::new(Method::POST, Uri::from_static("/upload?x=1"), Version::HTTP_11);
        head.headers_mut().insert(header::HOST, HeaderValue::from_static("localhost"));
        head.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));

        let mut dst = BytesMut::new();
        MessageWriter.encode((head, PayloadSize::Chunked), &mut dst).unwrap();

        assert_eq!(&dst[..], b"POST /upload?x=1 HTTP/1.1\r\nhost: localhost\r\ntransfer-encoding: chunked\r\n\r\n");
    }

    #[test]
    fn empty_payload_keeps_declared_length() {
        let mut head = ResponseHeader::new(StatusCode::OK, Version::HTTP_11);
        head.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));

        let mut dst = BytesMut::new();
        MessageWriter.encode((head, PayloadSize::Empty), &mut dst).unwrap();

        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\ncontent-length: 42\r\n\r\n");
    }
}
