//! HTTP/1.1 message codec.
//!
//! - [`header`]: the incremental head parser and the head writer
//! - [`body`]: framing selection, the body decoders and encoders, and the
//!   [`ContentDecoder`]/[`ContentEncoder`] handles event handlers read and write bodies through
//!
//! The body codecs implement tokio-util's [`Decoder`](tokio_util::codec::Decoder) and
//! [`Encoder`](tokio_util::codec::Encoder) over `BytesMut`, end of stream is signalled
//! through `decode_eof`.
//!
//! ```
//! use bytes::BytesMut;
//! use nio_http::codec::{MessageWriter, PayloadDecoder};
//! use nio_http::protocol::{PayloadSize, ResponseHeader};
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut dst = BytesMut::new();
//! let head = ResponseHeader::new(http::StatusCode::OK, http::Version::HTTP_11);
//! MessageWriter.encode((head, PayloadSize::Chunked), &mut dst).unwrap();
//! assert!(dst.starts_with(b"HTTP/1.1 200 OK\r\n"));
//!
//! let mut body = BytesMut::from(&b"3\r\nabc\r\n0\r\n\r\n"[..]);
//! let mut decoder = PayloadDecoder::chunked();
//! let chunk = decoder.decode(&mut body).unwrap().unwrap();
//! assert_eq!(chunk.as_bytes().unwrap().as_ref(), b"abc");
//! ```

mod body;
mod header;

pub use body::*;
pub use header::*;
