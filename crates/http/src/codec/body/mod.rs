//! HTTP body framing.
//!
//! # Components
//!
//! ## Framing selection
//! - [`request_payload`] / [`response_payload`]: pick `NONE`, `LENGTH(n)`, `CHUNKED` or
//!   `IDENTITY` from the head of an inbound message
//!
//! ## Decoders
//! - [`ChunkedDecoder`]: chunked transfer coding, trailers included
//! - [`LengthDecoder`]: fixed-length payloads
//! - [`IdentityDecoder`]: payloads delimited by the connection close
//! - [`PayloadDecoder`]: dispatches to one of the above
//!
//! ## Encoders
//! - [`ChunkedEncoder`], [`LengthEncoder`], [`IdentityEncoder`] and [`PayloadEncoder`]
//!
//! ## Body I/O handles
//! - [`ContentDecoder`] / [`ContentEncoder`] borrow a session buffer plus the framing
//!   state for one event handler callback

mod chunked_decoder;
mod chunked_encoder;
mod content;
mod identity_decoder;
mod identity_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;
mod strategy;

pub use chunked_decoder::ChunkedDecoder;
pub use chunked_encoder::ChunkedEncoder;
pub use content::ContentDecoder;
pub use content::ContentEncoder;
pub use content::TruncationPolicy;
pub use identity_decoder::IdentityDecoder;
pub use identity_encoder::IdentityEncoder;
pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
pub use strategy::request_payload;
pub use strategy::response_payload;
pub use strategy::status_has_body;
