//! Core HTTP protocol types.
//!
//! - **Heads** ([`RequestHeader`], [`ResponseHeader`]) wrap the `http` crate types and
//!   implement [`MessageHead`] so the codec can write them out and pick their framing.
//! - **Payload** ([`PayloadItem`], [`PayloadSize`]): body chunks and the body framing
//!   (`NONE`, `LENGTH(n)`, `CHUNKED`, `IDENTITY`).
//! - **Errors** ([`HttpError`], [`ParseError`], [`SendError`], [`ProtocolError`]).

mod message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod head;
pub use head::MessageHead;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHeader;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::ProtocolError;
pub use error::SendError;
