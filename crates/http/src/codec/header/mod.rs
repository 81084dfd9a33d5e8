//! Message head processing.
//!
//! - [`MessageParser`]: incremental parser pulling lines off a session input buffer
//! - [`MessageWriter`]: serializes a head and aligns its framing headers with the body

mod header_decoder;
mod header_encoder;

pub use header_decoder::MessageParser;
pub use header_decoder::ParseHead;
pub use header_decoder::RequestParser;
pub use header_decoder::ResponseParser;
pub use header_encoder::MessageWriter;
