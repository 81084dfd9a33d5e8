use bytes::BytesMut;
use http::{HeaderMap, Version};
use std::io;
use std::io::ErrorKind;
use tracing::error;

use crate::protocol::SendError;

/// The parts of a request or response head the codec needs to write it out
/// and to pick the body framing for it.
pub trait MessageHead {
    fn version(&self) -> Version;

    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Writes the start line including its terminating CRLF.
    fn encode_start_line(&self, dst: &mut BytesMut) -> Result<(), SendError>;
}

pub(crate) fn version_str(version: Version) -> Result<&'static str, SendError> {
    match version {
        Version::HTTP_10 => Ok("HTTP/1.0"),
        Version::HTTP_11 => Ok("HTTP/1.1"),
        v => {
            error!(http_version = ?v, "unsupported http version");
            Err(io::Error::from(ErrorKind::Unsupported).into())
        }
    }
}
