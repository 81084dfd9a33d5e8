//! HTTP response header handling implementation.
//!
//! `ResponseHeader` wraps `http::Response<()>`, the header portion of a response
//! before a body is attached.

use bytes::{BufMut, BytesMut};
use http::response::Parts;
use http::{HeaderMap, Response, StatusCode, Version};

use crate::protocol::head::{MessageHead, version_str};
use crate::protocol::SendError;

#[derive(Debug, Clone)]
pub struct ResponseHeader {
    inner: Response<()>,
    reason: Option<String>,
}

impl AsRef<Response<()>> for ResponseHeader {
    fn as_ref(&self) -> &Response<()> {
        &self.inner
    }
}

impl AsMut<Response<()>> for ResponseHeader {
    fn as_mut(&mut self) -> &mut Response<()> {
        &mut self.inner
    }
}

impl ResponseHeader {
    pub fn new(status: StatusCode, version: Version) -> Self {
        let mut inner = Response::new(());
        *inner.status_mut() = status;
        *inner.version_mut() = version;
        Self { inner, reason: None }
    }

    /// Overrides the reason phrase written on the status line.
    ///
    /// Parsed responses keep the phrase the peer sent.
    #[must_use]
    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// The reason phrase, falling back to the canonical one for the status code.
    pub fn reason(&self) -> &str {
        match &self.reason {
            Some(reason) => reason,
            None => self.inner.status().canonical_reason().unwrap_or(""),
        }
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// 1xx responses precede the final response of an exchange.
    pub fn is_interim(&self) -> bool {
        self.inner.status().is_informational()
    }
}

impl MessageHead for ResponseHeader {
    fn version(&self) -> Version {
        self.inner.version()
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn encode_start_line(&self, dst: &mut BytesMut) -> Result<(), SendError> {
        dst.put_slice(version_str(self.inner.version())?.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.inner.status().as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.reason().as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

impl From<Parts> for ResponseHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Response::from_parts(parts, ()), reason: None }
    }
}

impl From<Response<()>> for ResponseHeader {
    #[inline]
    fn from(inner: Response<()>) -> Self {
        Self { inner, reason: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_status_line() {
        let header = ResponseHeader::new(StatusCode::OK, Version::HTTP_11);
        let mut dst = BytesMut::new();
        header.encode_start_line(&mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\n");
    }

    #[test]
    fn encode_custom_reason() {
        let header = ResponseHeader::new(StatusCode::NOT_FOUND, Version::HTTP_10).with_reason("Nope");
        let mut dst = BytesMut::new();
        header.encode_start_line(&mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.0 404 Nope\r\n");
    }

    #[test]
    fn http2_is_not_encodable() {
        let header = ResponseHeader::new(StatusCode::OK, Version::HTTP_2);
        let mut dst = BytesMut::new();
        assert!(header.encode_start_line(&mut dst).is_err());
    }
}
