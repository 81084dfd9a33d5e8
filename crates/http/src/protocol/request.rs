//! HTTP request header handling implementation.
//!
//! This module provides the core abstractions for handling HTTP request headers.
//! It wraps the standard `http::Request` type so the same head type can be produced
//! by the parser on the server side and submitted by the application on the client side.

use bytes::{BufMut, BytesMut};
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

use crate::protocol::head::{MessageHead, version_str};
use crate::protocol::SendError;

/// Represents an HTTP request header.
///
/// This struct wraps a `http::Request<()>` to provide:
/// - Access to standard HTTP header fields
/// - Conversion from different request formats
/// - Request metadata inspection
#[derive(Debug, Clone)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Creates a request head from its request line, without headers.
    pub fn new(method: Method, uri: Uri, version: Version) -> Self {
        let mut inner = Request::new(());
        *inner.method_mut() = method;
        *inner.uri_mut() = uri;
        *inner.version_mut() = version;
        Self { inner }
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns a mutable reference to the request's headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }
}

impl MessageHead for RequestHeader {
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
        let uri = self.inner.uri();
        let target = match (uri.path_and_query(), uri.authority()) {
            (_, Some(authority)) if self.inner.method() == Method::CONNECT => authority.as_str(),
            (Some(path_and_query), _) if !path_and_query.as_str().is_empty() => path_and_query.as_str(),
            _ => "/",
        };

        dst.put_slice(self.inner.method().as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(target.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(version_str(self.inner.version())?.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_origin_form_start_line() {
        let header = RequestHeader::from(
            Request::get("http://localhost:8080/index.html?a=1").version(Version::HTTP_11).body(()).unwrap(),
        );

        let mut dst = BytesMut::new();
        header.encode_start_line(&mut dst).unwrap();

        assert_eq!(&dst[..], b"GET /index.html?a=1 HTTP/1.1\r\n");
    }

    #[test]
    fn encode_asterisk_form_start_line() {
        let header = RequestHeader::new(Method::OPTIONS, Uri::from_static("*"), Version::HTTP_10);

        let mut dst = BytesMut::new();
        header.encode_start_line(&mut dst).unwrap();

        assert_eq!(&dst[..], b"OPTIONS * HTTP/1.0\r\n");
    }
}
