use std::error::Error;
use std::io;
use thiserror::Error;

/// Top level error routed to an event handler's `exception` callback.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("protocol usage error: {source}")]
    Protocol {
        #[from]
        source: ProtocolError,
    },

    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: io::Error,
    },

    #[error("handler error: {source}")]
    Handler { source: Box<dyn Error + Send + Sync> },
}

impl HttpError {
    pub fn handler<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Handler { source: e.into() }
    }

    /// Returns the inbound framing error if this is one.
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self {
            HttpError::RequestError { source } => Some(source),
            _ => None,
        }
    }

    /// True when the error reports a body cut short by the peer closing the channel.
    pub fn is_truncated(&self) -> bool {
        self.as_parse_error().is_some_and(ParseError::is_truncated)
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("line length exceed the limit {max_length}")]
    LineTooLong { max_length: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid status line: {reason}")]
    InvalidStatus { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("unsupported transfer encoding: {encoding}")]
    UnsupportedTransferEncoding { encoding: String },

    #[error("malformed chunk coding: {reason}")]
    InvalidChunk { reason: String },

    #[error("truncated chunk, {remaining} bytes of chunk data still expected")]
    TruncatedChunk { remaining: u64 },

    #[error("premature end of content-length delimited body, {remaining} bytes still expected")]
    PrematureEndOfBody { remaining: u64 },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn line_too_long(max_length: usize) -> Self {
        Self::LineTooLong { max_length }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_status<S: ToString>(str: S) -> Self {
        Self::InvalidStatus { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_chunk<S: ToString>(str: S) -> Self {
        Self::InvalidChunk { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unsupported_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::UnsupportedTransferEncoding { encoding: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// True for faults caused by the peer closing the channel in the middle of a body.
    ///
    /// Callers that want to keep a short body can tolerate these, every other variant
    /// means the framing itself is broken.
    pub fn is_truncated(&self) -> bool {
        matches!(self, ParseError::TruncatedChunk { .. } | ParseError::PrematureEndOfBody { .. })
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("content encoder already completed")]
    EncoderCompleted,

    #[error("content-length mismatch, {remaining} declared bytes were never written")]
    LengthMismatch { remaining: u64 },

    #[error("request body must declare a content-length or use chunked coding")]
    IdentityRequestBody,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Misuse of a connection by the application, reported at the call site.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("request already submitted")]
    RequestAlreadySubmitted,

    #[error("response already submitted")]
    ResponseAlreadySubmitted,

    #[error("connection is closed")]
    ConnectionClosed,
}
