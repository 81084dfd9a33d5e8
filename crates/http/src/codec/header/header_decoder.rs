//! Incremental message head parser.
//!
//! The parser pulls whole lines off a [`SessionInputBuffer`] and keeps them until the
//! empty line closing the head shows up, so it can be called again after every `fill`
//! no matter where the channel split the bytes. The collected head is then handed to
//! `httparse` once and converted into the typed `http` representation.
//!
//! Limits come from [`MessageConstraints`]: the length of a single line, the number of
//! header fields and the size of the whole head.

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, Version};
use httparse::{Error, Status};
use tracing::trace;

use crate::buffer::SessionInputBuffer;
use crate::config::MessageConstraints;
use crate::ensure;
use crate::protocol::{ParseError, RequestHeader, ResponseHeader};

/// A message head that can be built from a complete, CRLF terminated head block.
pub trait ParseHead: Sized {
    /// Whether header values may continue on lines starting with SP or HT.
    const ALLOW_LINE_FOLDING: bool;

    fn parse_head(head: Bytes, max_headers: usize) -> Result<Self, ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    StartLine,
    Headers,
    Complete,
}

/// Line oriented head parser, `START_LINE -> HEADERS -> COMPLETE`.
#[derive(Debug)]
pub struct MessageParser<H> {
    constraints: MessageConstraints,
    state: ParserState,
    head: BytesMut,
    header_count: usize,
    _head: PhantomData<fn() -> H>,
}

pub type RequestParser = MessageParser<RequestHeader>;
pub type ResponseParser = MessageParser<ResponseHeader>;

impl<H: ParseHead> MessageParser<H> {
    pub fn new(constraints: MessageConstraints) -> Self {
        Self { constraints, state: ParserState::StartLine, head: BytesMut::new(), header_count: 0, _head: PhantomData }
    }

    /// Consumes complete lines from `buffer`.
    ///
    /// Returns the message once its head is complete, `Ok(None)` while more input is
    /// needed. After a message was returned the parser yields nothing until [`reset`](Self::reset).
    pub fn parse(&mut self, buffer: &mut SessionInputBuffer) -> Result<Option<H>, ParseError> {
        while self.state != ParserState::Complete {
            let Some(line) = buffer.read_line(self.constraints.max_line_length)? else {
                return Ok(None);
            };

            match self.state {
                ParserState::StartLine => {
                    // tolerate empty lines ahead of the start line
                    if line.is_empty() {
                        continue;
                    }
                    self.push_line(&line)?;
                    self.state = ParserState::Headers;
                }
                ParserState::Headers if line.is_empty() => {
                    self.head.extend_from_slice(b"\r\n");
                    self.state = ParserState::Complete;

                    let head = self.head.split().freeze();
                    trace!(head_size = head.len(), header_count = self.header_count, "parsed message head");
                    return H::parse_head(head, self.constraints.max_header_count).map(Some);
                }
                ParserState::Headers => {
                    let folded = matches!(line[0], b' ' | b'\t');
                    if folded {
                        ensure!(H::ALLOW_LINE_FOLDING, ParseError::invalid_header("obsolete line folding"));
                    } else {
                        self.header_count += 1;
                        ensure!(
                            self.header_count <= self.constraints.max_header_count,
                            ParseError::too_many_headers(self.constraints.max_header_count)
                        );
                    }
                    self.push_line(&line)?;
                }
                ParserState::Complete => break,
            }
        }
        Ok(None)
    }

    /// True while part of a head has been consumed but the head is not complete yet.
    pub fn is_in_progress(&self) -> bool {
        self.state == ParserState::Headers
    }

    pub fn reset(&mut self) {
        self.state = ParserState::StartLine;
        self.head.clear();
        self.header_count = 0;
    }

    fn push_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let head_size = self.head.len() + line.len() + 2;
        ensure!(
            head_size <= self.constraints.max_head_size,
            ParseError::too_large_header(head_size, self.constraints.max_head_size)
        );
        self.head.extend_from_slice(line);
        self.head.extend_from_slice(b"\r\n");
        Ok(())
    }
}

impl ParseHead for RequestHeader {
    const ALLOW_LINE_FOLDING: bool = false;

    fn parse_head(head: Bytes, max_headers: usize) -> Result<Self, ParseError> {
        let mut headers = vec![httparse::EMPTY_HEADER; max_headers];
        let mut req = httparse::Request::new(&mut headers);

        match req.parse(&head).map_err(|e| map_httparse_error(e, max_headers))? {
            Status::Complete(_) => {}
            Status::Partial => return Err(ParseError::invalid_header("incomplete request head")),
        }

        let version = parse_version(req.version)?;
        let method = Method::from_bytes(req.method.ok_or(ParseError::InvalidMethod)?.as_bytes())
            .map_err(|_| ParseError::InvalidMethod)?;
        let uri = Uri::try_from(req.path.ok_or(ParseError::InvalidUri)?).map_err(|_| ParseError::InvalidUri)?;

        let mut header = RequestHeader::new(method, uri, version);
        append_headers(&head, req.headers, header.headers_mut())?;
        Ok(header)
    }
}

impl ParseHead for ResponseHeader {
    const ALLOW_LINE_FOLDING: bool = true;

    fn parse_head(head: Bytes, max_headers: usize) -> Result<Self, ParseError> {
        let mut headers = vec![httparse::EMPTY_HEADER; max_headers];
        let mut res = httparse::Response::new(&mut headers);

        let parsed = httparse::ParserConfig::default()
            .allow_obsolete_multiline_headers_in_responses(true)
            .parse_response(&mut res, &head)
            .map_err(|e| map_httparse_error(e, max_headers))?;
        if parsed.is_partial() {
            return Err(ParseError::invalid_header("incomplete response head"));
        }

        let version = parse_version(res.version)?;
        let code = res.code.ok_or_else(|| ParseError::invalid_status("missing status code"))?;
        let status = StatusCode::from_u16(code).map_err(|_| ParseError::invalid_status(format!("status code {code}")))?;

        let mut header = ResponseHeader::new(status, version);
        if let Some(reason) = res.reason.filter(|r| Some(*r) != status.canonical_reason()) {
            header = header.with_reason(reason);
        }
        append_headers(&head, res.headers, header.headers_mut())?;
        Ok(header)
    }
}

fn parse_version(version: Option<u8>) -> Result<Version, ParseError> {
    match version {
        Some(0) => Ok(Version::HTTP_10),
        Some(1) => Ok(Version::HTTP_11),
        v => Err(ParseError::InvalidVersion(v)),
    }
}

fn map_httparse_error(e: Error, max_headers: usize) -> ParseError {
    match e {
        Error::TooManyHeaders => ParseError::too_many_headers(max_headers),
        Error::Version => ParseError::InvalidVersion(None),
        Error::Status => ParseError::invalid_status(e),
        Error::Token => ParseError::InvalidMethod,
        e => ParseError::invalid_header(e),
    }
}

fn append_headers(head: &Bytes, parsed: &[httparse::Header<'_>], dst: &mut HeaderMap) -> Result<(), ParseError> {
    dst.reserve(parsed.len());
    for header in parsed {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
        dst.append(name, header_value(head, header.value)?);
    }
    Ok(())
}

/// Shares the value bytes with the head, folded values are unfolded into a copy.
fn header_value(head: &Bytes, value: &[u8]) -> Result<HeaderValue, ParseError> {
    if value.iter().any(|b| matches!(b, b'\r' | b'\n')) {
        let unfolded: Vec<u8> =
            value.iter().filter(|b| **b != b'\r').map(|b| if *b == b'\n' { b' ' } else { *b }).collect();
        return HeaderValue::from_bytes(&unfolded).map_err(ParseError::invalid_header);
    }
    HeaderValue::from_maybe_shared(head.slice_ref(value)).map_err(ParseError::invalid_header)
}
