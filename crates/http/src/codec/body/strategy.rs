//! Body framing selection for inbound messages.
//!
//! refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>

use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, Method, StatusCode};

use crate::protocol::{ParseError, PayloadSize, RequestHeader, ResponseHeader};

/// Framing of a request body.
///
/// A request without framing headers has no body, a request can never be delimited by
/// closing the connection.
pub fn request_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    let headers = header.headers();
    if !headers.contains_key(TRANSFER_ENCODING) {
        return Ok(content_length(headers)?.map_or(PayloadSize::new_empty(), PayloadSize::new_length));
    }
    match final_coding(headers) {
        Some(coding) if coding.eq_ignore_ascii_case(CHUNKED) => Ok(PayloadSize::new_chunked()),
        coding => Err(ParseError::unsupported_transfer_encoding(String::from_utf8_lossy(coding.unwrap_or_default()))),
    }
}

/// Framing of a response body, `request_method` is the method of the request it answers.
pub fn response_payload(header: &ResponseHeader, request_method: Option<&Method>) -> Result<PayloadSize, ParseError> {
    let status = header.status();
    if request_method == Some(&Method::HEAD) || !status_has_body(status) {
        return Ok(PayloadSize::new_empty());
    }

    let headers = header.headers();
    if !headers.contains_key(TRANSFER_ENCODING) {
        return Ok(content_length(headers)?.map_or(PayloadSize::new_identity(), PayloadSize::new_length));
    }
    match final_coding(headers) {
        Some(coding) if coding.eq_ignore_ascii_case(CHUNKED) => Ok(PayloadSize::new_chunked()),
        // chunked not being the final coding means the body runs until the connection closes
        _ => Ok(PayloadSize::new_identity()),
    }
}

/// 1xx, 204 and 304 responses never carry a body.
pub fn status_has_body(status: StatusCode) -> bool {
    !(status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED)
}

/// Parses every Content-Length field, repeated values have to agree.
fn content_length(headers: &HeaderMap) -> Result<Option<u64>, ParseError> {
    let mut length = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        let cl_str = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
        for part in cl_str.split(',') {
            let part = part.trim();
            let parsed =
                part.parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {part} is not u64")))?;
            match length {
                Some(previous) if previous != parsed => {
                    return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {parsed}")));
                }
                _ => length = Some(parsed),
            }
        }
    }
    Ok(length)
}

const CHUNKED: &[u8] = b"chunked";

/// The last coding listed over every Transfer-Encoding field line.
///
/// According to RFC 9112, chunked must be the last encoding if present, and
/// repeated field lines form one list.
fn final_coding(headers: &HeaderMap) -> Option<&[u8]> {
    headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .flat_map(|value| value.as_bytes().split(|b| *b == b','))
        .map(<[u8]>::trim_ascii)
        .filter(|coding| !coding.is_empty())
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Uri, Version};

    fn request(headers: &[(&'static str, &'static str)]) -> RequestHeader {
        let mut header = RequestHeader::new(Method::POST, Uri::from_static("/"), Version::HTTP_11);
        for (name, value) in headers {
            header.headers_mut().append(*name, HeaderValue::from_static(value));
        }
        header
    }

    fn response(status: StatusCode, headers: &[(&'static str, &'static str)]) -> ResponseHeader {
        let mut header = ResponseHeader::new(status, Version::HTTP_11);
        for (name, value) in headers {
            header.headers_mut().append(*name, HeaderValue::from_static(value));
        }
        header
    }

    #[test]
    fn final_coding_spans_field_lines() {
        let codings = |values: &[&'static str]| {
            let mut headers = HeaderMap::new();
            for value in values {
                headers.append(TRANSFER_ENCODING, HeaderValue::from_static(value));
            }
            final_coding(&headers).map(<[u8]>::to_vec)
        };

        assert_eq!(codings(&[]), None);
        assert_eq!(codings(&["gzip, chunked"]).as_deref(), Some(&b"chunked"[..]));
        assert_eq!(codings(&["Chunked"]).as_deref(), Some(&b"Chunked"[..]));
        assert_eq!(codings(&["chunked, gzip"]).as_deref(), Some(&b"gzip"[..]));
        assert_eq!(codings(&["gzip", "chunked"]).as_deref(), Some(&b"chunked"[..]));
        assert_eq!(codings(&["chunked", "gzip"]).as_deref(), Some(&b"gzip"[..]));
    }

    #[test]
    fn chunked_on_a_later_field_line_frames_the_body() {
        let split = request(&[("transfer-encoding", "gzip"), ("transfer-encoding", "chunked")]);
        assert_eq!(request_payload(&split).unwrap(), PayloadSize::Chunked);

        let split = request(&[("transfer-encoding", "chunked"), ("transfer-encoding", "gzip")]);
        assert!(matches!(request_payload(&split).unwrap_err(), ParseError::UnsupportedTransferEncoding { .. }));

        let split = response(StatusCode::OK, &[("transfer-encoding", "gzip"), ("transfer-encoding", "chunked")]);
        assert_eq!(response_payload(&split, Some(&Method::GET)).unwrap(), PayloadSize::Chunked);

        let split = response(StatusCode::OK, &[("transfer-encoding", "chunked"), ("transfer-encoding", "gzip")]);
        assert_eq!(response_payload(&split, Some(&Method::GET)).unwrap(), PayloadSize::Identity);
    }

    #[test]
    fn request_framing() {
        assert_eq!(request_payload(&request(&[])).unwrap(), PayloadSize::Empty);
        assert_eq!(request_payload(&request(&[("content-length", "16")])).unwrap(), PayloadSize::Length(16));
        assert_eq!(request_payload(&request(&[("content-length", "16"), ("content-length", "16")])).unwrap(), PayloadSize::Length(16));
        assert_eq!(request_payload(&request(&[("transfer-encoding", "chunked")])).unwrap(), PayloadSize::Chunked);

        // chunked takes precedence over content-length
        let both = request(&[("content-length", "16"), ("transfer-encoding", "chunked")]);
        assert_eq!(request_payload(&both).unwrap(), PayloadSize::Chunked);
    }

    #[test]
    fn request_framing_errors() {
        let err = request_payload(&request(&[("transfer-encoding", "identity")])).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedTransferEncoding { .. }));

        let err = request_payload(&request(&[("content-length", "-1")])).unwrap_err();
        assert!(matches!(err, ParseError::InvalidContentLength { .. }));

        let err = request_payload(&request(&[("content-length", "3"), ("content-length", "4")])).unwrap_err();
        assert!(matches!(err, ParseError::InvalidContentLength { .. }));
    }

    #[test]
    fn response_framing() {
        assert_eq!(response_payload(&response(StatusCode::OK, &[]), Some(&Method::GET)).unwrap(), PayloadSize::Identity);
        assert_eq!(
            response_payload(&response(StatusCode::OK, &[("transfer-encoding", "gzip")]), None).unwrap(),
            PayloadSize::Identity
        );
        assert_eq!(
            response_payload(&response(StatusCode::OK, &[("content-length", "19")]), Some(&Method::GET)).unwrap(),
            PayloadSize::Length(19)
        );
        assert_eq!(
            response_payload(&response(StatusCode::OK, &[("content-length", "19")]), Some(&Method::HEAD)).unwrap(),
            PayloadSize::Empty
        );
        for status in [StatusCode::CONTINUE, StatusCode::NO_CONTENT, StatusCode::NOT_MODIFIED] {
            assert_eq!(
                response_payload(&response(status, &[("transfer-encoding", "chunked")]), None).unwrap(),
                PayloadSize::Empty
            );
        }
    }
}
