//! Raw request parsing for the line-oriented SBI wire protocol.
//!
//! A request is a block of header-style lines terminated by an empty line,
//! optionally followed by exactly `Content-Length` bytes of JSON. The verb is
//! the first token of the request line, before the `HTTP/1.1` marker.

use std::io::{self, BufRead, Read};

use thiserror::Error;

/// Maximum size of the header block in bytes.
pub(crate) const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Maximum size of a request body in bytes.
pub(crate) const MAX_BODY_BYTES: usize = 1024 * 1024;

const PROTOCOL_MARKER: &str = "HTTP/1.1";

/// Errors raised while reading a raw request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The client closed the connection without sending anything.
    #[error("connection closed before a request was received")]
    Empty,
    /// The header block exceeded [`MAX_HEADER_BYTES`].
    #[error("request headers exceed {limit} byte limit")]
    HeadersTooLarge { limit: usize },
    /// The declared body exceeded [`MAX_BODY_BYTES`].
    #[error("request body of {size} bytes exceeds {limit} byte limit")]
    BodyTooLarge { size: usize, limit: usize },
    /// `Content-Length` was not a number.
    #[error("invalid Content-Length: {value}")]
    InvalidContentLength { value: String },
    /// The request line carried no `HTTP/1.1` marker.
    #[error("request line has no {PROTOCOL_MARKER} marker")]
    MissingProtocol,
    /// Nothing preceded the protocol marker.
    #[error("request line has no verb")]
    MissingVerb,
    /// IO error during read.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    verb: String,
    body: String,
}

impl RawRequest {
    /// Reads one request from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the connection closes early, a limit is
    /// exceeded, the request line is malformed, or reading fails.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self, RequestError> {
        let mut request_line: Option<String> = None;
        let mut content_length = 0_usize;
        let mut header_bytes = 0_usize;
        let mut line = String::new();

        loop {
            line.clear();
            let read = read_line_with_retry(reader, &mut line)?;
            if read == 0 {
                break;
            }
            header_bytes += read;
            if header_bytes > MAX_HEADER_BYTES {
                return Err(RequestError::HeadersTooLarge {
                    limit: MAX_HEADER_BYTES,
                });
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if request_line.is_some() {
                    break;
                }
                continue;
            }
            if request_line.is_none() {
                request_line = Some(trimmed.to_owned());
            } else if let Some(length) = content_length_header(trimmed)? {
                content_length = length;
            }
        }

        let request_line = request_line.ok_or(RequestError::Empty)?;
        let verb = extract_verb(&request_line)?;
        let body = read_body(reader, content_length)?;
        Ok(Self { verb, body })
    }

    /// Upper-cased verb.
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Body text as received.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Body from its first `{`, or `None` when it carries no JSON object.
    #[must_use]
    pub fn json_body(&self) -> Option<&str> {
        self.body.find('{').and_then(|start| self.body.get(start..))
    }
}

fn read_line_with_retry<R: BufRead>(reader: &mut R, line: &mut String) -> io::Result<usize> {
    loop {
        match reader.read_line(line) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn content_length_header(line: &str) -> Result<Option<usize>, RequestError> {
    let Some((name, value)) = line.split_once(':') else {
        return Ok(None);
    };
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return Ok(None);
    }
    let value = value.trim();
    let length = value
        .parse::<usize>()
        .map_err(|_| RequestError::InvalidContentLength {
            value: value.to_owned(),
        })?;
    if length > MAX_BODY_BYTES {
        return Err(RequestError::BodyTooLarge {
            size: length,
            limit: MAX_BODY_BYTES,
        });
    }
    Ok(Some(length))
}

/// First token before the protocol marker, up to any `/`.
fn extract_verb(request_line: &str) -> Result<String, RequestError> {
    let (head, _) = request_line
        .split_once(PROTOCOL_MARKER)
        .ok_or(RequestError::MissingProtocol)?;
    let token = head
        .split_whitespace()
        .next()
        .ok_or(RequestError::MissingVerb)?;
    let verb = token.split('/').next().unwrap_or_default().trim();
    if verb.is_empty() {
        return Err(RequestError::MissingVerb);
    }
    Ok(verb.to_ascii_uppercase())
}

fn read_body<R: BufRead>(reader: &mut R, length: usize) -> Result<String, RequestError> {
    if length == 0 {
        return Ok(String::new());
    }
    let mut body = vec![0_u8; length];
    reader.read_exact(&mut body)?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}
