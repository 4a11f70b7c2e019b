use crate::http::request::{Method, Request, canonical_header_key};
use crate::http::HTTP_VERSION;
use bytes::{Buf, BytesMut};
use std::collections::HashMap;
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, timeout_at};

/// Longest request or header line accepted, excluding the CRLF.
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Largest header block accepted, request line and blank line included.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 4096;

/// Failure to turn buffered bytes into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The header block is not terminated yet
    Incomplete,
    /// Request line does not have exactly three space-separated tokens
    MalformedRequestLine,
    InvalidMethod,
    InvalidProto,
    /// Header line without a colon, or not UTF-8
    MalformedHeader,
    MissingHost,
    LineTooLong,
    /// Header block longer than `MAX_HEADER_BYTES`
    HeaderTooLarge,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseError::Incomplete => "incomplete request",
            ParseError::MalformedRequestLine => "malformed request line",
            ParseError::InvalidMethod => "invalid method",
            ParseError::InvalidProto => "invalid protocol version",
            ParseError::MalformedHeader => "malformed header line",
            ParseError::MissingHost => "missing Host header",
            ParseError::LineTooLong => "line too long",
            ParseError::HeaderTooLarge => "header block too large",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ParseError {}

/// Parses one request from the front of `buf`.
///
/// On success returns the request and the number of bytes it occupied.
/// Returns `ParseError::Incomplete` while the header block has not been
/// terminated by an empty line; the request line is validated as soon as
/// its CRLF is present, so a bad request line fails without waiting for
/// the headers. A header block longer than `MAX_HEADER_BYTES` fails with
/// `ParseError::HeaderTooLarge`, whether or not it is complete.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    match parse_head(buf) {
        Err(ParseError::Incomplete) if buf.len() > MAX_HEADER_BYTES => {
            Err(ParseError::HeaderTooLarge)
        }
        Ok((_, consumed)) if consumed > MAX_HEADER_BYTES => Err(ParseError::HeaderTooLarge),
        other => other,
    }
}

fn parse_head(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let mut lines = Lines { buf, pos: 0 };

    let request_line = lines.next_line()?;
    let (method, url) = parse_request_line(request_line)?;

    let mut headers = HashMap::new();
    loop {
        let line = lines.next_line()?;
        if line.is_empty() {
            break;
        }
        let (key, value) = parse_header_line(line)?;
        headers.insert(key, value);
    }

    let host = headers.remove("Host").ok_or(ParseError::MissingHost)?;
    // Any value other than exactly "close" keeps the connection open.
    let close = headers
        .remove("Connection")
        .is_some_and(|v| v == "close");

    let request = Request {
        method,
        url: url.to_string(),
        proto: HTTP_VERSION.to_string(),
        headers,
        host,
        close,
    };

    Ok((request, lines.pos))
}

fn parse_request_line(line: &[u8]) -> Result<(Method, &str), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::MalformedRequestLine)?;

    let parts: Vec<&str> = line.split(' ').collect();
    let [method, url, proto] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine);
    };

    let method = Method::from_str(method).ok_or(ParseError::InvalidMethod)?;
    if *proto != HTTP_VERSION {
        return Err(ParseError::InvalidProto);
    }

    Ok((method, *url))
}

/// Splits a header line on its first colon.
///
/// When the value starts with a space every space in it is dropped, so
/// `"Accept: a b"` yields `"ab"` while `"Accept:a b"` yields `"a b"`.
fn parse_header_line(line: &[u8]) -> Result<(String, String), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::MalformedHeader)?;
    let (key, value) = line.split_once(':').ok_or(ParseError::MalformedHeader)?;

    let value = if value.starts_with(' ') {
        value.replace(' ', "")
    } else {
        value.to_string()
    };

    Ok((canonical_header_key(key), value))
}

/// CRLF line splitter over a borrowed buffer. A lone LF does not end a line.
struct Lines<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Lines<'a> {
    fn next_line(&mut self) -> Result<&'a [u8], ParseError> {
        let rest = &self.buf[self.pos..];
        match find_crlf(rest) {
            Some(end) if end > MAX_LINE_LEN => Err(ParseError::LineTooLong),
            Some(end) => {
                self.pos += end + 2;
                Ok(&rest[..end])
            }
            None if rest.len() > MAX_LINE_LEN => Err(ParseError::LineTooLong),
            None => Err(ParseError::Incomplete),
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn rfind_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).rposition(|w| w == b"\r\n")
}

/// Why a request could not be read.
#[derive(Debug)]
pub enum ReadError {
    /// The peer closed the stream before a request line arrived
    EndOfInput,
    /// The peer closed the stream in the middle of the header block
    UnexpectedEof,
    /// The read deadline passed
    TimedOut,
    /// Bytes arrived but do not form a valid request
    Parse(ParseError),
    Io(io::Error),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::EndOfInput => f.write_str("end of input"),
            ReadError::UnexpectedEof => f.write_str("connection closed mid-request"),
            ReadError::TimedOut => f.write_str("read deadline exceeded"),
            ReadError::Parse(e) => write!(f, "parse error: {e}"),
            ReadError::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

/// A failed read plus whether any of the request had been received.
///
/// `bytes_received` is false only while no request line has been accepted
/// yet; it separates an idle connection from a stalled partial request.
#[derive(Debug)]
pub struct RequestError {
    pub kind: ReadError,
    pub bytes_received: bool,
}

impl RequestError {
    fn new(kind: ReadError, bytes_received: bool) -> Self {
        Self {
            kind,
            bytes_received,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (bytes received: {})", self.kind, self.bytes_received)
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ReadError::Parse(e) => Some(e),
            ReadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Reads requests off a byte stream, one at a time.
///
/// Bytes that arrive after the end of a request stay buffered for the next
/// call; they are not parsed until the caller asks for the next request.
/// Each read only scans the new bytes for line ends, and the buffered
/// request is re-parsed only once a line has been completed.
pub struct RequestReader<R> {
    inner: R,
    buffer: BytesMut,
    deadline: Option<Instant>,
    /// Buffer length at the last scan for line ends
    scanned: usize,
    /// Offset of the line still being received
    line_start: usize,
}

impl<R> RequestReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            deadline: None,
            scanned: 0,
            line_start: 0,
        }
    }

    /// Every read made by subsequent `read_request` calls fails with
    /// `ReadError::TimedOut` once `deadline` has passed.
    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Scans the bytes that arrived since the last call. True when the
    /// parser has something new to look at: a completed line, or an
    /// unterminated one already longer than `MAX_LINE_LEN`.
    fn scan_new_bytes(&mut self) -> bool {
        // Back up one byte so a CRLF split across two reads is found.
        let from = self.scanned.saturating_sub(1);
        let line_ended = match rfind_crlf(&self.buffer[from..]) {
            Some(end) => {
                self.line_start = from + end + 2;
                true
            }
            None => false,
        };
        self.scanned = self.buffer.len();
        line_ended || self.buffer.len() - self.line_start > MAX_LINE_LEN
    }

    fn consume(&mut self, len: usize) {
        self.buffer.advance(len);
        self.scanned = 0;
        self.line_start = 0;
    }

    /// Any CRLF in the buffer ends the request line.
    fn request_line_received(&self) -> bool {
        self.line_start > 0
    }
}

impl<R: AsyncRead + Unpin> RequestReader<R> {
    pub async fn read_request(&mut self) -> Result<Request, RequestError> {
        loop {
            if self.scan_new_bytes() {
                match parse_http_request(&self.buffer) {
                    Ok((request, consumed)) => {
                        self.consume(consumed);
                        return Ok(request);
                    }
                    Err(ParseError::Incomplete) => {}
                    Err(e) => return Err(RequestError::new(ReadError::Parse(e), true)),
                }
            }

            if self.buffer.len() > MAX_HEADER_BYTES {
                let kind = ReadError::Parse(ParseError::HeaderTooLarge);
                return Err(RequestError::new(kind, true));
            }

            // Incomplete with a CRLF in the buffer means the request line
            // was accepted and we are waiting on headers.
            let bytes_received = self.request_line_received();

            self.buffer.reserve(READ_CHUNK);
            let deadline = self.deadline;
            let read = self.inner.read_buf(&mut self.buffer);
            let result = match deadline {
                Some(deadline) => match timeout_at(deadline, read).await {
                    Ok(result) => result,
                    Err(_) => {
                        return Err(RequestError::new(ReadError::TimedOut, bytes_received));
                    }
                },
                None => read.await,
            };

            let n = result.map_err(|e| RequestError::new(ReadError::Io(e), bytes_received))?;
            if n == 0 {
                let kind = if bytes_received {
                    ReadError::UnexpectedEof
                } else {
                    ReadError::EndOfInput
                };
                return Err(RequestError::new(kind, bytes_received));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let (parsed, consumed) = parse_http_request(req).unwrap();

        assert_eq!(parsed.url, "/");
        assert_eq!(parsed.host, "example.com");
        assert!(parsed.headers.is_empty());
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn lone_lf_does_not_end_a_line() {
        let req = b"GET / HTTP/1.1\nHost: x\n\n";
        assert_eq!(parse_http_request(req), Err(ParseError::Incomplete));
    }

    #[test]
    fn overlong_unterminated_line_is_rejected() {
        let req = vec![b'a'; MAX_LINE_LEN + 1];
        assert_eq!(parse_http_request(&req), Err(ParseError::LineTooLong));
    }

    #[test]
    fn crlf_split_across_reads_is_found() {
        let mut reader = RequestReader::new(&b""[..]);
        reader.buffer.extend_from_slice(b"GET / HTTP/1.1\r");
        assert!(!reader.scan_new_bytes());
        assert!(!reader.request_line_received());

        reader.buffer.extend_from_slice(b"\nHo");
        assert!(reader.scan_new_bytes());
        assert!(reader.request_line_received());
        assert!(!reader.scan_new_bytes());
    }
}
