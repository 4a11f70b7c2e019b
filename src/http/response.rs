use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::files::ResolvedFile;
use crate::http::request::Request;
use crate::http::{HTTP_VERSION, date, mime};

/// HTTP status codes the server can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
}

/// A numeric status outside the set the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidStatusCode(pub u16);

impl fmt::Display for InvalidStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported status code {}", self.0)
    }
}

impl std::error::Error for InvalidStatusCode {}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
        }
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = InvalidStatusCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(StatusCode::Ok),
            400 => Ok(StatusCode::BadRequest),
            404 => Ok(StatusCode::NotFound),
            other => Err(InvalidStatusCode(other)),
        }
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
///
/// The body is never held in memory here: when `file_path` is set the
/// writer streams that file after the header block.
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// Always "HTTP/1.1"
    pub proto: &'static str,
    /// Header map; serialized in sorted key order
    pub headers: HashMap<String, String>,
    /// The request this answers, if it parsed
    pub request: Option<Request>,
    /// File to send as the body
    pub file_path: Option<PathBuf>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::NotFound)
///     .header("Connection", "close")
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    request: Option<Request>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            request: None,
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Associates the request being answered. Echoes `Connection: close`
    /// back when the client asked for it.
    pub fn request(mut self, request: Request) -> Self {
        if request.close {
            self.headers
                .insert("Connection".to_string(), "close".to_string());
        }
        self.request = Some(request);
        self
    }

    /// Builds the final Response.
    ///
    /// Adds a `Date` header stamped with the current time unless one was set.
    pub fn build(mut self) -> Response {
        self.headers
            .entry("Date".to_string())
            .or_insert_with(date::now);

        Response {
            status: self.status,
            proto: HTTP_VERSION,
            headers: self.headers,
            request: self.request,
            file_path: None,
        }
    }
}

impl Response {
    /// 200 OK serving `file` as the body.
    pub fn ok(request: Request, file: ResolvedFile) -> Self {
        let extension = file.path.extension().and_then(|e| e.to_str());

        let mut response = ResponseBuilder::new(StatusCode::Ok)
            .header("Last-Modified", date::format_http_date(file.modified))
            .header("Content-Length", file.len.to_string())
            .header("Content-Type", mime::content_type_for(extension))
            .request(request)
            .build();
        response.file_path = Some(file.path);
        response
    }

    /// 400 Bad Request. Always asks the client to close.
    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest)
            .header("Connection", "close")
            .build()
    }

    /// 404 Not Found.
    pub fn not_found(request: Request) -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .request(request)
            .build()
    }
}
