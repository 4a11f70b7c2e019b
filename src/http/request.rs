use std::collections::HashMap;

/// HTTP request methods.
///
/// Only GET is served; any other token on the request line is rejected by
/// the parser before a `Request` is ever built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
}

/// Represents a parsed HTTP request from a client.
///
/// `Host` and `Connection` are lifted out of the header map into the
/// dedicated `host` and `close` fields, so `headers` never contains them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The HTTP method
    pub method: Method,
    /// The raw request target (e.g., "/index.html")
    pub url: String,
    /// HTTP version, always "HTTP/1.1"
    pub proto: String,
    /// Remaining headers, keyed by canonical name
    pub headers: HashMap<String, String>,
    /// Value of the required Host header
    pub host: String,
    /// True when the client sent `Connection: close`
    pub close: bool,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Method,
    url: Option<String>,
    host: Option<String>,
    headers: HashMap<String, String>,
    close: bool,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// assert_eq!(Method::from_str("POST"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            url: None,
            host: None,
            headers: HashMap::new(),
            close: false,
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(canonical_header_key(key), value.into());
        self
    }

    pub fn close(mut self, close: bool) -> Self {
        self.close = close;
        self
    }

    pub fn build(mut self) -> Result<Request, &'static str> {
        self.headers.remove("Host");
        self.headers.remove("Connection");

        Ok(Request {
            method: self.method,
            url: self.url.ok_or("url missing")?,
            proto: super::HTTP_VERSION.to_string(),
            headers: self.headers,
            host: self.host.ok_or("host missing")?,
            close: self.close,
        })
    }
}

impl Request {
    /// Retrieves a header value by name.
    ///
    /// The name is canonicalized first, so `"user-agent"` finds
    /// `"User-Agent"`. `Host` and `Connection` are never found here; use
    /// the `host` and `close` fields.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&canonical_header_key(key))
            .map(|v| v.as_str())
    }

    /// Whether the connection may stay open after this request's response.
    pub fn keep_alive(&self) -> bool {
        !self.close
    }
}

/// Returns the canonical form of a header name: the first letter and every
/// letter following a hyphen are upper-cased, the rest lower-cased.
///
/// Names containing a byte that is not a valid header token character
/// (spaces, for instance) are returned unchanged.
///
/// ```
/// # use lantern::http::request::canonical_header_key;
/// assert_eq!(canonical_header_key("content-type"), "Content-Type");
/// assert_eq!(canonical_header_key("HOST"), "Host");
/// assert_eq!(canonical_header_key("bad key"), "bad key");
/// ```
pub fn canonical_header_key(key: &str) -> String {
    if !key.bytes().all(is_token_byte) {
        return key.to_string();
    }

    let mut upper = true;
    key.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
