/// Request methods the server distinguishes.
///
/// Only GET and POST are served; every other token maps to `UNSUPPORTED`
/// and is answered with 501.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Download a file or list a directory
    GET,
    /// POST - Upload a multipart file
    POST,
    /// Anything else
    UNSUPPORTED,
}

impl Method {
    /// Matches a request-line token case-insensitively.
    ///
    /// # Example
    ///
    /// ```
    /// # use docserve::http::request::Method;
    /// assert_eq!(Method::from_token("get"), Method::GET);
    /// assert_eq!(Method::from_token("PUT"), Method::UNSUPPORTED);
    /// ```
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("GET") {
            Method::GET
        } else if token.eq_ignore_ascii_case("POST") {
            Method::POST
        } else {
            Method::UNSUPPORTED
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::UNSUPPORTED => "UNSUPPORTED",
        }
    }
}

/// The parsed head of one request.
///
/// Built once by the parser and never mutated afterwards. `boundary` is only
/// ever set for a POST whose content type is `multipart/form-data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    /// The method class
    pub method: Method,
    /// The method exactly as the client sent it, for logging
    pub method_token: String,
    /// Raw (undecoded) URL; for GET the query string is cut off
    pub url: String,
    /// GET only: the part of the URL after the first `?`
    pub query: Option<String>,
    /// Version token, e.g. "HTTP/1.1"
    pub version: String,
    /// `Connection: keep-alive` was sent
    pub keep_alive: bool,
    /// Declared body length; 0 when absent or not a number
    pub content_length: u64,
    /// Multipart boundary from `Content-Type`
    pub boundary: Option<String>,
}

impl RequestHeaders {
    pub fn new(method: Method, url: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            method,
            method_token: method.as_str().to_string(),
            url: url.into(),
            query: None,
            version: version.into(),
            keep_alive: false,
            content_length: 0,
            boundary: None,
        }
    }

    pub fn is_multipart(&self) -> bool {
        self.boundary.is_some()
    }

    /// Records one recognized header. Unknown keys are ignored.
    ///
    /// Keys are compared case-insensitively.
    pub fn apply_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("Connection") {
            self.keep_alive = value.trim().eq_ignore_ascii_case("keep-alive");
        } else if key.eq_ignore_ascii_case("Content-Type") {
            if self.method == Method::POST {
                self.boundary = multipart_boundary(value);
            }
        } else if key.eq_ignore_ascii_case("Content-Length") {
            self.content_length = value.trim().parse().unwrap_or(0);
        }
    }
}

/// Extracts the `boundary=` parameter of a `multipart/form-data` content type.
///
/// The value is kept verbatim; only surrounding double quotes are dropped.
pub fn multipart_boundary(content_type: &str) -> Option<String> {
    const MULTIPART: &str = "multipart/form-data";

    let content_type = content_type.trim_start();
    let prefix = content_type.get(..MULTIPART.len())?;
    if !prefix.eq_ignore_ascii_case(MULTIPART) {
        return None;
    }

    content_type[MULTIPART.len()..]
        .split(';')
        .map(str::trim)
        .find_map(|param| {
            let (name, value) = param.split_once('=')?;
            if !name.trim().eq_ignore_ascii_case("boundary") {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            (!value.is_empty()).then(|| value.to_string())
        })
}
