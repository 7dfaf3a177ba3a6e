use crate::http::request::{Method, RequestHeaders};
use crate::http::transport::{MAX_LINE_LEN, Transport};
use percent_encoding::percent_decode_str;
use tokio::io::{AsyncRead, AsyncWrite};
use url::Url;

/// Header lines (continuations of overlong lines included) allowed before the
/// blank line that ends the head.
pub const MAX_HEADER_LINES: usize = 100;

/// Blank lines tolerated ahead of a request line.
const MAX_LEADING_BLANK_LINES: usize = 4;

#[derive(Debug)]
pub enum ParseError {
    /// Request line is empty, not UTF-8, or misses the URL or version
    InvalidRequest,
    /// Request line exceeded the line-length cap
    RequestLineTooLong,
    /// Header line has no `:`
    InvalidHeader,
    /// No blank line within the header bound, or the peer went away first
    UnterminatedHeaders,
    /// URL could not be parsed or decoded
    InvalidUri,
    /// The transport failed underneath the parser
    Io(std::io::Error),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidRequest => f.write_str("malformed request line"),
            ParseError::RequestLineTooLong => f.write_str("request line too long"),
            ParseError::InvalidHeader => f.write_str("malformed header line"),
            ParseError::UnterminatedHeaders => f.write_str("header block not terminated"),
            ParseError::InvalidUri => f.write_str("malformed request URI"),
            ParseError::Io(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::Io(e)
    }
}

/// Parses `METHOD SP URL SP VERSION`.
///
/// An unknown method is not an error: the result carries
/// `Method::UNSUPPORTED` and whatever URL/version tokens were present, and
/// the caller answers 501 without reading further.
pub fn parse_request_line(line: &str) -> Result<RequestHeaders, ParseError> {
    let mut parts = line.split_whitespace();
    let token = parts.next().ok_or(ParseError::InvalidRequest)?;
    let method = Method::from_token(token);

    let url = parts.next();
    let version = parts.next();

    let mut request = match method {
        Method::UNSUPPORTED => {
            RequestHeaders::new(method, url.unwrap_or_default(), version.unwrap_or_default())
        }
        _ => {
            let url = url.ok_or(ParseError::InvalidRequest)?;
            let version = version.ok_or(ParseError::InvalidRequest)?;
            RequestHeaders::new(method, url, version)
        }
    };
    request.method_token = token.to_string();

    if method == Method::GET {
        if let Some((path, query)) = request.url.split_once('?') {
            let (path, query) = (path.to_string(), query.to_string());
            request.url = path;
            request.query = Some(query);
        }
    }

    Ok(request)
}

/// Splits `Key: Value` at the first colon, trimming the value's leading whitespace.
pub fn parse_header_line(line: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
    Ok((key.trim(), value.trim_start()))
}

/// Returns the percent-decoded path component of a request URL.
///
/// Query and fragment are dropped. Absolute-form targets are accepted; only
/// their path is used. Dot segments are left untouched so the resolver can
/// see them.
pub fn decode_path(raw_url: &str) -> Result<String, ParseError> {
    decode_target(raw_url, &['?', '#'])
}

/// Like [`decode_path`], but a `?query` stays part of the name.
///
/// Upload destinations are the literal request target; only GET splits off
/// a query string.
pub fn decode_upload_path(raw_url: &str) -> Result<String, ParseError> {
    decode_target(raw_url, &['#'])
}

fn decode_target(raw_url: &str, cut_at: &[char]) -> Result<String, ParseError> {
    let base = Url::parse("http://localhost/").map_err(|_| ParseError::InvalidUri)?;
    let parsed = Url::options()
        .base_url(Some(&base))
        .parse(raw_url)
        .map_err(|_| ParseError::InvalidUri)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ParseError::InvalidUri);
    }

    let path = if raw_url.starts_with('/') {
        raw_url
    } else {
        let after_scheme = raw_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .ok_or(ParseError::InvalidUri)?;
        after_scheme
            .find('/')
            .map(|at| &after_scheme[at..])
            .unwrap_or("/")
    };
    let path = path.split(cut_at).next().unwrap_or("/");

    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| ParseError::InvalidUri)?;
    Ok(decoded.into_owned())
}

/// Reads one request head from the transport.
///
/// `Ok(None)` means the peer closed the connection before sending anything.
pub async fn read_request<S>(
    transport: &mut Transport<S>,
) -> Result<Option<RequestHeaders>, ParseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut blanks = 0;
    let line = loop {
        let line = transport.read_line(MAX_LINE_LEN).await?;
        if line.is_empty() {
            return Ok(None);
        }
        if line.is_blank() && blanks < MAX_LEADING_BLANK_LINES {
            blanks += 1;
            continue;
        }
        break line;
    };

    if line.is_truncated() {
        return Err(ParseError::RequestLineTooLong);
    }
    let text = std::str::from_utf8(line.content()).map_err(|_| ParseError::InvalidRequest)?;
    let mut request = parse_request_line(text)?;
    tracing::debug!(
        method = %request.method_token,
        url = %request.url,
        version = %request.version,
        "Request line parsed"
    );

    if request.method == Method::UNSUPPORTED {
        return Ok(Some(request));
    }

    let mut seen = 0;
    let mut continuation = false;
    loop {
        if seen >= MAX_HEADER_LINES {
            return Err(ParseError::UnterminatedHeaders);
        }
        let line = transport.read_line(MAX_LINE_LEN).await?;
        seen += 1;

        if line.is_empty() {
            return Err(ParseError::UnterminatedHeaders);
        }

        // Tail of an overlong header; its prefix was already handled.
        if continuation {
            continuation = line.is_truncated();
            continue;
        }
        continuation = line.is_truncated();

        if line.is_blank() {
            break;
        }

        let Ok(text) = std::str::from_utf8(line.content()) else {
            tracing::debug!("Skipping non UTF-8 header line");
            continue;
        };
        match parse_header_line(text) {
            Ok((key, value)) => request.apply_header(key, value),
            Err(_) => tracing::debug!(line = text, "Skipping malformed header line"),
        }
    }

    Ok(Some(request))
}
