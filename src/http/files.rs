//! GET: file downloads and directory listings.

use std::path::Path;

use html_escape::{encode_double_quoted_attribute, encode_text};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::http::mime;
use crate::http::resolver::{self, PathKind};
use crate::http::response::StatusCode;
use crate::http::transport::Transport;
use crate::http::writer::{Reply, ResponseWriter, connection_value, send_error};

/// Bytes read from disk and written per chunk.
pub const CHUNK_SIZE: usize = 512;

const HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const LISTING_FOOTER: &str = "  </ul>\n </body>\n</html>\n";

/// Answers a GET for the decoded path `decoded` (raw form `url`).
pub async fn respond<S>(
    transport: &mut Transport<S>,
    root: &Path,
    url: &str,
    decoded: &str,
    keep_alive: bool,
) -> std::io::Result<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let resolved = match resolver::resolve(root, decoded).await {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::debug!(path = decoded, error = %e, "GET target not resolved");
            return send_error(transport, StatusCode::NotFound, keep_alive).await;
        }
    };

    match resolved.kind {
        PathKind::Directory => send_directory(transport, &resolved.path, url, decoded).await,
        PathKind::File => send_file(transport, &resolved.path, keep_alive).await,
    }
}

/// Streams a file in `CHUNK_SIZE` pieces.
///
/// The size captured right after opening is authoritative: exactly that many
/// bytes are sent even if the file grows meanwhile, and a file that shrinks
/// mid-stream aborts the connection.
async fn send_file<S>(
    transport: &mut Transport<S>,
    path: &Path,
    keep_alive: bool,
) -> std::io::Result<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Open failed");
            return send_error(transport, StatusCode::NotFound, keep_alive).await;
        }
    };
    let size = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Fstat failed");
            return send_error(transport, StatusCode::NotFound, keep_alive).await;
        }
    };

    let content_type = mime::content_type_for(&path.to_string_lossy());
    tracing::debug!(path = %path.display(), size, content_type, "Sending file");

    let mut writer = ResponseWriter::new(transport);
    writer.send_status(StatusCode::Ok);
    writer.send_header("Content-Type", content_type);
    writer.send_header("Content-Length", &size.to_string());
    writer.send_header("Connection", connection_value(keep_alive));
    writer.send_blank_line().await?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut sent = 0u64;
    while sent < size {
        let want = (size - sent).min(CHUNK_SIZE as u64) as usize;
        let n = file.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "file shrank while streaming",
            ));
        }
        writer.send_chunk(&buf[..n]).await?;
        sent += n as u64;
    }

    let body_bytes = writer.finish().await?;
    Ok(Reply {
        status: StatusCode::Ok,
        body_bytes,
        reusable: keep_alive,
    })
}

/// Streams an HTML index of a directory, one chunk per entry.
///
/// The length is not known in advance, so the connection is always closed
/// afterwards.
async fn send_directory<S>(
    transport: &mut Transport<S>,
    dir: &Path,
    url: &str,
    decoded: &str,
) -> std::io::Result<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            tracing::warn!(path = %dir.display(), "Directory not readable");
            return send_error(transport, StatusCode::Forbidden, false).await;
        }
        Err(e) => {
            tracing::error!(path = %dir.display(), error = %e, "Opening directory failed");
            return send_error(transport, StatusCode::InternalServerError, false).await;
        }
    };

    let mut writer = ResponseWriter::new(transport);
    writer.send_status(StatusCode::Ok);
    writer.send_header("Content-Type", "text/html");
    writer.send_header("Connection", connection_value(false));
    writer.send_blank_line().await?;

    writer.send_chunk(listing_header(url, decoded).as_bytes()).await?;
    let mut listed = 0usize;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == "." || name == ".." {
            continue;
        }
        let is_dir = entry
            .file_type()
            .await
            .map(|kind| kind.is_dir())
            .unwrap_or(false);
        writer.send_chunk(listing_entry(&name, is_dir).as_bytes()).await?;
        listed += 1;
    }
    writer.send_chunk(LISTING_FOOTER.as_bytes()).await?;

    tracing::debug!(path = %dir.display(), entries = listed, "Directory listed");
    let body_bytes = writer.finish().await?;
    Ok(Reply {
        status: StatusCode::Ok,
        body_bytes,
        reusable: false,
    })
}

fn listing_header(url: &str, decoded: &str) -> String {
    let trailing_slash = if url.ends_with('/') { "" } else { "/" };
    let title = encode_text(decoded);
    format!(
        "<!DOCTYPE html>\n\
         <html>\n <head>\n\
         \x20 <meta charset='utf-8'>\n\
         \x20 <title>{title}</title>\n\
         \x20 <base href=\"{base}{trailing_slash}\">\n\
         </head>\n\
         <body>\n\
         \x20 <h1>{title}</h1>\n\
         \x20 <ul>\n",
        base = encode_double_quoted_attribute(url),
    )
}

fn listing_entry(name: &str, is_dir: bool) -> String {
    let slash = if is_dir { "/" } else { "" };
    format!(
        "    <li><a href=\"{}{slash}\">{}</a></li>\n",
        utf8_percent_encode(name, HREF),
        encode_text(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_links_are_encoded_and_escaped() {
        let entry = listing_entry("a b&c.txt", false);
        assert_eq!(
            entry,
            "    <li><a href=\"a%20b%26c.txt\">a b&amp;c.txt</a></li>\n"
        );
        assert!(listing_entry("docs", true).contains("href=\"docs/\""));
    }

    #[test]
    fn base_href_gets_trailing_slash() {
        assert!(listing_header("/docs", "/docs").contains("<base href=\"/docs/\">"));
        assert!(listing_header("/docs/", "/docs/").contains("<base href=\"/docs/\">"));
    }

    #[test]
    fn title_and_base_are_escaped() {
        let header = listing_header("/a\"b<c>", "/a\"b<c>");
        assert!(header.contains("<title>/a\"b&lt;c&gt;</title>"));
        assert!(header.contains("<base href=\"/a&quot;b&lt;c&gt;/\">"));
    }
}
