use docserve::http::request::{Method, RequestHeaders};
use docserve::http::transport::Transport;
use docserve::http::upload::{UploadError, ingest};
use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

async fn transport_with(input: &[u8]) -> Transport<DuplexStream> {
    let (mut client, server) = duplex(256 * 1024);
    client.write_all(input).await.unwrap();
    drop(client);
    Transport::new(server)
}

fn post(boundary: Option<&str>, content_length: u64) -> RequestHeaders {
    let mut req = RequestHeaders::new(Method::POST, "/upload.txt", "HTTP/1.1");
    req.boundary = boundary.map(str::to_string);
    req.content_length = content_length;
    req
}

fn multipart(boundary: &str, payload: &[u8], newline: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}{newline}").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"a.bin\"{newline}")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: application/octet-stream{newline}{newline}").as_bytes());
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("--{boundary}--{newline}").as_bytes());
    body
}

#[tokio::test]
async fn test_payload_between_blank_line_and_end_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.txt");
    let body = b"--X\nContent-Disposition: form-data; name=\"f\"\n\nhello world\n--X--\n";
    let mut t = transport_with(body).await;

    let report = ingest(&mut t, &post(Some("X"), body.len() as u64), &dest)
        .await
        .unwrap();

    assert!(report.completed);
    assert_eq!(report.bytes_consumed, body.len() as u64);
    assert_eq!(report.bytes_written, 12);
    assert_eq!(std::fs::read(&dest).unwrap(), b"hello world\n");
}

#[tokio::test]
async fn test_binary_payload_with_crlf_and_long_lines() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("blob.bin");

    let mut payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    payload.extend_from_slice(b"\r\n");
    let body = multipart("----b0undary", &payload, "\r\n");
    let mut t = transport_with(&body).await;

    let report = ingest(&mut t, &post(Some("----b0undary"), body.len() as u64), &dest)
        .await
        .unwrap();

    assert!(report.completed);
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
}

#[tokio::test]
async fn test_stops_at_content_length() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.txt");
    let body = multipart("X", b"data\n", "\n");
    let mut input = body.clone();
    input.extend_from_slice(b"GET /next HTTP/1.1\r\n\r\n");
    let mut t = transport_with(&input).await;

    ingest(&mut t, &post(Some("X"), body.len() as u64), &dest)
        .await
        .unwrap();

    let next = t.read_line(1024).await.unwrap();
    assert_eq!(next.content(), b"GET /next HTTP/1.1");
}

#[tokio::test]
async fn test_epilogue_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.txt");
    let mut body = multipart("X", b"data\n", "\n");
    body.extend_from_slice(b"trailing epilogue\n");
    let mut input = body.clone();
    input.extend_from_slice(b"NEXT\n");
    let mut t = transport_with(&input).await;

    let report = ingest(&mut t, &post(Some("X"), body.len() as u64), &dest)
        .await
        .unwrap();

    assert_eq!(report.bytes_consumed, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), b"data\n");
    assert_eq!(t.read_line(1024).await.unwrap().content(), b"NEXT");
}

#[tokio::test]
async fn test_length_exhausted_without_end_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.txt");
    let body = b"--X\n\npartial\nmore";
    let mut t = transport_with(body).await;

    let report = ingest(&mut t, &post(Some("X"), body.len() as u64), &dest)
        .await
        .unwrap();

    assert!(!report.completed);
    assert_eq!(std::fs::read(&dest).unwrap(), b"partial\nmore");
}

#[tokio::test]
async fn test_zero_length_rejected_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("never.txt");
    let mut t = transport_with(b"").await;

    let err = ingest(&mut t, &post(Some("X"), 0), &dest).await.unwrap_err();
    assert!(matches!(err, UploadError::MissingLength));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_missing_boundary_rejected_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("never.txt");
    let mut t = transport_with(b"abc").await;

    let err = ingest(&mut t, &post(None, 3), &dest).await.unwrap_err();
    assert!(matches!(err, UploadError::MissingBoundary));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_destination_that_cannot_be_created() {
    let dir = tempfile::tempdir().unwrap();
    let mut t = transport_with(b"--X\n").await;

    // A directory cannot be opened for writing.
    let err = ingest(&mut t, &post(Some("X"), 4), dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Create(_)));
}

#[tokio::test]
async fn test_stalled_body_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("partial.txt");
    let body = b"--X\n\nonly this\n";
    let mut t = transport_with(body).await;

    let err = ingest(&mut t, &post(Some("X"), 10_000), &dest)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        UploadError::Stalled { bytes_consumed } if bytes_consumed == body.len() as u64
    ));
    assert_eq!(std::fs::read(&dest).unwrap(), b"only this\n");
}

#[tokio::test]
async fn test_second_part_lands_in_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("parts.txt");
    let body = b"--X\nH: 1\n\nA\n--X\nH: 2\n\nB\n--X--\n";
    let mut t = transport_with(body).await;

    let report = ingest(&mut t, &post(Some("X"), body.len() as u64), &dest)
        .await
        .unwrap();

    assert!(report.completed);
    assert_eq!(std::fs::read(&dest).unwrap(), b"A\nH: 2\n\nB\n");
}
