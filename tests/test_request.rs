use docserve::http::request::{Method, RequestHeaders, multipart_boundary};

#[test]
fn test_method_from_token() {
    assert_eq!(Method::from_token("GET"), Method::GET);
    assert_eq!(Method::from_token("pOsT"), Method::POST);
    assert_eq!(Method::from_token("HEAD"), Method::UNSUPPORTED);
    assert_eq!(Method::from_token(""), Method::UNSUPPORTED);
}

#[test]
fn test_apply_header_connection() {
    let mut req = RequestHeaders::new(Method::GET, "/", "HTTP/1.1");
    assert!(!req.keep_alive);

    req.apply_header("Connection", "KEEP-ALIVE");
    assert!(req.keep_alive);

    req.apply_header("connection", "close");
    assert!(!req.keep_alive);
}

#[test]
fn test_apply_header_content_length() {
    let mut req = RequestHeaders::new(Method::POST, "/f", "HTTP/1.1");

    req.apply_header("Content-Length", "42");
    assert_eq!(req.content_length, 42);

    req.apply_header("Content-Length", "-5");
    assert_eq!(req.content_length, 0);

    req.apply_header("CONTENT-LENGTH", " 7 ");
    assert_eq!(req.content_length, 7);
}

#[test]
fn test_boundary_only_for_multipart_post() {
    let mut post = RequestHeaders::new(Method::POST, "/f", "HTTP/1.1");
    post.apply_header("Content-Type", "application/json");
    assert!(!post.is_multipart());

    post.apply_header("Content-Type", "multipart/form-data; boundary=AbC");
    assert_eq!(post.boundary.as_deref(), Some("AbC"));

    let mut get = RequestHeaders::new(Method::GET, "/f", "HTTP/1.1");
    get.apply_header("Content-Type", "multipart/form-data; boundary=AbC");
    assert_eq!(get.boundary, None);
}

#[test]
fn test_boundary_is_case_sensitive() {
    assert_eq!(
        multipart_boundary("multipart/form-data; charset=utf-8; boundary=MiXeD"),
        Some("MiXeD".to_string())
    );
}
