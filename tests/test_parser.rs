use waygate::http::parser::{ParseError, parse_http_request, parse_http_response_head};
use waygate::http::request::{BodyKind, Method, split_target};

#[test]
fn test_parse_simple_get_request() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let (parsed, consumed) = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.path, "/");
    assert_eq!(parsed.version, "HTTP/1.1");
    assert_eq!(parsed.headers.get("Host").unwrap(), "example.com");
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_leaves_body_unconsumed() {
    let req = b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
    let (parsed, consumed) = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.body_kind(), BodyKind::Length(5));
    assert_eq!(&req[consumed..], b"hello");
}

#[test]
fn test_parse_multiple_headers_keep_order() {
    let req = b"GET /path HTTP/1.1\r\nHost: example.com\r\nUser-Agent: test-client\r\nAccept: */*\r\n\r\n";
    let (parsed, _) = parse_http_request(req).unwrap();

    let names: Vec<&str> = parsed.headers.iter().map(|(k, _)| k).collect();
    assert_eq!(names, vec!["Host", "User-Agent", "Accept"]);
    assert_eq!(parsed.headers.get("user-agent").unwrap(), "test-client");
}

#[test]
fn test_parse_request_with_path_and_query_string() {
    let req = b"GET /search?q=rust HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let (parsed, _) = parse_http_request(req).unwrap();

    assert_eq!(parsed.path, "/search?q=rust");
    assert_eq!(parsed.path_only(), "/search");
    assert_eq!(split_target(&parsed.path), ("/search", Some("q=rust")));
}

#[test]
fn test_parse_incomplete_request_missing_blank_line() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n";
    let result = parse_http_request(req);

    assert!(matches!(result, Err(ParseError::Incomplete)));
}

#[test]
fn test_parse_invalid_http_method() {
    let req = b"GE(T / HTTP/1.1\r\n\r\n";
    let result = parse_http_request(req);

    assert!(matches!(result, Err(ParseError::InvalidMethod)));
}

#[test]
fn test_parse_invalid_version() {
    let req = b"GET / HTTP/2.0\r\n\r\n";
    assert!(matches!(parse_http_request(req), Err(ParseError::InvalidVersion)));
}

#[test]
fn test_parse_extension_method() {
    let req = b"PROPFIND /dav HTTP/1.1\r\nDepth: 1\r\n\r\n";
    let (parsed, _) = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::Other("PROPFIND".to_string()));
    assert_eq!(parsed.method.to_string(), "PROPFIND");
}

#[test]
fn test_parse_conflicting_content_lengths() {
    let req = b"POST / HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 10\r\n\r\nhello";
    assert!(matches!(
        parse_http_request(req),
        Err(ParseError::InvalidContentLength)
    ));

    let req = b"POST / HTTP/1.1\r\nContent-Length: 5, 7\r\n\r\nhello";
    assert!(matches!(
        parse_http_request(req),
        Err(ParseError::InvalidContentLength)
    ));
}

#[test]
fn test_parse_repeated_equal_content_lengths() {
    let req = b"POST / HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 5\r\n\r\nhello";
    let (parsed, _) = parse_http_request(req).unwrap();

    assert_eq!(parsed.body_kind(), BodyKind::Length(5));
}

#[test]
fn test_parse_malformed_header() {
    let req = b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n";
    let result = parse_http_request(req);

    assert!(matches!(result, Err(ParseError::InvalidHeader)));
}

#[test]
fn test_parse_invalid_content_length() {
    let req = b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n";
    assert!(matches!(
        parse_http_request(req),
        Err(ParseError::InvalidContentLength)
    ));
}

#[test]
fn test_parse_various_http_methods() {
    let methods = vec![
        ("GET", Method::GET),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
        ("PATCH", Method::PATCH),
        ("TRACE", Method::TRACE),
    ];

    for (method_str, expected_method) in methods {
        let req = format!("{} / HTTP/1.1\r\n\r\n", method_str);
        let (parsed, _) = parse_http_request(req.as_bytes()).unwrap();
        assert_eq!(parsed.method, expected_method);
    }
}

#[test]
fn test_parse_pipelined_requests_one_at_a_time() {
    let req = b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
    let (first, consumed) = parse_http_request(req).unwrap();
    let (second, _) = parse_http_request(&req[consumed..]).unwrap();

    assert_eq!(first.path, "/a");
    assert_eq!(second.path, "/b");
}

#[test]
fn test_parse_response_head() {
    let resp = b"HTTP/1.1 201 Created\r\nContent-Length: 2\r\nX-Id: 7\r\n\r\nok";
    let (head, consumed) = parse_http_response_head(resp).unwrap();

    assert_eq!(head.status, 201);
    assert_eq!(head.reason, "Created");
    assert_eq!(head.headers.get("x-id"), Some("7"));
    assert_eq!(&resp[consumed..], b"ok");
}

#[test]
fn test_parse_response_head_without_reason() {
    let resp = b"HTTP/1.1 204\r\n\r\n";
    let (head, _) = parse_http_response_head(resp).unwrap();

    assert_eq!(head.status, 204);
    assert_eq!(head.reason, "");
}

#[test]
fn test_parse_response_head_rejects_garbage() {
    assert!(matches!(
        parse_http_response_head(b"SSH-2.0-OpenSSH\r\n\r\n"),
        Err(ParseError::InvalidVersion)
    ));
    assert!(matches!(
        parse_http_response_head(b"HTTP/1.1 abc Nope\r\n\r\n"),
        Err(ParseError::InvalidStatus)
    ));
}
