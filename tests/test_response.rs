use waygate::http::request::{BodyKind, Method};
use waygate::http::response::{Response, ResponseBuilder, ResponseHead, StatusCode};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::BadGateway.as_u16(), 502);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
    assert_eq!(StatusCode::BadGateway.reason_phrase(), "Bad Gateway");
}

#[test]
fn test_response_builder_with_headers() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/plain")
        .header("X-Custom", "value")
        .body(b"test".to_vec())
        .build();

    assert_eq!(response.headers.get("Content-Type").unwrap(), "text/plain");
    assert_eq!(response.headers.get("X-Custom").unwrap(), "value");
    assert_eq!(response.headers.iter().count(), 3); // 2 custom + 1 auto (Content-Length)
}

#[test]
fn test_response_builder_auto_content_length() {
    let body = b"This is the body".to_vec();
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(body.clone())
        .build();

    assert_eq!(
        response.headers.get("Content-Length").unwrap(),
        body.len().to_string()
    );
}

#[test]
fn test_response_builder_preserves_custom_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Length", "999")
        .body(b"test".to_vec())
        .build();

    assert_eq!(response.headers.get("Content-Length").unwrap(), "999");
}

#[test]
fn test_response_helpers() {
    assert_eq!(Response::not_found().status, StatusCode::NotFound);
    assert_eq!(
        Response::internal_error("oops").status,
        StatusCode::InternalServerError
    );
    assert_eq!(Response::bad_request("nope").body, b"nope\n".to_vec());
}

fn head(status: u16, headers: &[(&str, &str)]) -> ResponseHead {
    ResponseHead {
        version: "HTTP/1.1".to_string(),
        status,
        reason: "X".to_string(),
        headers: headers.iter().copied().collect(),
    }
}

#[test]
fn test_response_head_body_kinds() {
    assert_eq!(
        head(200, &[("Content-Length", "12")]).body_kind(&Method::GET),
        BodyKind::Length(12)
    );
    assert_eq!(
        head(200, &[("Transfer-Encoding", "chunked")]).body_kind(&Method::GET),
        BodyKind::Chunked
    );
    assert_eq!(head(200, &[]).body_kind(&Method::GET), BodyKind::UntilClose);
    assert_eq!(
        head(200, &[("Content-Length", "12")]).body_kind(&Method::HEAD),
        BodyKind::Empty
    );
    assert_eq!(head(204, &[]).body_kind(&Method::GET), BodyKind::Empty);
    assert_eq!(head(304, &[]).body_kind(&Method::GET), BodyKind::Empty);
}

#[test]
fn test_response_head_interim() {
    assert!(head(100, &[]).is_interim());
    assert!(!head(101, &[]).is_interim());
    assert!(!head(200, &[]).is_interim());
}

#[test]
fn test_response_head_client_bytes_strip_connection_headers() {
    let h = head(
        418,
        &[("Connection", "keep-alive"), ("Keep-Alive", "timeout=5"), ("X-Tea", "1")],
    );

    let open = String::from_utf8(h.to_client_bytes(true)).unwrap();
    assert_eq!(open, "HTTP/1.1 418 X\r\nX-Tea: 1\r\n\r\n");

    let closing = String::from_utf8(h.to_client_bytes(false)).unwrap();
    assert_eq!(closing, "HTTP/1.1 418 X\r\nX-Tea: 1\r\nConnection: close\r\n\r\n");
}
