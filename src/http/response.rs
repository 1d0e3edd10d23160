use crate::http::headers::Headers;
use crate::http::request::{BodyKind, Method};

/// HTTP status codes the gateway produces on its own.
///
/// Responses relayed from a backend keep the backend's numeric status and
/// never go through this type:
/// - `Ok` (200): Health check
/// - `BadRequest` (400): Malformed request, or a tunnel path hit without upgrade headers
/// - `NotFound` (404): No route matches the path
/// - `InternalServerError` (500): Route points at an unusable backend address
/// - `BadGateway` (502): Backend unreachable or misbehaving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
    /// 502 Bad Gateway
    BadGateway,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use waygate::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::BadGateway.as_u16(), 502);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::BadGateway => 502,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::BadGateway => "Bad Gateway",
        }
    }
}

/// Represents a complete HTTP response generated by the gateway itself.
///
/// Contains the HTTP status code, headers, and response body.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers in output order
    pub headers: Headers,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Automatically adds the Content-Length header based on body size if not already present.
    pub fn build(mut self) -> Response {
        if !self.headers.contains_key("Content-Length") {
            self.headers
                .append("Content-Length", self.body.len().to_string());
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Plain-text response with the given status and message.
    pub fn text(status: StatusCode, message: &str) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(format!("{message}\n").into_bytes())
            .build()
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::text(StatusCode::NotFound, "404 page not found")
    }

    pub fn bad_request(message: &str) -> Self {
        Self::text(StatusCode::BadRequest, message)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error(message: &str) -> Self {
        Self::text(StatusCode::InternalServerError, message)
    }
}

/// Status line and headers of a response received from a backend.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
}

impl ResponseHead {
    /// Interim 1xx responses other than `101 Switching Protocols`.
    pub fn is_interim(&self) -> bool {
        (100..200).contains(&self.status) && self.status != 101
    }

    /// How the body after this head is delimited, given the request method.
    pub fn body_kind(&self, method: &Method) -> BodyKind {
        if *method == Method::HEAD
            || (100..200).contains(&self.status)
            || self.status == 204
            || self.status == 304
        {
            return BodyKind::Empty;
        }

        if self.headers.has_token("Transfer-Encoding", "chunked") {
            return BodyKind::Chunked;
        }

        match self.headers.get("Content-Length") {
            Some(len) => match len.trim().parse::<u64>() {
                Ok(0) => BodyKind::Empty,
                Ok(n) => BodyKind::Length(n),
                Err(_) => BodyKind::UntilClose,
            },
            None => BodyKind::UntilClose,
        }
    }

    /// Serializes the head for the client.
    ///
    /// Status and headers are kept as the backend sent them, minus the
    /// connection-scoped ones; `Connection: close` is added when the gateway
    /// is going to drop the client connection afterwards.
    pub fn to_client_bytes(&self, keep_alive: bool) -> Vec<u8> {
        let mut headers = self.headers.clone();
        headers.remove("Connection");
        headers.remove("Keep-Alive");
        headers.remove("Proxy-Connection");
        if !keep_alive {
            headers.append("Connection", "close");
        }

        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(format!("HTTP/1.1 {:03} {}\r\n", self.status, self.reason).as_bytes());
        headers.write_to(&mut buf);
        buf.extend_from_slice(b"\r\n");
        buf
    }
}
