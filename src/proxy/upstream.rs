//! Upstream request forwarding
//!
//! Forwarding is split in two. [`ForwardPlan`] is a pure description of the
//! request the backend should see, built from the client request and the
//! resolved route. [`ProxyHandler::forward`] executes a plan: one dial, one
//! request, the response streamed back to the client.

use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::GatewayError;
use crate::http::headers::Headers;
use crate::http::parser::{ParseError, parse_http_response_head};
use crate::http::request::{BodyKind, Method, Request, split_target};
use crate::http::response::ResponseHead;
use crate::http::writer::ResponseWriter;
use crate::proxy::backend::{Backend, dial};
use crate::proxy::body::{BUFFER_SIZE, RelayError, relay_body};

/// Connection-scoped headers that never travel to the backend.
const HOP_BY_HOP: [&str; 6] = [
    "Connection",
    "Keep-Alive",
    "Proxy-Connection",
    "Upgrade",
    "Expect",
    "TE",
];

const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// The request a backend will receive for one client request.
#[derive(Debug, Clone)]
pub struct ForwardPlan {
    pub backend: Backend,
    pub method: Method,
    /// Request target relative to the backend's base path
    pub path: String,
    pub headers: Headers,
    pub body: BodyKind,
}

impl ForwardPlan {
    /// Default forwarding request: same method, target, headers and body,
    /// with `Host` pointing at the backend and hop-by-hop headers replaced
    /// by `Connection: close`.
    pub fn new(request: &Request, backend: &Backend) -> Self {
        let mut headers = request.headers.clone();

        // Headers named in Connection are hop-by-hop as well.
        let listed: Vec<String> = headers
            .get("Connection")
            .map(|v| v.split(',').map(|t| t.trim().to_string()).collect())
            .unwrap_or_default();
        for name in listed.iter().filter(|n| !n.is_empty()) {
            headers.remove(name);
        }
        for name in HOP_BY_HOP {
            headers.remove(name);
        }

        let body = request.body_kind();
        match body {
            BodyKind::Chunked => {
                headers.remove("Content-Length");
            }
            // Repeated agreeing values collapse to one.
            BodyKind::Length(len) => headers.insert("Content-Length", len.to_string()),
            _ => {}
        }

        headers.insert("Host", backend.authority.clone());
        headers.append("Connection", "close");

        Self {
            backend: backend.clone(),
            method: request.method.clone(),
            path: request.path.clone(),
            headers,
            body,
        }
    }

    /// Replaces the request target, e.g. with the prefix-stripped one.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Request target on the wire: base path and plan path joined with a
    /// single slash, `/` when both are empty, query string kept.
    pub fn target(&self) -> String {
        let (path, query) = split_target(&self.path);
        let base = self.backend.base_path.as_str();

        let mut joined = if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };

        if joined.is_empty() {
            joined.push('/');
        }
        if let Some(query) = query {
            joined.push('?');
            joined.push_str(query);
        }

        joined
    }

    /// Serialized request line and headers.
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(256);
        buffer.extend_from_slice(
            format!("{} {} HTTP/1.1\r\n", self.method, self.target()).as_bytes(),
        );
        self.headers.write_to(&mut buffer);
        buffer.extend_from_slice(b"\r\n");
        buffer
    }
}

/// Result of a completed exchange
struct Exchange {
    status: u16,
    keep_alive: bool,
    response_bytes: u64,
}

/// Executes forward plans against backends
#[derive(Debug, Clone)]
pub struct ProxyHandler {
    /// Dial deadline, if any
    connect_timeout: Option<Duration>,
}

impl ProxyHandler {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Forward one client request and stream the response back.
    ///
    /// `pending` holds client bytes read past the request head. Failures
    /// before the response head went out are answered with the matching
    /// error status; later failures just end the connection. Never retries.
    ///
    /// Returns whether the client connection can carry another request.
    pub async fn forward<C>(
        &self,
        client: &mut C,
        pending: &mut BytesMut,
        request: &Request,
        plan: &ForwardPlan,
    ) -> bool
    where
        C: AsyncRead + AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let mut response_started = false;

        match self
            .exchange(client, pending, request, plan, &mut response_started)
            .await
        {
            Ok(exchange) => {
                tracing::info!(
                    method = %request.method,
                    path = %request.path,
                    backend = %plan.backend.url,
                    target = %plan.target(),
                    status = exchange.status,
                    bytes = exchange.response_bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Request forwarded"
                );
                exchange.keep_alive
            }
            Err(e) => {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    backend = %plan.backend.url,
                    target = %plan.target(),
                    error = %e,
                    response_started,
                    "Proxy error"
                );

                if !response_started {
                    if let Some(response) = e.to_response() {
                        let mut writer = ResponseWriter::new(&response, false);
                        if let Err(write_err) = writer.write_to_stream(client).await {
                            tracing::debug!(error = %write_err, "Failed to deliver error response");
                        }
                    }
                }
                false
            }
        }
    }

    async fn exchange<C>(
        &self,
        client: &mut C,
        pending: &mut BytesMut,
        request: &Request,
        plan: &ForwardPlan,
        response_started: &mut bool,
    ) -> Result<Exchange, GatewayError>
    where
        C: AsyncRead + AsyncWrite + Unpin,
    {
        let mut backend = dial(&plan.backend.dial_addr(), self.connect_timeout).await?;

        backend
            .write_all(&plan.head_bytes())
            .await
            .map_err(GatewayError::BackendIo)?;

        if plan.body != BodyKind::Empty && request.expects_continue() {
            client
                .write_all(CONTINUE)
                .await
                .map_err(GatewayError::ClientIo)?;
            client.flush().await.map_err(GatewayError::ClientIo)?;
        }

        relay_body(client, pending, &mut backend, plan.body)
            .await
            .map_err(|e| match e {
                RelayError::Read(e) => GatewayError::ClientIo(e),
                RelayError::Write(e) => GatewayError::BackendIo(e),
                RelayError::Malformed(m) => GatewayError::MalformedRequest(m.to_string()),
            })?;

        tracing::trace!("Request sent to backend");

        let mut upstream = BytesMut::with_capacity(BUFFER_SIZE);
        let head = loop {
            let head = read_response_head(&mut backend, &mut upstream).await?;
            if !head.is_interim() {
                break head;
            }
        };

        let body = head.body_kind(&request.method);
        let keep_alive =
            request.keep_alive() && body != BodyKind::UntilClose && head.status != 101;

        client
            .write_all(&head.to_client_bytes(keep_alive))
            .await
            .map_err(GatewayError::ClientIo)?;
        *response_started = true;

        let response_bytes = relay_body(&mut backend, &mut upstream, client, body)
            .await
            .map_err(|e| match e {
                RelayError::Read(e) => GatewayError::BackendIo(e),
                RelayError::Write(e) => GatewayError::ClientIo(e),
                RelayError::Malformed(m) => GatewayError::BackendProtocol(m.to_string()),
            })?;

        Ok(Exchange {
            status: head.status,
            keep_alive,
            response_bytes,
        })
    }
}

/// Read a response head from the backend, leaving any body bytes in `buffer`.
async fn read_response_head(
    backend: &mut TcpStream,
    buffer: &mut BytesMut,
) -> Result<ResponseHead, GatewayError> {
    loop {
        match parse_http_response_head(buffer) {
            Ok((head, consumed)) => {
                buffer.advance(consumed);
                return Ok(head);
            }
            Err(ParseError::Incomplete) => {}
            Err(e) => {
                return Err(GatewayError::BackendProtocol(format!("{e:?}")));
            }
        }

        buffer.reserve(BUFFER_SIZE);
        let n = backend
            .read_buf(buffer)
            .await
            .map_err(GatewayError::BackendIo)?;

        if n == 0 {
            return Err(GatewayError::BackendProtocol(
                "connection closed before complete response head".to_string(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestBuilder;

    #[test]
    fn connection_listed_headers_are_dropped() {
        let backend = Backend::parse("http://localhost:3000").unwrap();
        let request = RequestBuilder::new()
            .method(Method::GET)
            .path("/")
            .header("Connection", "keep-alive, X-Session")
            .header("X-Session", "abc")
            .header("Accept", "*/*")
            .build()
            .unwrap();

        let plan = ForwardPlan::new(&request, &backend);

        assert!(!plan.headers.contains_key("X-Session"));
        assert_eq!(plan.headers.get("Accept"), Some("*/*"));
        assert_eq!(plan.headers.get("Connection"), Some("close"));
    }
}
