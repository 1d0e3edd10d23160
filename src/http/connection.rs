use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::gateway::{Dispatch, Gateway};
use crate::http::parser::{ParseError, parse_http_request};
use crate::http::request::{BodyKind, Request};
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::proxy::backend::{TunnelTarget, dial};
use crate::proxy::tunnel::TunnelSession;

const READ_CHUNK: usize = 4096;

pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    gateway: Arc<Gateway>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request, Bytes), // parsed head + its raw bytes
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

/// Result of waiting for the next request head
enum Inbound {
    Request(Request, Bytes),
    Malformed(ParseError),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(stream: S, gateway: Arc<Gateway>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            gateway,
            state: ConnectionState::Reading,
        }
    }

    /// Serves requests until the client leaves, an exchange ends the
    /// connection, or the connection is hijacked by a tunnel.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await? {
                        Inbound::Request(req, raw) => ConnectionState::Processing(req, raw),
                        Inbound::Malformed(e) => {
                            tracing::warn!(error = ?e, "Malformed request");
                            let response = Response::bad_request("Bad Request");
                            ConnectionState::Writing(ResponseWriter::new(&response, false), false)
                        }
                        Inbound::Closed => ConnectionState::Closed,
                    };
                }

                ConnectionState::Processing(req, raw) => match self.gateway.dispatch(&req) {
                    Dispatch::Respond(response) => {
                        // An unread body would be taken for the next request.
                        let keep_alive = req.keep_alive() && req.body_kind() == BodyKind::Empty;
                        let writer = ResponseWriter::new(&response, keep_alive);
                        self.state = ConnectionState::Writing(writer, keep_alive);
                    }

                    Dispatch::Forward(plan) => {
                        let keep_alive = self
                            .gateway
                            .proxy()
                            .forward(&mut self.stream, &mut self.buffer, &req, &plan)
                            .await;

                        self.state = if keep_alive {
                            ConnectionState::Reading
                        } else {
                            ConnectionState::Closed
                        };
                    }

                    Dispatch::Tunnel(target) => {
                        return self.hijack(req, raw, target).await;
                    }
                },

                ConnectionState::Writing(mut writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    } else {
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<Inbound> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    let raw = self.buffer.split_to(consumed).freeze();
                    return Ok(Inbound::Request(request, raw));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => return Ok(Inbound::Malformed(e)),
            }

            self.buffer.reserve(READ_CHUNK);
            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(buffered = self.buffer.len(), "Client closed mid-request");
                }
                return Ok(Inbound::Closed);
            }
        }
    }

    /// Takes the raw connection away from HTTP handling and tunnels it.
    ///
    /// The backend is dialed first, so an unreachable backend still gets an
    /// ordinary 502 response on this connection.
    async fn hijack(self, request: Request, head: Bytes, target: TunnelTarget) -> anyhow::Result<()> {
        let Connection {
            mut stream,
            buffer,
            gateway,
            ..
        } = self;

        let addr = target.dial_addr();
        tracing::info!(path = %request.path, backend = %addr, "WebSocket upgrade request");

        let backend = match dial(&addr, gateway.proxy().connect_timeout()).await {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(path = %request.path, backend = %addr, error = %e, "WebSocket backend unavailable");
                if let Some(response) = e.to_response() {
                    ResponseWriter::new(&response, false)
                        .write_to_stream(&mut stream)
                        .await?;
                }
                return Ok(());
            }
        };

        // From here on the connection belongs to the tunnel.
        let mut handshake = BytesMut::with_capacity(head.len() + buffer.len());
        handshake.extend_from_slice(&head);
        handshake.extend_from_slice(&buffer);

        tracing::info!(path = %request.path, backend = %addr, "WebSocket connection established");

        match TunnelSession::new(stream, backend, handshake.freeze()).run().await {
            Ok(stats) => tracing::info!(
                path = %request.path,
                backend = %addr,
                bytes_up = stats.client_to_backend,
                bytes_down = stats.backend_to_client,
                "WebSocket tunnel closed"
            ),
            Err(e) => tracing::warn!(
                path = %request.path,
                backend = %addr,
                error = %e,
                "WebSocket tunnel aborted"
            ),
        }

        Ok(())
    }
}
