//! Duplex stream tunnel
//!
//! Once a WebSocket upgrade has been accepted for a tunnel route, the
//! gateway stops speaking HTTP on that connection. The original handshake
//! bytes are replayed to the backend unchanged, and from then on the session
//! is a pair of byte pipes, one per direction.
//!
//! ```text
//!            ┌──────── client → backend ────────┐
//!  Client ───┤                                  ├─── Backend
//!            └──────── backend → client ────────┘
//! ```
//!
//! Each pipe runs as its own task. When a pipe's source reaches EOF or fails,
//! it shuts down the write side of its destination and ends. The session ends
//! when both pipes have ended; dropping the halves then closes both sockets.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, copy, split};

use crate::error::GatewayError;

/// Bytes moved by a finished session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub client_to_backend: u64,
    pub backend_to_client: u64,
}

/// One live tunnel: exclusive owner of both connections.
pub struct TunnelSession<C, B> {
    client: C,
    backend: B,
    /// Request head plus any bytes the client sent behind it
    handshake: Bytes,
}

impl<C, B> TunnelSession<C, B>
where
    C: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    B: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(client: C, backend: B, handshake: impl Into<Bytes>) -> Self {
        Self {
            client,
            backend,
            handshake: handshake.into(),
        }
    }

    /// Replays the handshake, then relays until both directions finish.
    ///
    /// A replay failure ends the session at once; both connections are
    /// dropped on every path out of here.
    pub async fn run(mut self) -> Result<RelayStats, GatewayError> {
        self.replay().await?;
        Ok(self.relay().await)
    }

    async fn replay(&mut self) -> Result<(), GatewayError> {
        self.backend
            .write_all(&self.handshake)
            .await
            .map_err(GatewayError::BackendIo)?;
        self.backend.flush().await.map_err(GatewayError::BackendIo)?;

        tracing::trace!(bytes = self.handshake.len(), "Handshake replayed to backend");
        Ok(())
    }

    async fn relay(self) -> RelayStats {
        let (client_read, client_write) = split(self.client);
        let (backend_read, backend_write) = split(self.backend);

        let upstream = tokio::spawn(pipe(client_read, backend_write, "client->backend"));
        let downstream = tokio::spawn(pipe(backend_read, client_write, "backend->client"));

        let (up, down) = tokio::join!(upstream, downstream);

        RelayStats {
            client_to_backend: up.unwrap_or_else(|e| {
                tracing::error!(error = %e, "client->backend relay task failed");
                0
            }),
            backend_to_client: down.unwrap_or_else(|e| {
                tracing::error!(error = %e, "backend->client relay task failed");
                0
            }),
        }
    }
}

/// Copies `src` into `dst` until EOF or error, then shuts down `dst`.
///
/// Returns the number of bytes forwarded, or 0 when the direction failed.
/// Errors end the direction quietly: the connection is already hijacked, so
/// there is nobody left to tell.
async fn pipe<R, W>(mut src: R, mut dst: W, direction: &'static str) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = match copy(&mut src, &mut dst).await {
        Ok(n) => {
            tracing::debug!(direction, bytes = n, "Relay direction reached EOF");
            n
        }
        Err(e) => {
            tracing::debug!(direction, error = %e, "Relay direction failed");
            0
        }
    };

    if let Err(e) = dst.shutdown().await {
        tracing::trace!(direction, error = %e, "Shutdown of relay destination failed");
    }

    copied
}
