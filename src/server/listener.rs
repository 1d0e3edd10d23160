use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{Instrument, info};

use crate::config::Config;
use crate::gateway::Gateway;
use crate::http::connection::Connection;

/// Binds the configured address and serves `gateway` on it.
///
/// Failing to bind is the only error that stops the process.
pub async fn run(cfg: &Config, gateway: Arc<Gateway>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", cfg.server.listen_addr))?;
    info!("Listening on {}", cfg.server.listen_addr);

    serve(listener, gateway).await
}

/// Accepts connections and serves each on its own task.
pub async fn serve(listener: TcpListener, gateway: Arc<Gateway>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                // Transient accept errors (e.g. EMFILE) are retried.
                tracing::error!(error = %e, "Failed to accept connection");
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                continue;
            }
        };
        tracing::debug!("Accepted connection from {}", peer);

        if let Err(e) = socket.set_nodelay(true) {
            tracing::trace!(error = %e, "Failed to set TCP_NODELAY");
        }

        let gateway = Arc::clone(&gateway);
        let span = tracing::info_span!("conn", %peer);
        tokio::spawn(
            async move {
                let conn = Connection::new(socket, gateway);
                if let Err(e) = conn.run().await {
                    tracing::error!("Connection error from {}: {}", peer, e);
                }
            }
            .instrument(span),
        );
    }
}
