use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use waygate::config::Config;
use waygate::gateway::Gateway;
use waygate::proxy::RouteKind;
use waygate::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let gateway = Arc::new(Gateway::from_config(&cfg));
    log_routes(&gateway);

    tokio::select! {
        res = server::listener::run(&cfg, gateway) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn log_routes(gateway: &Gateway) {
    for route in gateway.router().routes() {
        match route.kind {
            RouteKind::Proxy => tracing::info!(
                prefix = %route.prefix,
                backend = %route.backend_address,
                strip_prefix = route.strip_prefix,
                "HTTP route"
            ),
            RouteKind::Tunnel => tracing::info!(
                path = %route.prefix,
                backend = %route.backend_address,
                "WebSocket tunnel"
            ),
        }
    }

    if let Some(path) = gateway.health_path() {
        tracing::info!(path = %path, "Health check");
    }
}
