//! Backend addresses
//!
//! Parses the address strings from configuration into something a dial can
//! use. Parsing happens once when the router is built; a failure is kept on
//! the route and reported for every request that lands there.

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::error::GatewayError;

/// An HTTP backend a proxy route forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Address as configured (e.g. "http://localhost:8001")
    pub url: String,
    pub host: String,
    pub port: u16,
    /// Value for the forwarded `Host` header
    pub authority: String,
    /// Path the backend is mounted under, without trailing slash ("" for root)
    pub base_path: String,
}

impl Backend {
    /// Parse an `http://host[:port][/base]` address.
    pub fn parse(address: &str) -> Result<Self, String> {
        let url = Url::parse(address).map_err(|e| e.to_string())?;

        if url.scheme() != "http" {
            return Err(format!("unsupported scheme {:?}", url.scheme()));
        }

        let raw_host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| "missing host".to_string())?;
        let host = raw_host.trim_start_matches('[').trim_end_matches(']').to_string();
        let port = url.port_or_known_default().unwrap_or(80);

        let authority = match url.port() {
            Some(port) => format!("{raw_host}:{port}"),
            None => raw_host.to_string(),
        };

        let base_path = url.path().trim_end_matches('/').to_string();

        Ok(Self {
            url: address.to_string(),
            host,
            port,
            authority,
            base_path,
        })
    }

    /// `host:port` to dial.
    pub fn dial_addr(&self) -> String {
        dial_addr(&self.host, self.port)
    }
}

/// A raw TCP endpoint a tunnel route relays to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelTarget {
    pub host: String,
    pub port: u16,
}

impl TunnelTarget {
    /// Accepts `host:port`, or a `ws://`/`http://` URL with an explicit or default port.
    pub fn parse(address: &str) -> Result<Self, String> {
        if address.contains("://") {
            let url = Url::parse(address).map_err(|e| e.to_string())?;
            match url.scheme() {
                "ws" | "http" => {}
                other => return Err(format!("unsupported scheme {other:?}")),
            }
            let host = url
                .host_str()
                .filter(|h| !h.is_empty())
                .ok_or_else(|| "missing host".to_string())?
                .trim_start_matches('[')
                .trim_end_matches(']')
                .to_string();
            let port = url.port_or_known_default().unwrap_or(80);
            return Ok(Self { host, port });
        }

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| "expected host:port".to_string())?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err("missing host".to_string());
        }
        let port: u16 = port
            .parse()
            .map_err(|_| format!("invalid port {port:?}"))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn dial_addr(&self) -> String {
        dial_addr(&self.host, self.port)
    }
}

fn dial_addr(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Opens a TCP connection to a backend, bounded by `connect_timeout` if set.
///
/// A single attempt: refusal, DNS failure and deadline expiry all come back
/// as [`GatewayError::BackendUnreachable`].
pub async fn dial(addr: &str, connect_timeout: Option<Duration>) -> Result<TcpStream, GatewayError> {
    let attempt = TcpStream::connect(addr);

    let result = match connect_timeout {
        Some(limit) => match timeout(limit, attempt).await {
            Ok(res) => res,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")),
        },
        None => attempt.await,
    };

    let stream = result.map_err(|source| GatewayError::BackendUnreachable {
        address: addr.to_string(),
        source,
    })?;

    tracing::trace!(backend = %addr, "Connected to backend");
    Ok(stream)
}
