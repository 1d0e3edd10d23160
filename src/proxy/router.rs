//! Backend target registry
//!
//! An immutable table of path prefixes built once at startup and shared
//! read-only by every connection task. Resolution picks the longest matching
//! prefix and computes the path to forward by removing exactly that prefix.

use crate::config::Config;
use crate::error::GatewayError;
use crate::http::request::split_target;
use crate::proxy::backend::{Backend, TunnelTarget};

/// What a route does with the requests it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Path-rewriting HTTP reverse proxy.
    Proxy,
    /// WebSocket upgrades relayed over raw TCP; nothing else is accepted.
    Tunnel,
}

/// Parsed destination of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Http(Backend),
    Tcp(TunnelTarget),
}

#[derive(Debug, Clone)]
pub struct Route {
    pub prefix: String,
    pub kind: RouteKind,
    pub strip_prefix: bool,
    /// Address as written in the configuration
    pub backend_address: String,
    target: Result<Target, String>,
}

impl Route {
    pub fn proxy(prefix: impl Into<String>, backend: impl Into<String>, strip_prefix: bool) -> Self {
        let backend_address = backend.into();
        let target = Backend::parse(&backend_address).map(Target::Http);
        Self {
            prefix: prefix.into(),
            kind: RouteKind::Proxy,
            strip_prefix,
            backend_address,
            target,
        }
    }

    pub fn tunnel(path: impl Into<String>, backend: impl Into<String>) -> Self {
        let backend_address = backend.into();
        let target = TunnelTarget::parse(&backend_address).map(Target::Tcp);
        Self {
            prefix: path.into(),
            kind: RouteKind::Tunnel,
            strip_prefix: false,
            backend_address,
            target,
        }
    }

    /// The parsed destination, or the configuration error to report.
    pub fn target(&self) -> Result<&Target, GatewayError> {
        self.target.as_ref().map_err(|reason| GatewayError::InvalidTarget {
            address: self.backend_address.clone(),
            reason: reason.clone(),
        })
    }

    /// Proxy routes match any path starting with the prefix. Tunnel routes
    /// match the path itself and the subtree below it, so `/ws` does not
    /// claim `/wsx`.
    pub fn matches(&self, path: &str) -> bool {
        match self.kind {
            RouteKind::Proxy => path.starts_with(&self.prefix),
            RouteKind::Tunnel => match path.strip_prefix(self.prefix.as_str()) {
                Some(rest) => {
                    rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/')
                }
                None => false,
            },
        }
    }
}

/// A matched route together with the request target to send onwards.
#[derive(Debug)]
pub struct Resolution<'a> {
    pub route: &'a Route,
    /// Request target after prefix removal, query string preserved
    pub forwarded_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn from_config(cfg: &Config) -> Self {
        let proxies = cfg
            .routes
            .iter()
            .map(|r| Route::proxy(&r.prefix, &r.backend, r.strip_prefix));
        let tunnels = cfg.tunnels.iter().map(|t| Route::tunnel(&t.path, &t.backend));

        let routes: Vec<Route> = proxies.chain(tunnels).collect();

        for route in &routes {
            if let Err(e) = route.target() {
                tracing::warn!(
                    prefix = %route.prefix,
                    error = %e,
                    "Route has an unusable backend; its requests will fail with 500"
                );
            }
        }

        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Finds the route for a request target.
    ///
    /// Only the path component takes part in matching. The longest matching
    /// prefix wins; among equal lengths the earlier registration wins.
    pub fn resolve(&self, target: &str) -> Option<Resolution<'_>> {
        let (path, _) = split_target(target);

        let route = self
            .routes
            .iter()
            .filter(|r| r.matches(path))
            .fold(None::<&Route>, |best, r| match best {
                Some(b) if b.prefix.len() >= r.prefix.len() => Some(b),
                _ => Some(r),
            })?;

        let forwarded_path = if route.strip_prefix {
            target[route.prefix.len()..].to_string()
        } else {
            target.to_string()
        };

        Some(Resolution {
            route,
            forwarded_path,
        })
    }
}
