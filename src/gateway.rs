//! The explicit router object handed to the server.
//!
//! [`Gateway::dispatch`] is the single place that looks at an inbound request
//! and decides what happens to it. It does no I/O; the connection carries out
//! the decision.

use std::time::Duration;

use crate::config::Config;
use crate::error::GatewayError;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::proxy::backend::TunnelTarget;
use crate::proxy::router::{RouteKind, Router, Target};
use crate::proxy::upgrade::is_upgrade_request;
use crate::proxy::upstream::{ForwardPlan, ProxyHandler};

const HEALTH_BODY: &[u8] = br#"{"status": "healthy", "message": "API Gateway is running"}"#;

/// What to do with one request
#[derive(Debug)]
pub enum Dispatch {
    /// Answer locally.
    Respond(Response),
    /// Stream through the proxy.
    Forward(ForwardPlan),
    /// Hand the connection over to a raw tunnel.
    Tunnel(TunnelTarget),
}

#[derive(Debug, Clone)]
pub struct Gateway {
    router: Router,
    proxy: ProxyHandler,
    health_path: Option<String>,
}

impl Gateway {
    pub fn new(router: Router, connect_timeout: Option<Duration>) -> Self {
        Self {
            router,
            proxy: ProxyHandler::new(connect_timeout),
            health_path: None,
        }
    }

    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = Some(path.into());
        self
    }

    pub fn from_config(cfg: &Config) -> Self {
        let gateway = Self::new(Router::from_config(cfg), cfg.connect_timeout());
        match &cfg.server.health_path {
            Some(path) => gateway.with_health_path(path.clone()),
            None => gateway,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn proxy(&self) -> &ProxyHandler {
        &self.proxy
    }

    pub fn health_path(&self) -> Option<&str> {
        self.health_path.as_deref()
    }

    pub fn dispatch(&self, request: &Request) -> Dispatch {
        if self.health_path.as_deref() == Some(request.path_only()) {
            return Dispatch::Respond(
                ResponseBuilder::new(StatusCode::Ok)
                    .header("Content-Type", "application/json")
                    .body(HEALTH_BODY.to_vec())
                    .build(),
            );
        }

        let Some(resolution) = self.router.resolve(&request.path) else {
            tracing::debug!(method = %request.method, path = %request.path, "No route matched");
            return Dispatch::Respond(Response::not_found());
        };
        let route = resolution.route;

        if route.kind == RouteKind::Tunnel
            && !(request.method == Method::GET && is_upgrade_request(&request.headers))
        {
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                "Tunnel path requested without websocket upgrade"
            );
            return respond_error(&GatewayError::NotAnUpgrade);
        }

        let target = match route.target() {
            Ok(target) => target,
            Err(e) => {
                tracing::error!(path = %request.path, prefix = %route.prefix, error = %e, "Route misconfigured");
                return respond_error(&e);
            }
        };

        match target {
            Target::Http(backend) => Dispatch::Forward(
                ForwardPlan::new(request, backend).with_path(resolution.forwarded_path),
            ),
            Target::Tcp(tunnel) => Dispatch::Tunnel(tunnel.clone()),
        }
    }
}

fn respond_error(e: &GatewayError) -> Dispatch {
    Dispatch::Respond(
        e.to_response()
            .unwrap_or_else(|| Response::internal_error("Internal Server Error")),
    )
}
