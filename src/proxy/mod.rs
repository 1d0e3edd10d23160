//! Routing and forwarding
//!
//! This module resolves request paths to backends and moves bytes to them:
//! path-rewriting HTTP forwarding for proxy routes, and raw TCP tunnels for
//! WebSocket upgrades on tunnel routes.

pub mod backend;
pub mod body;
pub mod router;
pub mod tunnel;
pub mod upgrade;
pub mod upstream;

pub use backend::{Backend, TunnelTarget};
pub use router::{Resolution, Route, RouteKind, Router};
pub use tunnel::{RelayStats, TunnelSession};
pub use upgrade::is_upgrade_request;
pub use upstream::{ForwardPlan, ProxyHandler};
