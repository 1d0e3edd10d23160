//! Waygate - path-prefix API gateway
//!
//! Forwards HTTP requests to backends chosen by URL-path prefix, stripping
//! the prefix on the way, and tunnels WebSocket upgrades to raw TCP backends.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod proxy;
pub mod server;
