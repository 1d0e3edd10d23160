use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;

/// Env var naming the YAML config file.
pub const CONFIG_ENV: &str = "WAYGATE_CONFIG";
/// File read when `WAYGATE_CONFIG` is unset. Missing is fine: defaults apply.
pub const DEFAULT_CONFIG_FILE: &str = "waygate.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub tunnels: Vec<TunnelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Dial deadline for proxy and tunnel backends; `null` waits forever.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: Option<u64>,
    /// Exact path of the liveness endpoint; `null` turns it off.
    #[serde(default = "default_health_path")]
    pub health_path: Option<String>,
}

/// A path-prefix HTTP route.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub prefix: String,
    pub backend: String,
    #[serde(default = "default_true")]
    pub strip_prefix: bool,
}

/// A path whose WebSocket upgrades are tunnelled to a raw TCP backend.
#[derive(Debug, Clone, Deserialize)]
pub struct TunnelConfig {
    pub path: String,
    pub backend: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_connect_timeout() -> Option<u64> {
    Some(10)
}

fn default_health_path() -> Option<String> {
    Some("/health".to_string())
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            connect_timeout_secs: default_connect_timeout(),
            health_path: default_health_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            routes: vec![
                RouteConfig {
                    prefix: "/stock".to_string(),
                    backend: "http://localhost:8001".to_string(),
                    strip_prefix: true,
                },
                RouteConfig {
                    prefix: "/service-b".to_string(),
                    backend: "http://localhost:8002".to_string(),
                    strip_prefix: true,
                },
            ],
            tunnels: vec![TunnelConfig {
                path: "/ws".to_string(),
                backend: "localhost:9999".to_string(),
            }],
        }
    }
}

impl Config {
    /// Loads the configuration the process runs with.
    ///
    /// Reads the file named by `WAYGATE_CONFIG`, or `waygate.yaml` when that
    /// exists, or falls back to the built-in routes. `LISTEN` overrides the
    /// listen address either way.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(listen) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let cfg: Config =
            serde_yaml::from_str(content).context("Failed to parse config as valid YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Structural checks that must hold before serving.
    ///
    /// Backend address syntax is deliberately not checked here; a bad
    /// address only disables its own route.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen: Vec<&str> = Vec::new();

        let prefixes = self
            .routes
            .iter()
            .map(|r| r.prefix.as_str())
            .chain(self.tunnels.iter().map(|t| t.path.as_str()));

        for prefix in prefixes {
            if !prefix.starts_with('/') {
                bail!("route prefix {prefix:?} must start with '/'");
            }
            if seen.contains(&prefix) {
                bail!("route prefix {prefix:?} is registered more than once");
            }
            seen.push(prefix);
        }

        if let Some(health) = &self.server.health_path {
            if !health.starts_with('/') {
                bail!("health path {health:?} must start with '/'");
            }
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<std::time::Duration> {
        self.server
            .connect_timeout_secs
            .map(std::time::Duration::from_secs)
    }
}
