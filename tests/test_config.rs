use std::io::Write;

use tempfile::NamedTempFile;
use waygate::config::Config;

const SAMPLE: &str = r#"
server:
  listen_addr: "127.0.0.1:9090"
  connect_timeout_secs: 3
routes:
  - prefix: /stock
    backend: http://localhost:8001
  - prefix: /raw
    backend: http://localhost:8003
    strip_prefix: false
tunnels:
  - path: /ws
    backend: localhost:9999
"#;

#[test]
fn test_config_from_yaml() {
    let cfg = Config::from_yaml(SAMPLE).unwrap();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:9090");
    assert_eq!(cfg.connect_timeout(), Some(std::time::Duration::from_secs(3)));
    assert_eq!(cfg.routes.len(), 2);
    assert!(cfg.routes[0].strip_prefix);
    assert!(!cfg.routes[1].strip_prefix);
    assert_eq!(cfg.tunnels[0].backend, "localhost:9999");
}

#[test]
fn test_config_defaults_for_missing_sections() {
    let cfg = Config::from_yaml("routes: []").unwrap();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:8080");
    assert_eq!(cfg.server.connect_timeout_secs, Some(10));
    assert_eq!(cfg.server.health_path.as_deref(), Some("/health"));
    assert!(cfg.tunnels.is_empty());
}

#[test]
fn test_config_null_disables_optional_settings() {
    let cfg = Config::from_yaml("server:\n  connect_timeout_secs: null\n  health_path: null\n").unwrap();

    assert_eq!(cfg.connect_timeout(), None);
    assert_eq!(cfg.server.health_path, None);
}

#[test]
fn test_config_builtin_routes() {
    let cfg = Config::default();

    let prefixes: Vec<&str> = cfg.routes.iter().map(|r| r.prefix.as_str()).collect();
    assert_eq!(prefixes, vec!["/stock", "/service-b"]);
    assert_eq!(cfg.tunnels[0].path, "/ws");
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_rejects_duplicate_prefix() {
    let yaml = r#"
routes:
  - prefix: /ws
    backend: http://localhost:8001
tunnels:
  - path: /ws
    backend: localhost:9999
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn test_config_rejects_relative_prefix() {
    let yaml = "routes:\n  - prefix: stock\n    backend: http://localhost:8001\n";
    assert!(Config::from_yaml(yaml).is_err());
}

#[test]
fn test_config_rejects_relative_health_path() {
    assert!(Config::from_yaml("server:\n  health_path: health\n").is_err());
}

#[test]
fn test_config_keeps_unparseable_backend() {
    // Address syntax is judged per request, not at load time.
    let yaml = "routes:\n  - prefix: /bad\n    backend: \"::not-a-url\"\n";
    assert!(Config::from_yaml(yaml).is_ok());
}

#[test]
fn test_config_invalid_yaml() {
    assert!(Config::from_yaml("routes: [unclosed").is_err());
}

#[test]
fn test_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();

    let cfg = Config::from_file(file.path()).unwrap();
    assert_eq!(cfg.routes.len(), 2);
}

#[test]
fn test_config_missing_file() {
    let err = Config::from_file("/nonexistent/waygate.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_config_load_honours_environment() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();

    // Only test in this binary that touches the process environment.
    unsafe {
        std::env::set_var("WAYGATE_CONFIG", file.path());
        std::env::set_var("LISTEN", "127.0.0.1:7070");
    }

    let cfg = Config::load().unwrap();

    unsafe {
        std::env::remove_var("WAYGATE_CONFIG");
        std::env::remove_var("LISTEN");
    }

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:7070");
    assert_eq!(cfg.routes[1].prefix, "/raw");
}
