use crate::config::{load_config, DyadConfig, StorageKind};
use std::path::Path;

#[test]
fn missing_file_falls_back_to_defaults() {
    let cfg = load_config(Path::new("/nonexistent/dyad.toml")).expect("defaults");
    assert_eq!(cfg.server.push_addr, "127.0.0.1:5001");
    assert_eq!(cfg.server.http_addr, "127.0.0.1:5000");
    assert_eq!(cfg.storage.kind, StorageKind::Sqlite);
    assert_eq!(cfg.delivery.auto_read_delay_ms, 2000);
    assert_eq!(cfg.logging.level, "info");
}

#[test]
fn config_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dyad.toml");
    std::fs::write(
        &path,
        r#"
[server]
push_addr = "0.0.0.0:7001"
http_addr = "0.0.0.0:7000"

[storage]
kind = "memory"

[delivery]
auto_read_delay_ms = 250
enable_typing = false

[logging]
level = "debug"
"#,
    )
    .expect("write config");

    let cfg = load_config(&path).expect("load");
    assert_eq!(cfg.server.push_addr, "0.0.0.0:7001");
    assert_eq!(cfg.storage.kind, StorageKind::Memory);
    assert_eq!(cfg.delivery.auto_read_delay_ms, 250);
    assert!(!cfg.delivery.enable_typing);
    // Unset fields keep their defaults.
    assert_eq!(cfg.delivery.max_identity_len, 64);
    assert_eq!(cfg.logging.level, "debug");
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dyad.toml");
    std::fs::write(&path, "[server]\nunknown_knob = 1\n").expect("write config");
    assert!(load_config(&path).is_err());
}

#[test]
fn delivery_config_maps_onto_core_config() {
    let cfg = DyadConfig::default();
    let core = cfg.delivery.core_config();
    assert_eq!(core.auto_read_delay_ms, cfg.delivery.auto_read_delay_ms);
    assert_eq!(core.max_body_bytes, cfg.delivery.max_body_bytes);
    assert_eq!(core.enable_typing, cfg.delivery.enable_typing);
}
