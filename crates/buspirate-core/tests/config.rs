use std::io::Write;

use buspirate_core::{BusPirateConfig, BusPirateError, TimeoutConfig};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "device": "/dev/ttyUSB1",
            "timeouts": {{ "short_ms": 20, "reset_ms": 250 }},
            "queue_capacity": 512
        }}"#
    )
    .unwrap();

    let config = BusPirateConfig::load(file.path()).unwrap();
    assert_eq!(
        config,
        BusPirateConfig {
            device: "/dev/ttyUSB1".to_string(),
            timeouts: TimeoutConfig {
                short_ms: 20,
                reset_ms: 250,
            },
            queue_capacity: 512,
        }
    );
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let err = BusPirateConfig::load(&path).unwrap_err();
    assert!(matches!(err, BusPirateError::Config(ref msg) if msg.contains("missing.json")));
}

#[test]
fn test_saved_defaults_load_back() {
    let config = BusPirateConfig::with_device("/dev/buspirate");
    let json = config.to_json_string().unwrap();

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let loaded = BusPirateConfig::load(file.path()).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.timeouts, TimeoutConfig::default());
}

#[test]
fn test_empty_object_is_default() {
    let config = BusPirateConfig::from_json_str("{}").unwrap();
    assert_eq!(config, BusPirateConfig::default());
}
