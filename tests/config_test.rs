use loges_forwarder::app::{Config, ConfigError, LogFormat, LogLevel};
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const ENV_VARS: &[&str] = &[
    "DEBUG",
    "LOGES_ADDRESS",
    "LOGES_PORT",
    "LOGES_BATCH_SIZE",
    "LOGES_TAGS",
    "LOGES_CONFIG_FILE",
];

fn clear_env() {
    for name in ENV_VARS {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::remove_var(name) };
    }
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();
    let config = Config::from_args(["loges-forwarder"]).unwrap();

    assert_eq!(config.address, "localhost");
    assert_eq!(config.port, None);
    assert_eq!(config.doc_type, "logspout");
    assert_eq!(config.index_prefix, "logstash-");
    assert_eq!(config.ttl, "90d");
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.log_format, LogFormat::Compact);
    assert_eq!(config.channel_capacity, 10_000);
    assert_eq!(config.batch_config.max_documents, 100);
    assert_eq!(config.batch_config.max_bytes, 5 * 1024 * 1024);
    assert_eq!(
        config.batch_config.flush_interval,
        Duration::from_millis(1000)
    );
    assert_eq!(config.batch_config.max_pending, 100_000);
    assert_eq!(config.retry_config.max_attempts, 8);
    assert_eq!(config.retry_config.base_delay, Duration::from_millis(500));
    assert_eq!(config.retry_config.max_delay, Duration::from_secs(30));
    assert_eq!(config.retry_config.max_elapsed, Duration::from_secs(120));
}

#[test]
#[serial]
fn test_flags() {
    clear_env();
    let config = Config::from_args([
        "loges-forwarder",
        "--address",
        "es1+es2:9201",
        "--port",
        "9300",
        "--tags",
        "prod,eu",
        "--batch-size",
        "250",
        "--max-pending",
        "5000",
        "--log-format",
        "json",
    ])
    .unwrap();

    assert_eq!(config.address, "es1+es2:9201");
    assert_eq!(config.port, Some(9300));
    assert_eq!(config.tags, vec!["prod", "eu"]);
    assert_eq!(config.batch_config.max_documents, 250);
    assert_eq!(config.batch_config.max_pending, 5000);
    assert_eq!(config.log_format, LogFormat::Json);

    let settings = config.adapter_settings();
    assert_eq!(settings.port, Some(9300));
    assert_eq!(settings.batch.max_documents, 250);
}

#[test]
#[serial]
fn test_environment_fallbacks() {
    clear_env();
    // SAFETY: tests touching the environment are serialized.
    unsafe {
        std::env::set_var("LOGES_ADDRESS", "loges://es-main:9205");
        std::env::set_var("LOGES_BATCH_SIZE", "42");
    }

    let config = Config::from_args(["loges-forwarder"]).unwrap();
    clear_env();

    assert_eq!(config.address, "loges://es-main:9205");
    assert_eq!(config.batch_size, 42);
}

#[test]
#[serial]
fn test_debug_env_forces_debug_level() {
    clear_env();
    // SAFETY: tests touching the environment are serialized.
    unsafe { std::env::set_var("DEBUG", "1") };
    let config = Config::from_args(["loges-forwarder", "--log-level", "warn"]).unwrap();
    assert_eq!(config.log_level, LogLevel::Debug);

    // SAFETY: as above.
    unsafe { std::env::set_var("DEBUG", "false") };
    let config = Config::from_args(["loges-forwarder", "--log-level", "warn"]).unwrap();
    assert_eq!(config.log_level, LogLevel::Warn);
    clear_env();
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    clear_env();
    let result = Config::from_args(["loges-forwarder", "--address", "es1++es2"]);
    assert!(matches!(result, Err(ConfigError::InvalidAddress(_))));

    let result = Config::from_args(["loges-forwarder", "--batch-size", "0"]);
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));

    let result = Config::from_args(["loges-forwarder", "--batch-size", "lots"]);
    assert!(matches!(result, Err(ConfigError::Args(_))));
}

#[test]
#[serial]
fn test_config_file_replaces_flags() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
address = "es-a+es-b"
port = 9250
tags = ["staging"]
batch_size = 20
flush_interval_ms = 250
ttl = ""
log_level = "debug"
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let config = Config::load(["loges-forwarder", "--config-file", &path]).unwrap();

    assert_eq!(config.address, "es-a+es-b");
    assert_eq!(config.port, Some(9250));
    assert_eq!(config.tags, vec!["staging"]);
    assert_eq!(config.batch_config.max_documents, 20);
    assert_eq!(
        config.batch_config.flush_interval,
        Duration::from_millis(250)
    );
    assert_eq!(config.log_level, LogLevel::Debug);
    // Keys the file leaves out keep their defaults.
    assert_eq!(config.doc_type, "logspout");
    assert_eq!(config.adapter_settings().ttl, None);
    assert_eq!(config.config_file.as_deref(), Some(file.path()));
}

#[test]
#[serial]
fn test_missing_config_file() {
    clear_env();
    let args = ["loges-forwarder", "--config-file", "/nonexistent/loges.toml"];
    let result = Config::load(args);
    assert!(matches!(result, Err(ConfigError::FileError(_))));
}
