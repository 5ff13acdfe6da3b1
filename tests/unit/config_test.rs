//! Tests for configuration validation

use prometheus_admission::config::{RegistryConfig, SchedulerConfig, DEFAULT_CONCURRENCY};

#[test]
fn test_scheduler_config_default() {
    let config = SchedulerConfig::default();
    assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    assert_eq!(config.concurrency, 4);
    assert!(config.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_concurrency() {
    let invalid = SchedulerConfig::new(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let config = SchedulerConfig::from_json_str(r#"{ "concurrency": 2 }"#).unwrap();
    assert_eq!(config.concurrency, 2);
}

#[test]
fn test_scheduler_config_from_json_defaults_concurrency() {
    let config = SchedulerConfig::from_json_str("{}").unwrap();
    assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
}

#[test]
fn test_scheduler_config_from_json_rejects_zero_and_negative() {
    assert!(SchedulerConfig::from_json_str(r#"{ "concurrency": 0 }"#).is_err());

    let err = SchedulerConfig::from_json_str(r#"{ "concurrency": -3 }"#).unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_scheduler_config_from_env() {
    let key = "PROMETHEUS_ADMISSION_TEST_CONCURRENCY_OK";
    std::env::set_var(key, " 6 ");
    let config = SchedulerConfig::from_env_key(key).unwrap();
    assert_eq!(config.concurrency, 6);
    std::env::remove_var(key);
}

#[test]
fn test_scheduler_config_from_env_unset_uses_default() {
    let config = SchedulerConfig::from_env_key("PROMETHEUS_ADMISSION_TEST_CONCURRENCY_UNSET").unwrap();
    assert_eq!(config, SchedulerConfig::default());
}

#[test]
fn test_scheduler_config_from_env_rejects_garbage() {
    let key = "PROMETHEUS_ADMISSION_TEST_CONCURRENCY_BAD";
    std::env::set_var(key, "many");
    assert!(SchedulerConfig::from_env_key(key).is_err());

    std::env::set_var(key, "0");
    assert!(SchedulerConfig::from_env_key(key).is_err());
    std::env::remove_var(key);
}

#[test]
fn test_registry_config_validation() {
    let mut schedulers = std::collections::HashMap::new();
    schedulers.insert("uploads".to_string(), SchedulerConfig::new(4));

    let config = RegistryConfig { schedulers };
    assert!(config.validate().is_ok());
}

#[test]
fn test_registry_config_empty() {
    let config = RegistryConfig::default();
    assert!(config.validate().is_err());
}

#[test]
fn test_registry_config_names_invalid_entry() {
    let mut schedulers = std::collections::HashMap::new();
    schedulers.insert("previews".to_string(), SchedulerConfig::new(0));

    let err = RegistryConfig { schedulers }.validate().unwrap_err();
    assert!(err.contains("previews"));
}

#[test]
fn test_registry_config_from_json() {
    let json = r#"{
        "schedulers": {
            "uploads": { "concurrency": 4 },
            "previews": {}
        }
    }"#;

    let config = RegistryConfig::from_json_str(json).unwrap();
    assert_eq!(config.schedulers.len(), 2);
    assert_eq!(config.schedulers["previews"].concurrency, 4);
}
