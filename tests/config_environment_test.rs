// ABOUTME: Unit tests for environment-sourced configuration
// ABOUTME: Validates defaults, overrides, fail-fast parsing, and URL handling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chat_store::config::{
    BackendConfig, BackendKind, ConversationConfig, Environment, RateLimitConfig, ServerConfig,
};
use chat_store::errors::ErrorCode;
use serial_test::serial;
use std::env;
use std::time::Duration;

const MANAGED_VARS: &[&str] = &[
    "ENVIRONMENT",
    "REDIS_URL",
    "REDIS_POOL_SIZE",
    "REDIS_RETRY_MAX_ATTEMPTS",
    "RATE_LIMIT_WINDOW_SECS",
    "RATE_LIMIT_REQUESTS_PER_WINDOW",
    "RATE_LIMIT_CACHE_TTL_SECS",
    "RATE_LIMIT_CACHE_CAPACITY",
    "CONVERSATION_TTL_DAYS",
];

fn clear_env() {
    for var in MANAGED_VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_environment_parsing() {
    assert_eq!(
        Environment::from_str_or_default("production"),
        Environment::Production
    );
    assert_eq!(
        Environment::from_str_or_default("PROD"),
        Environment::Production
    );
    assert_eq!(
        Environment::from_str_or_default("test"),
        Environment::Testing
    );
    assert_eq!(
        Environment::from_str_or_default("invalid"),
        Environment::Development
    ); // Default fallback
    assert!(Environment::Production.is_production());
    assert_eq!(Environment::Testing.to_string(), "testing");
}

#[test]
fn test_backend_kind_from_url() {
    assert_eq!(
        BackendConfig::new("redis://localhost:6379").kind().unwrap(),
        BackendKind::Redis
    );
    assert_eq!(
        BackendConfig::new("rediss://cache.internal:6380/0").kind().unwrap(),
        BackendKind::Redis
    );
    assert_eq!(
        BackendConfig::new("memory://local").kind().unwrap(),
        BackendKind::Memory
    );

    let err = BackendConfig::new("   ").kind().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigMissing);

    let err = BackendConfig::new("postgres://localhost/db").kind().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
}

#[test]
fn test_redacted_url_hides_password() {
    let config = BackendConfig::new("redis://:hunter2@cache.internal:6379/0");
    let redacted = config.redacted_url();

    assert!(!redacted.contains("hunter2"));
    assert!(redacted.contains("***"));
    assert!(redacted.contains("cache.internal"));

    assert_eq!(
        BackendConfig::new("redis://localhost:6379").redacted_url(),
        "redis://localhost:6379"
    );
}

#[test]
fn test_defaults() {
    let rate_limit = RateLimitConfig::default();
    assert_eq!(rate_limit.window_secs, 60);
    assert_eq!(rate_limit.requests_per_window, 60);
    assert_eq!(rate_limit.window(), Duration::from_secs(60));

    let conversations = ConversationConfig::default();
    assert_eq!(conversations.ttl_days, 30);
    assert_eq!(conversations.ttl(), Duration::from_secs(2_592_000));

    let backend = BackendConfig::new("redis://localhost:6379");
    assert_eq!(backend.pool_size, 10);
    assert_eq!(backend.connection_timeout(), Duration::from_secs(10));
    assert_eq!(backend.response_timeout(), Duration::from_secs(5));
    assert_eq!(backend.retry_max_attempts, 3);
    assert!(backend.validate().is_ok());
}

#[test]
fn test_validation_rejects_zero_values() {
    let err = RateLimitConfig {
        requests_per_window: 0,
        ..RateLimitConfig::default()
    }
    .validate()
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);

    let err = RateLimitConfig {
        window_secs: 0,
        ..RateLimitConfig::default()
    }
    .validate()
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);

    let err = ConversationConfig { ttl_days: 0 }.validate().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);

    let err = BackendConfig {
        retry_max_attempts: 0,
        ..BackendConfig::new("redis://localhost:6379")
    }
    .validate()
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
}

#[test]
#[serial]
fn test_server_config_requires_redis_url() {
    clear_env();

    let err = ServerConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigMissing);
    assert!(err.message.contains("REDIS_URL"));
}

#[test]
#[serial]
fn test_server_config_from_env_with_overrides() {
    clear_env();
    env::set_var("ENVIRONMENT", "production");
    env::set_var("REDIS_URL", "redis://:secret@cache.internal:6379/0");
    env::set_var("REDIS_POOL_SIZE", "4");
    env::set_var("RATE_LIMIT_WINDOW_SECS", "30");
    env::set_var("RATE_LIMIT_REQUESTS_PER_WINDOW", "100");
    env::set_var("CONVERSATION_TTL_DAYS", "7");

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.environment, Environment::Production);
    assert_eq!(config.backend.pool_size, 4);
    assert_eq!(config.rate_limit.window_secs, 30);
    assert_eq!(config.rate_limit.requests_per_window, 100);
    assert_eq!(config.rate_limit.cache_ttl_secs, 5);
    assert_eq!(config.conversations.ttl_days, 7);

    let summary = config.summary();
    assert!(summary.contains("100 requests / 30s"));
    assert!(!summary.contains("secret"));

    clear_env();
}

#[test]
#[serial]
fn test_malformed_numeric_variable_fails_fast() {
    clear_env();
    env::set_var("REDIS_URL", "redis://localhost:6379");
    env::set_var("RATE_LIMIT_WINDOW_SECS", "sixty");

    let err = ServerConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    assert!(err.message.contains("RATE_LIMIT_WINDOW_SECS"));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_values_fail_validation() {
    clear_env();
    env::set_var("REDIS_URL", "redis://localhost:6379");
    env::set_var("REDIS_POOL_SIZE", "0");

    let err = ServerConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);

    clear_env();
}

#[test]
fn test_retention_upper_bound() {
    let longest = ConversationConfig { ttl_days: 36_500 };
    assert!(longest.validate().is_ok());
    assert_eq!(longest.ttl(), Duration::from_secs(36_500 * 86_400));

    let err = ConversationConfig { ttl_days: 36_501 }
        .validate()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    assert!(err.message.contains("at most"));
}

#[test]
fn test_oversized_retention_saturates() {
    let config = ConversationConfig { ttl_days: u64::MAX };

    assert_eq!(config.validate().unwrap_err().code, ErrorCode::ConfigInvalid);
    assert_eq!(config.ttl(), Duration::from_secs(u64::MAX));
}

#[test]
#[serial]
fn test_oversized_retention_from_env_is_rejected() {
    clear_env();
    env::set_var("REDIS_URL", "redis://localhost:6379");
    env::set_var("CONVERSATION_TTL_DAYS", "300000000000000");

    let err = ServerConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    assert!(err.message.contains("CONVERSATION_TTL_DAYS"));

    clear_env();
}
