// ABOUTME: Tests for environment-driven instance configuration
// ABOUTME: Serialized because they mutate process-wide PGFIXTURE_* variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used)]

use pgfixture::config::{Credentials, InstanceConfig, ServerCoordinates, SslMode};
use pgfixture::errors::ErrorCode;
use serial_test::serial;
use std::env;
use std::time::Duration;

const VARS: [&str; 9] = [
    "PGFIXTURE_HOST",
    "PGFIXTURE_PORT",
    "PGFIXTURE_SSLMODE",
    "PGFIXTURE_ADMIN_USER",
    "PGFIXTURE_ADMIN_PASSWORD",
    "PGFIXTURE_RESTRICTED_USER",
    "PGFIXTURE_RESTRICTED_PASSWORD",
    "PGFIXTURE_DEFAULT_DATABASE",
    "PGFIXTURE_PROVISION_TIMEOUT_SECS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_without_variables_uses_defaults() {
    clear_env();
    let config = InstanceConfig::from_env().unwrap();

    assert_eq!(config.coordinates, ServerCoordinates::default());
    assert_eq!(config.admin, Credentials::default_admin());
    assert_eq!(config.restricted, Credentials::default_restricted());
    assert_eq!(config.default_database, "postgres");
    assert!(config.provision_timeout.is_none());
}

#[test]
#[serial]
fn test_from_env_reads_every_variable() {
    clear_env();
    env::set_var("PGFIXTURE_HOST", "db.internal");
    env::set_var("PGFIXTURE_PORT", "55432");
    env::set_var("PGFIXTURE_SSLMODE", "require");
    env::set_var("PGFIXTURE_ADMIN_USER", "root");
    env::set_var("PGFIXTURE_ADMIN_PASSWORD", "s3cret");
    env::set_var("PGFIXTURE_RESTRICTED_USER", "fixture");
    env::set_var("PGFIXTURE_RESTRICTED_PASSWORD", "fixture-pw");
    env::set_var("PGFIXTURE_DEFAULT_DATABASE", "template_host");
    env::set_var("PGFIXTURE_PROVISION_TIMEOUT_SECS", "45");

    let config = InstanceConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.coordinates.host, "db.internal");
    assert_eq!(config.coordinates.port, 55432);
    assert_eq!(config.coordinates.ssl_mode, SslMode::Require);
    assert_eq!(config.admin, Credentials::new("root", "s3cret"));
    assert_eq!(config.restricted, Credentials::new("fixture", "fixture-pw"));
    assert_eq!(config.default_database, "template_host");
    assert_eq!(config.provision_timeout, Some(Duration::from_secs(45)));
}

#[test]
#[serial]
fn test_from_env_rejects_malformed_port() {
    clear_env();
    env::set_var("PGFIXTURE_PORT", "fifty");

    let error = InstanceConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(error.code, ErrorCode::ConfigInvalid);
    assert!(error.message.contains("PGFIXTURE_PORT"));
}

#[test]
#[serial]
fn test_from_env_rejects_unknown_sslmode() {
    clear_env();
    env::set_var("PGFIXTURE_SSLMODE", "sometimes");

    let error = InstanceConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(error.code, ErrorCode::ConfigInvalid);
}

#[test]
#[serial]
fn test_from_env_rejects_restricted_role_equal_to_admin() {
    clear_env();
    env::set_var("PGFIXTURE_RESTRICTED_USER", "postgres");

    let result = InstanceConfig::from_env();
    clear_env();

    assert_eq!(result.unwrap_err().code, ErrorCode::ConfigInvalid);
}

#[test]
fn test_connection_uri_encodes_reserved_characters() {
    let coordinates = ServerCoordinates::new("::1", 5432, SslMode::Prefer);
    let uri = coordinates.connection_uri(&Credentials::new("fix ture", "p@ss/word"), "orders test");

    assert_eq!(
        uri,
        "postgresql://fix%20ture:p%40ss%2Fword@[::1]:5432/orders%20test?sslmode=prefer"
    );
}

#[test]
fn test_credentials_debug_hides_password() {
    let rendered = format!("{:?}", Credentials::new("fixture", "hunter2"));
    assert!(rendered.contains("fixture"));
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn test_serialized_config_omits_passwords() {
    let config = InstanceConfig::default()
        .with_restricted(Credentials::new("fixture", "do-not-print"))
        .with_provision_timeout(Duration::from_secs(5));
    let json = serde_json::to_string(&config).unwrap();

    assert!(json.contains("fixture"));
    assert!(!json.contains("do-not-print"));
}

#[test]
fn test_serialized_config_reads_back_without_passwords() {
    let config = InstanceConfig::default()
        .with_restricted(Credentials::new("fixture", "do-not-print"))
        .with_default_database("template_host");
    let json = serde_json::to_string(&config).unwrap();

    let restored: InstanceConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.restricted.username, "fixture");
    assert!(restored.restricted.password.is_empty());
    assert_eq!(restored.default_database, "template_host");
    assert_eq!(restored.coordinates, config.coordinates);
}
