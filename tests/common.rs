// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides quiet logging, unique fixture names and a server-backed instance helper
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `pgfixture`

use pgfixture::{AppResult, PgInstance};
use std::sync::Once;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// A requested name that no other test run will use
///
/// Short names are not made unique by the sanitizer, so tests that share a server
/// carry a random component.
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Instance for the server named by the `PGFIXTURE_*` variables
pub async fn server_instance() -> AppResult<PgInstance> {
    init_test_logging();
    PgInstance::from_env().await
}
