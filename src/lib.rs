// ABOUTME: Main library entry point for the pgfixture database-provisioning broker
// ABOUTME: Provisions isolated, uniquely named PostgreSQL databases on one shared server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # pgfixture
//!
//! Short-lived, isolated databases on a single shared `PostgreSQL` server, for use as
//! test fixtures. Starting the server, picking its image and running migrations are
//! someone else's job; this crate starts from the coordinates of a server that is
//! already accepting connections.
//!
//! ## Features
//!
//! - **Engine-safe names**: arbitrary test names become valid identifiers; over-length
//!   names are shortened around a counter that never repeats
//! - **Shared administrative pools**: one lazily opened, liveness-probed pool per
//!   database, safe under concurrent test execution
//! - **Restricted ownership**: every database is owned by an unprivileged role and
//!   comes with a pinned extension and a schema named after that role
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pgfixture::config::{Credentials, ServerCoordinates, SslMode};
//! use pgfixture::errors::AppResult;
//! use pgfixture::instance::PgInstance;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let coordinates = ServerCoordinates::new("localhost", 5432, SslMode::Disable);
//!     let instance = PgInstance::new(coordinates, Credentials::default_admin()).await?;
//!
//!     let db = instance.provision("orders/create (happy path)").await?;
//!     sqlx::query("CREATE TABLE orders (id BIGINT PRIMARY KEY)")
//!         .execute(db.pool())
//!         .await?;
//!
//!     instance.close().await;
//!     Ok(())
//! }
//! ```

/// Instance configuration: coordinates, credentials, pool sizing
pub mod config;

/// Unified error handling re-exported from `pgfixture-core`
pub mod errors;

/// Handle to the shared server
pub mod instance;

/// Logging configuration and subscriber setup
pub mod logging;

/// Database name sanitization
pub mod naming;

/// Per-database cache of administrative pools
pub mod pool_cache;

/// sqlx-backed connector and liveness probe
pub mod postgres;

/// Database creation sequence and its result handle
pub mod provisioning;

pub use config::InstanceConfig;
pub use errors::{AppError, AppResult, ErrorCode};
pub use instance::{InstanceState, PgInstance};
pub use provisioning::ProvisionedDatabase;
