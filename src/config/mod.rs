// ABOUTME: Configuration module for the shared-server instance and its provisioning defaults
// ABOUTME: Loads coordinates, credentials and pool sizing from code or PGFIXTURE_* variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! - **Database**: server coordinates, credentials, sslmode, pool sizing, extension and locale
//! - **Instance**: [`InstanceConfig`], everything a [`crate::instance::PgInstance`] needs

/// Connection and pool configuration types
pub mod database;

pub use database::{
    Credentials, DatabaseLocale, ExtensionSpec, PoolSettings, ServerCoordinates, SslMode,
};

use crate::errors::{AppError, AppResult};
use pgfixture_core::constants::{defaults, identifiers::MAX_IDENTIFIER_LEN};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Everything needed to broker databases on one running server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Where the server listens
    pub coordinates: ServerCoordinates,
    /// Superuser-equivalent credentials used by administrative pools
    pub admin: Credentials,
    /// Role that owns and queries every provisioned database
    pub restricted: Credentials,
    /// Maintenance database the administrative pool connects to
    pub default_database: String,
    /// Extension installed into each new database
    pub extension: ExtensionSpec,
    /// Encoding and locale of each new database
    pub locale: DatabaseLocale,
    /// Sizing of cached administrative pools
    pub admin_pool: PoolSettings,
    /// Sizing of pools handed to callers
    pub restricted_pool: PoolSettings,
    /// Deadline applied to every `provision` call
    pub provision_timeout: Option<Duration>,
}

impl InstanceConfig {
    /// Configuration for a server at `coordinates` administered with `admin`
    ///
    /// Everything else takes its default: restricted role `unprivileged`, maintenance
    /// database `postgres`, extension `btree_gist` 1.5, no provisioning deadline.
    #[must_use]
    pub fn new(coordinates: ServerCoordinates, admin: Credentials) -> Self {
        Self {
            coordinates,
            admin,
            restricted: Credentials::default_restricted(),
            default_database: defaults::DEFAULT_DATABASE.to_owned(),
            extension: ExtensionSpec::default(),
            locale: DatabaseLocale::default(),
            admin_pool: PoolSettings::admin_defaults(),
            restricted_pool: PoolSettings::restricted_defaults(),
            provision_timeout: None,
        }
    }

    /// Load configuration from `PGFIXTURE_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a variable is present but malformed
    pub fn from_env() -> AppResult<Self> {
        let coordinates = ServerCoordinates::new(
            env_var_or("PGFIXTURE_HOST", defaults::HOST),
            env_parse("PGFIXTURE_PORT", defaults::PORT)?,
            env_parse("PGFIXTURE_SSLMODE", SslMode::Disable)?,
        );
        let admin = Credentials::new(
            env_var_or("PGFIXTURE_ADMIN_USER", defaults::ADMIN_USERNAME),
            env_var_or("PGFIXTURE_ADMIN_PASSWORD", defaults::ADMIN_PASSWORD),
        );
        let restricted = Credentials::new(
            env_var_or("PGFIXTURE_RESTRICTED_USER", defaults::RESTRICTED_USERNAME),
            env_var_or("PGFIXTURE_RESTRICTED_PASSWORD", defaults::RESTRICTED_PASSWORD),
        );
        let provision_timeout = match env::var("PGFIXTURE_PROVISION_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(parse_value(
                "PGFIXTURE_PROVISION_TIMEOUT_SECS",
                &raw,
            )?)),
            Err(_) => None,
        };

        let config = Self {
            restricted,
            default_database: env_var_or("PGFIXTURE_DEFAULT_DATABASE", defaults::DEFAULT_DATABASE),
            provision_timeout,
            ..Self::new(coordinates, admin)
        };
        config.validate()?;
        Ok(config)
    }

    /// Use a different restricted role
    #[must_use]
    pub fn with_restricted(mut self, restricted: Credentials) -> Self {
        self.restricted = restricted;
        self
    }

    /// Use a different maintenance database
    #[must_use]
    pub fn with_default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = database.into();
        self
    }

    /// Install a different extension (or version) into each database
    #[must_use]
    pub fn with_extension(mut self, extension: ExtensionSpec) -> Self {
        self.extension = extension;
        self
    }

    /// Use a different encoding and locale for each database
    #[must_use]
    pub fn with_locale(mut self, locale: DatabaseLocale) -> Self {
        self.locale = locale;
        self
    }

    /// Bound every `provision` call by `timeout`
    #[must_use]
    pub const fn with_provision_timeout(mut self, timeout: Duration) -> Self {
        self.provision_timeout = Some(timeout);
        self
    }

    /// Check the configuration can name a server and valid roles
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid field
    pub fn validate(&self) -> AppResult<()> {
        self.coordinates.validate()?;
        for (field, value) in [
            ("admin username", &self.admin.username),
            ("restricted username", &self.restricted.username),
            ("default database", &self.default_database),
        ] {
            if value.is_empty() {
                return Err(AppError::config(format!("{field} must not be empty")));
            }
            if value.len() > MAX_IDENTIFIER_LEN {
                return Err(AppError::config(format!(
                    "{field} '{value}' exceeds {MAX_IDENTIFIER_LEN} bytes"
                )));
            }
        }
        if self.admin.username == self.restricted.username {
            return Err(AppError::config(
                "restricted role must differ from the administrative role",
            ));
        }
        if self.admin_pool.max_connections == 0 || self.restricted_pool.max_connections == 0 {
            return Err(AppError::config("pool max_connections must be at least 1"));
        }
        Ok(())
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self::new(ServerCoordinates::default(), Credentials::default_admin())
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an environment variable, falling back only when it is absent
fn env_parse<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    env::var(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::config(format!("Invalid {key} value '{raw}': {e}")))
}
