// ABOUTME: sqlx-backed pool connector and liveness probe for the shared PostgreSQL server
// ABOUTME: Builds connect options from coordinates and opens pools and one-off connections
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::config::{Credentials, PoolSettings, ServerCoordinates};
use crate::errors::{AppError, AppResult};
use crate::pool_cache::{ManagedPool, PoolConnector};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection, PgPool};
use std::str::FromStr;
use tracing::debug;

/// `application_name` reported to the server by every connection we open
const APPLICATION_NAME: &str = "pgfixture";

/// Build connect options for `credentials` on `database`
///
/// Options are parsed from the `postgresql://` URI so a malformed host or sslmode is
/// caught here; role, password and database are then set verbatim so no
/// percent-decoding ambiguity reaches the server.
///
/// # Errors
///
/// Returns a configuration error if the URI cannot be parsed
pub fn connect_options(
    coordinates: &ServerCoordinates,
    credentials: &Credentials,
    database: &str,
) -> AppResult<PgConnectOptions> {
    let uri = coordinates.connection_uri(credentials, database);
    let options = PgConnectOptions::from_str(&uri).map_err(|e| {
        AppError::config(format!(
            "invalid connection parameters for {}@{}:{}: {e}",
            credentials.username, coordinates.host, coordinates.port
        ))
        .with_database(database)
    })?;

    Ok(options
        .username(&credentials.username)
        .password(&credentials.password)
        .database(database)
        .application_name(APPLICATION_NAME))
}

/// Open a pool and establish its first connection
///
/// # Errors
///
/// Returns the driver error if the server cannot be reached or rejects the login
pub async fn open_pool(
    options: PgConnectOptions,
    settings: &PoolSettings,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .test_before_acquire(true)
        .connect_with(options)
        .await
}

/// Open a single unpooled connection
///
/// # Errors
///
/// Returns the driver error if the server cannot be reached or rejects the login
pub async fn open_connection(options: &PgConnectOptions) -> Result<PgConnection, sqlx::Error> {
    PgConnection::connect_with(options).await
}

/// Opens administrative pools on the shared server
#[derive(Debug, Clone)]
pub struct PgConnector {
    coordinates: ServerCoordinates,
    credentials: Credentials,
    settings: PoolSettings,
}

impl PgConnector {
    /// Connector authenticating with `credentials`
    #[must_use]
    pub const fn new(
        coordinates: ServerCoordinates,
        credentials: Credentials,
        settings: PoolSettings,
    ) -> Self {
        Self {
            coordinates,
            credentials,
            settings,
        }
    }

    /// Connect options for this connector's role on `database`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URI cannot be parsed
    pub fn options_for(&self, database: &str) -> AppResult<PgConnectOptions> {
        connect_options(&self.coordinates, &self.credentials, database)
    }
}

#[async_trait]
impl PoolConnector for PgConnector {
    type Pool = PgPool;

    async fn open(&self, database: &str) -> AppResult<PgPool> {
        let options = self.options_for(database)?;
        debug!(
            host = %self.coordinates.host,
            port = self.coordinates.port,
            database,
            username = %self.credentials.username,
            ssl_mode = %self.coordinates.ssl_mode,
            "Opening administrative pool"
        );
        open_pool(options, &self.settings).await.map_err(|e| {
            AppError::connection(format!(
                "failed to open administrative pool for database \"{database}\": {e}"
            ))
            .with_database(database)
            .with_source(e)
        })
    }
}

#[async_trait]
impl ManagedPool for PgPool {
    /// One round trip on an idle connection when there is one
    ///
    /// With every connection checked out the pool is in use, which proves it reached
    /// the server; waiting for a connection here would stall on the caller's own
    /// work. Only an empty pool is tested through `acquire`, which connects (and,
    /// with `test_before_acquire`, pings) without a second ping from us. sqlx keeps
    /// retrying a refused connection until the acquire timeout, so a timeout on a pool
    /// that still holds no connections means the server is gone.
    async fn probe(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        if let Some(mut idle) = self.try_acquire() {
            return idle.ping().await.is_ok();
        }
        if self.size() > 0 {
            return true;
        }
        match self.acquire().await {
            Ok(_) => true,
            // Other callers took every connection while we waited
            Err(sqlx::Error::PoolTimedOut) if self.size() > 0 => true,
            Err(e) => {
                debug!(error = %e, "Administrative pool cannot reach the server");
                false
            }
        }
    }

    async fn shutdown(&self) {
        self.close().await;
    }

    fn is_shut_down(&self) -> bool {
        self.is_closed()
    }
}

/// Whether `error` is a server error with the given `SQLSTATE`
#[must_use]
pub fn has_sqlstate(error: &sqlx::Error, sqlstate: &str) -> bool {
    error
        .as_database_error()
        .and_then(|db_error| db_error.code())
        .is_some_and(|code| code == sqlstate)
}
