// ABOUTME: Long-lived handle to the shared PostgreSQL server used for test fixtures
// ABOUTME: Owns the administrative pool cache and role setup, provisions and closes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Instance handle
//!
//! One [`PgInstance`] exists per running server. It is created once the server
//! accepts connections, provisions any number of databases, and is closed once.
//!
//! ```text
//! Starting ──(server reachable, restricted role ensured)──▶ Ready ──(close)──▶ Closed
//! ```
//!
//! `Closed` is terminal: `provision` fails immediately with `InstanceClosed`.

use crate::config::{Credentials, InstanceConfig, ServerCoordinates};
use crate::errors::{AppError, AppResult};
use crate::naming::NameSanitizer;
use crate::pool_cache::AdminPoolCache;
use crate::postgres::PgConnector;
use crate::provisioning::{DatabaseProvisioner, ProvisionedDatabase};
use serde_json::json;
use sqlx::PgPool;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, info};

/// Lifecycle state of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Connecting and creating the restricted role
    Starting,
    /// Accepting `provision` calls
    Ready,
    /// All administrative pools closed; terminal
    Closed,
}

impl InstanceState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Ready,
            _ => Self::Closed,
        }
    }

    const fn as_u8(self) -> u8 {
        match self {
            Self::Starting => 0,
            Self::Ready => 1,
            Self::Closed => 2,
        }
    }
}

/// State shared between an instance and the weak back-references held by
/// provisioned databases
pub(crate) struct InstanceShared {
    config: InstanceConfig,
    sanitizer: NameSanitizer,
    admin_pools: AdminPoolCache<PgConnector>,
    state: AtomicU8,
}

impl InstanceShared {
    fn state(&self) -> InstanceState {
        InstanceState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: InstanceState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    const fn provisioner(&self) -> DatabaseProvisioner<'_> {
        DatabaseProvisioner::new(&self.config, &self.sanitizer, &self.admin_pools)
    }
}

/// Handle to one shared server; cheap to clone
#[derive(Clone)]
pub struct PgInstance {
    shared: Arc<InstanceShared>,
}

impl PgInstance {
    /// Connect to a ready server at `coordinates` as `admin`, using defaults for
    /// everything else
    ///
    /// # Errors
    ///
    /// See [`Self::connect`]
    pub async fn new(coordinates: ServerCoordinates, admin: Credentials) -> AppResult<Self> {
        Self::connect(InstanceConfig::new(coordinates, admin)).await
    }

    /// Connect using `PGFIXTURE_*` environment configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed variables, or see [`Self::connect`]
    pub async fn from_env() -> AppResult<Self> {
        Self::connect(InstanceConfig::from_env()?).await
    }

    /// Validate `config`, confirm the server is reachable and ensure the restricted
    /// role exists
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings, a connection error if the
    /// maintenance database cannot be reached, or a provisioning error if the
    /// restricted role cannot be created
    pub async fn connect(config: InstanceConfig) -> AppResult<Self> {
        config.validate()?;
        info!(
            "Connecting to shared server: {}",
            json!({
                "host": config.coordinates.host,
                "port": config.coordinates.port,
                "sslmode": config.coordinates.ssl_mode.as_str(),
                "admin": config.admin.username,
                "restricted": config.restricted.username,
                "default_database": config.default_database,
            })
        );

        let connector = PgConnector::new(
            config.coordinates.clone(),
            config.admin.clone(),
            config.admin_pool,
        );
        let shared = Arc::new(InstanceShared {
            config,
            sanitizer: NameSanitizer::new(),
            admin_pools: AdminPoolCache::new(connector),
            state: AtomicU8::new(InstanceState::Starting.as_u8()),
        });

        if let Err(e) = shared.provisioner().ensure_restricted_role().await {
            shared.admin_pools.close().await;
            shared.set_state(InstanceState::Closed);
            return Err(e);
        }

        shared.set_state(InstanceState::Ready);
        info!(
            role = %shared.config.restricted.username,
            "Shared server ready for provisioning"
        );
        Ok(Self { shared })
    }

    pub(crate) const fn from_shared(shared: Arc<InstanceShared>) -> Self {
        Self { shared }
    }

    /// Create a fresh database for `name` and return a restricted-role handle to it
    ///
    /// Bounded by the configured `provision_timeout`, if any.
    ///
    /// # Errors
    ///
    /// Returns `InstanceClosed` after [`Self::close`], `OperationTimeout` if the
    /// configured deadline elapses, or the failing step's error. Objects created before
    /// the failure remain on the server.
    pub async fn provision(&self, name: &str) -> AppResult<ProvisionedDatabase> {
        match self.shared.config.provision_timeout {
            Some(timeout) => self.provision_within(name, timeout).await,
            None => self.provision_unbounded(name).await,
        }
    }

    /// Like [`Self::provision`] with an explicit deadline
    ///
    /// # Errors
    ///
    /// As [`Self::provision`]; on timeout the sequence is abandoned mid-way and
    /// anything already created stays on the server.
    pub async fn provision_within(
        &self,
        name: &str,
        timeout: Duration,
    ) -> AppResult<ProvisionedDatabase> {
        time::timeout(timeout, self.provision_unbounded(name))
            .await
            .map_err(|_| AppError::timeout(format!("provisioning database for '{name}'"), timeout))?
    }

    async fn provision_unbounded(&self, name: &str) -> AppResult<ProvisionedDatabase> {
        if self.state() != InstanceState::Ready {
            return Err(AppError::instance_closed());
        }
        self.shared
            .provisioner()
            .provision(name, Arc::downgrade(&self.shared))
            .await
    }

    /// The cached administrative pool for `database`, opened on first use
    ///
    /// # Errors
    ///
    /// Returns `InstanceClosed` after [`Self::close`] or a connection error
    pub async fn admin_pool(&self, database: &str) -> AppResult<PgPool> {
        self.shared.admin_pools.acquire(database).await
    }

    /// Close every cached administrative pool
    ///
    /// Pools handed out through [`ProvisionedDatabase`] are caller-owned and stay open.
    /// Calling `close` again is a no-op.
    pub async fn close(&self) {
        if self.state() == InstanceState::Closed {
            debug!("Instance already closed");
            return;
        }
        self.shared.set_state(InstanceState::Closed);
        let closed = self.shared.admin_pools.close().await;
        info!(pools = closed, "Closed shared server instance");
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> InstanceState {
        self.shared.state()
    }

    /// Configuration this instance was created with
    #[must_use]
    pub fn config(&self) -> &InstanceConfig {
        &self.shared.config
    }

    /// Name `requested` would be given, advancing the collision counter if it is shortened
    #[must_use]
    pub fn sanitize(&self, requested: &str) -> String {
        self.shared.sanitizer.sanitize(requested)
    }

    /// Number of databases with a cached administrative pool
    #[must_use]
    pub fn cached_pool_count(&self) -> usize {
        self.shared.admin_pools.len()
    }
}

impl fmt::Debug for PgInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgInstance")
            .field("host", &self.shared.config.coordinates.host)
            .field("port", &self.shared.config.coordinates.port)
            .field("state", &self.state())
            .field("cached_pools", &self.cached_pool_count())
            .finish()
    }
}
