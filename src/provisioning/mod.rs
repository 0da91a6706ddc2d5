// ABOUTME: Database provisioning module with the creation sequence and its result handle
// ABOUTME: Exposes ProvisionedDatabase, the caller-owned restricted-role pool and its metadata
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Database provisioning
//!
//! [`DatabaseProvisioner`] runs the creation sequence against the shared server and
//! returns a [`ProvisionedDatabase`]. The server-side database outlives the handle:
//! nothing here ever drops it.

/// The multi-step creation sequence
pub mod provisioner;
/// SQL statement builders
pub mod sql;

pub use provisioner::DatabaseProvisioner;

use crate::instance::{InstanceShared, PgInstance};
use sqlx::PgPool;
use std::fmt;
use std::sync::Weak;

/// A freshly created database, owned by the caller
///
/// Closing it closes only the restricted-role pool; the administrative pools it was
/// created through stay cached on the instance.
pub struct ProvisionedDatabase {
    name: String,
    schema: String,
    pool: PgPool,
    connection_uri: String,
    instance: Weak<InstanceShared>,
}

impl ProvisionedDatabase {
    pub(crate) fn new(
        name: String,
        schema: String,
        pool: PgPool,
        connection_uri: String,
        instance: Weak<InstanceShared>,
    ) -> Self {
        Self {
            name,
            schema,
            pool,
            connection_uri,
            instance,
        }
    }

    /// Sanitized database name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema created for the restricted role (equal to its role name)
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Pool authenticated as the restricted role
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `postgresql://` URI for the restricted role on this database, for external tools
    /// such as migration runners
    #[must_use]
    pub fn connection_uri(&self) -> &str {
        &self.connection_uri
    }

    /// The instance this database was provisioned on, if it is still alive
    #[must_use]
    pub fn instance(&self) -> Option<PgInstance> {
        self.instance.upgrade().map(PgInstance::from_shared)
    }

    /// Close the restricted-role pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}

impl fmt::Debug for ProvisionedDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionedDatabase")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("pool_closed", &self.pool.is_closed())
            .finish_non_exhaustive()
    }
}
