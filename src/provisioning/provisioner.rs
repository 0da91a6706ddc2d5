// ABOUTME: Orchestrates database creation: sanitize, create, extend, schema, connect
// ABOUTME: Also creates the restricted role once per instance; no step is rolled back on failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{sql, ProvisionedDatabase};
use crate::config::InstanceConfig;
use crate::errors::{AppError, AppResult, ProvisionStep};
use crate::instance::InstanceShared;
use crate::naming::NameSanitizer;
use crate::pool_cache::AdminPoolCache;
use crate::postgres::{self, has_sqlstate, PgConnector};
use pgfixture_core::constants::sqlstate;
use sqlx::{Connection, PgConnection, PgPool};
use std::sync::Weak;
use tracing::{debug, field, info, instrument, warn, Span};

/// Runs the database creation sequence for one instance
///
/// Steps, each aborting the sequence on failure:
///
/// 1. sanitize the requested name
/// 2. acquire the cached administrative pool for the maintenance database
/// 3. `CREATE DATABASE` owned by the restricted role
/// 4. open a one-off administrative connection to the new database
/// 5. install the pinned extension
/// 6. create the restricted role's schema
/// 7. open a pool on the new database as the restricted role
///
/// Objects created before a failing step are left in place.
pub struct DatabaseProvisioner<'a> {
    config: &'a InstanceConfig,
    sanitizer: &'a NameSanitizer,
    admin_pools: &'a AdminPoolCache<PgConnector>,
}

impl<'a> DatabaseProvisioner<'a> {
    /// Provisioner over an instance's configuration, sanitizer and pool cache
    #[must_use]
    pub const fn new(
        config: &'a InstanceConfig,
        sanitizer: &'a NameSanitizer,
        admin_pools: &'a AdminPoolCache<PgConnector>,
    ) -> Self {
        Self {
            config,
            sanitizer,
            admin_pools,
        }
    }

    /// Create the restricted role, or reset an existing one to the restricted attributes
    ///
    /// # Errors
    ///
    /// Returns a connection error if the maintenance database is unreachable, or a
    /// provisioning error for step `CreateRole`
    pub async fn ensure_restricted_role(&self) -> AppResult<()> {
        let maintenance = &self.config.default_database;
        let role = &self.config.restricted;
        let pool = self.admin_pools.acquire(maintenance).await?;
        let step_failed = |e: sqlx::Error| AppError::provisioning(ProvisionStep::CreateRole, maintenance, e);

        let exists: bool = sqlx::query_scalar(sql::ROLE_EXISTS)
            .bind(&role.username)
            .fetch_one(&pool)
            .await
            .map_err(step_failed)?;

        if exists {
            sqlx::query(&sql::alter_role(role))
                .persistent(false)
                .execute(&pool)
                .await
                .map_err(step_failed)?;
            debug!(role = %role.username, "Restricted role already exists, attributes reset");
            return Ok(());
        }

        match sqlx::query(&sql::create_role(role))
            .persistent(false)
            .execute(&pool)
            .await
        {
            Ok(_) => {
                info!(role = %role.username, "Created restricted role");
                Ok(())
            }
            Err(e) if has_sqlstate(&e, sqlstate::DUPLICATE_OBJECT) => {
                debug!(role = %role.username, "Restricted role created concurrently");
                Ok(())
            }
            Err(e) => Err(step_failed(e)),
        }
    }

    /// Create a database for `requested` and return a restricted-role handle to it
    ///
    /// # Errors
    ///
    /// Returns a connection error if the administrative pool cannot be obtained, or a
    /// provisioning error naming the failed step and the sanitized database name
    #[instrument(skip(self, instance), fields(database = field::Empty))]
    pub(crate) async fn provision(
        &self,
        requested: &str,
        instance: Weak<InstanceShared>,
    ) -> AppResult<ProvisionedDatabase> {
        let name = self.sanitizer.sanitize(requested);
        Span::current().record("database", name.as_str());
        if name != requested {
            debug!(requested, "Sanitized requested database name");
        }

        self.create_database(&name).await?;

        let mut admin = self.connect_admin(&name).await?;
        let prepared = self.prepare_database(&mut admin, &name).await;
        if let Err(e) = admin.close().await {
            warn!(error = %e, "Failed to close one-off administrative connection");
        }
        prepared.inspect_err(|e| log_left_behind(&name, e))?;

        let schema = self.config.restricted.username.clone();
        let pool = self.connect_restricted(&name).await?;
        let connection_uri = self
            .config
            .coordinates
            .connection_uri(&self.config.restricted, &name);

        info!(schema = %schema, "Provisioned database");
        Ok(ProvisionedDatabase::new(
            name,
            schema,
            pool,
            connection_uri,
            instance,
        ))
    }

    async fn create_database(&self, name: &str) -> AppResult<()> {
        let pool = self
            .admin_pools
            .acquire(&self.config.default_database)
            .await?;
        let statement =
            sql::create_database(name, &self.config.restricted.username, &self.config.locale);

        debug!("Creating database");
        sqlx::query(&statement)
            .persistent(false)
            .execute(&pool)
            .await
            .map_err(|e| {
                if has_sqlstate(&e, sqlstate::DUPLICATE_DATABASE) {
                    warn!("Database already exists; names that fit are not made unique");
                }
                AppError::provisioning(ProvisionStep::CreateDatabase, name, e)
            })?;
        Ok(())
    }

    async fn connect_admin(&self, name: &str) -> AppResult<PgConnection> {
        let options = self.admin_pools.connector().options_for(name)?;
        postgres::open_connection(&options).await.map_err(|e| {
            let error = AppError::provisioning(ProvisionStep::ConnectAdmin, name, e);
            log_left_behind(name, &error);
            error
        })
    }

    async fn prepare_database(&self, admin: &mut PgConnection, name: &str) -> AppResult<()> {
        debug!(extension = %self.config.extension.name, "Installing extension");
        sqlx::query(&sql::create_extension(&self.config.extension))
            .persistent(false)
            .execute(&mut *admin)
            .await
            .map_err(|e| AppError::provisioning(ProvisionStep::InstallExtension, name, e))?;

        let role = &self.config.restricted.username;
        debug!(schema = %role, "Creating schema");
        sqlx::query(&sql::create_schema(role, role))
            .persistent(false)
            .execute(&mut *admin)
            .await
            .map_err(|e| AppError::provisioning(ProvisionStep::CreateSchema, name, e))?;
        Ok(())
    }

    async fn connect_restricted(&self, name: &str) -> AppResult<PgPool> {
        let options =
            postgres::connect_options(&self.config.coordinates, &self.config.restricted, name)?;
        postgres::open_pool(options, &self.config.restricted_pool)
            .await
            .map_err(|e| {
                let error = AppError::provisioning(ProvisionStep::ConnectRestricted, name, e);
                log_left_behind(name, &error);
                error
            })
    }
}

/// Record that a failed sequence left the database (and possibly more) on the server
fn log_left_behind(name: &str, error: &AppError) {
    warn!(
        database = name,
        step = ?error.step(),
        "Provisioning aborted after the database was created; it is left in place"
    );
}
