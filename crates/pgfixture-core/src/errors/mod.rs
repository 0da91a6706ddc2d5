// ABOUTME: Unified error handling for the pgfixture workspace
// ABOUTME: Defines ErrorCode, ErrorContext, ProvisionStep and the AppError type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every fallible operation in the broker returns [`AppResult`]. Errors carry an
//! [`ErrorCode`] for classification plus an [`ErrorContext`] naming the database and
//! the provisioning step that failed, so callers can tell which step left state behind.

mod step;

pub use step::ProvisionStep;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the broker
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Malformed connection parameters or environment configuration
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid,
    /// Pool creation or liveness failure
    #[serde(rename = "CONNECTION_FAILED")]
    ConnectionFailed,
    /// A SQL step of the creation sequence failed
    #[serde(rename = "PROVISIONING_FAILED")]
    ProvisioningFailed,
    /// The instance handle was used after `close`
    #[serde(rename = "INSTANCE_CLOSED")]
    InstanceClosed,
    /// A caller-supplied deadline elapsed
    #[serde(rename = "OPERATION_TIMEOUT")]
    OperationTimeout,
}

impl ErrorCode {
    /// Short description of this class of error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::ConfigInvalid => "Configuration is invalid",
            Self::ConnectionFailed => "Could not connect to the database server",
            Self::ProvisioningFailed => "Database provisioning failed",
            Self::InstanceClosed => "Instance has been closed",
            Self::OperationTimeout => "Operation deadline elapsed",
        }
    }

    /// Whether retrying the same call could plausibly succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed | Self::OperationTimeout)
    }
}

/// Where an error happened
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Database the failing operation targeted
    pub database: Option<String>,
    /// Provisioning step that failed
    pub step: Option<ProvisionStep>,
}

/// Unified error type for the broker
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Database and step the error is attached to
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Attach the database name to the error context
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.context.database = Some(database.into());
        self
    }

    /// Attach the failing provisioning step to the error context
    #[must_use]
    pub fn with_step(mut self, step: ProvisionStep) -> Self {
        self.context.step = Some(step);
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Database recorded in the error context, if any
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.context.database.as_deref()
    }

    /// Provisioning step recorded in the error context, if any
    #[must_use]
    pub const fn step(&self) -> Option<ProvisionStep> {
        self.context.step
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)?;
        match (&self.context.step, &self.context.database) {
            (Some(step), Some(database)) => write!(f, " (step={step}, database={database})"),
            (Some(step), None) => write!(f, " (step={step})"),
            (None, Some(database)) => write!(f, " (database={database})"),
            (None, None) => Ok(()),
        }
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience functions for creating common errors
impl AppError {
    /// Malformed configuration
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// Pool creation or liveness failure
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConnectionFailed, message)
    }

    /// A SQL step of the creation sequence failed
    pub fn provisioning(
        step: ProvisionStep,
        database: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        let database = database.into();
        Self::new(
            ErrorCode::ProvisioningFailed,
            format!("failed to {step} for database \"{database}\": {source}"),
        )
        .with_database(database)
        .with_step(step)
        .with_source(source)
    }

    /// The instance handle was used after `close`
    #[must_use]
    pub fn instance_closed() -> Self {
        Self::new(
            ErrorCode::InstanceClosed,
            "provision called on an instance that has already been closed",
        )
    }

    /// A deadline elapsed before the operation finished
    pub fn timeout(operation: impl Into<String>, after: std::time::Duration) -> Self {
        Self::new(
            ErrorCode::OperationTimeout,
            format!("{} did not finish within {after:?}", operation.into()),
        )
    }
}

/// Conversion from `sqlx::Error`; driver failures outside a named step are connectivity failures
#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        let code = match &error {
            sqlx::Error::Configuration(_) => ErrorCode::ConfigInvalid,
            sqlx::Error::PoolTimedOut => ErrorCode::OperationTimeout,
            sqlx::Error::PoolClosed => ErrorCode::InstanceClosed,
            _ => ErrorCode::ConnectionFailed,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}
