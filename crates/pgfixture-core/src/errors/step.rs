// ABOUTME: Named steps of the database creation sequence
// ABOUTME: Attached to provisioning errors so callers know which objects were left behind
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of instance initialization or database provisioning
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStep {
    /// Creating the restricted role during instance initialization
    CreateRole,
    /// `CREATE DATABASE` on the maintenance database
    CreateDatabase,
    /// Opening the one-off administrative connection to the new database
    ConnectAdmin,
    /// `CREATE EXTENSION` inside the new database
    InstallExtension,
    /// `CREATE SCHEMA` named after the restricted role
    CreateSchema,
    /// Opening the restricted-role pool handed to the caller
    ConnectRestricted,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::CreateRole => "create restricted role",
            Self::CreateDatabase => "create database",
            Self::ConnectAdmin => "connect as administrator",
            Self::InstallExtension => "install extension",
            Self::CreateSchema => "create schema",
            Self::ConnectRestricted => "connect as restricted role",
        };
        f.write_str(text)
    }
}
