// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Engine identifier limits, connection defaults and the pinned extension
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped by domain rather than kept in one flat namespace.

/// `PostgreSQL` identifier rules
pub mod identifiers {
    /// Longest identifier the engine stores without truncation (`NAMEDATALEN - 1`)
    pub const MAX_IDENTIFIER_LEN: usize = 63;
    /// Base width of the prefix kept when an over-length name is shortened
    pub const SHORTENED_PREFIX_WIDTH: usize = 29;
    /// Base width of the suffix kept when an over-length name is shortened
    pub const SHORTENED_SUFFIX_WIDTH: usize = 30;
    /// Separator placed around the collision counter in shortened names
    pub const SHORTENED_SEPARATOR: char = '-';
    /// Characters replaced with `_` during sanitization
    pub const REPLACED_CHARS: [char; 2] = ['/', '#'];
    /// Characters dropped during sanitization
    pub const REMOVED_CHARS: [char; 2] = ['(', ')'];
}

/// Connection coordinates used when nothing else is configured
pub mod defaults {
    /// Host the server collaborator publishes on
    pub const HOST: &str = "localhost";
    /// Standard `PostgreSQL` port
    pub const PORT: u16 = 5432;
    /// Superuser created by the stock server image
    pub const ADMIN_USERNAME: &str = "postgres";
    /// Password handed to the server image at startup
    pub const ADMIN_PASSWORD: &str = "password";
    /// Restricted role that owns every provisioned database
    pub const RESTRICTED_USERNAME: &str = "unprivileged";
    /// Password of the restricted role
    pub const RESTRICTED_PASSWORD: &str = "password";
    /// Maintenance database the administrative pool connects to
    pub const DEFAULT_DATABASE: &str = "postgres";
    /// URI scheme for connection strings
    pub const URI_SCHEME: &str = "postgresql";
}

/// Settings applied to every created database
pub mod database {
    /// Server-side encoding
    pub const ENCODING: &str = "UTF8";
    /// Collation locale
    pub const LC_COLLATE: &str = "en_US.utf8";
    /// Character classification locale
    pub const LC_CTYPE: &str = "en_US.utf8";
    /// Tablespace new databases are placed in
    pub const TABLESPACE: &str = "pg_default";
    /// Connection limit (`-1` means unlimited)
    pub const CONNECTION_LIMIT: i32 = -1;
}

/// Extension installed into every provisioned database
pub mod extension {
    /// Extension name
    pub const NAME: &str = "btree_gist";
    /// Pinned extension version
    pub const VERSION: &str = "1.5";
    /// Schema the extension objects live in
    pub const SCHEMA: &str = "public";
}

/// Connection pool sizing
pub mod pool {
    /// Maximum connections held by an administrative pool
    pub const ADMIN_MAX_CONNECTIONS: u32 = 4;
    /// Connections kept open by an administrative pool
    pub const ADMIN_MIN_CONNECTIONS: u32 = 0;
    /// Maximum connections in a pool returned to callers
    pub const RESTRICTED_MAX_CONNECTIONS: u32 = 5;
    /// Connections kept open in a pool returned to callers
    pub const RESTRICTED_MIN_CONNECTIONS: u32 = 0;
    /// Seconds to wait for a pooled connection
    pub const ACQUIRE_TIMEOUT_SECS: u64 = 30;
}

/// `SQLSTATE` codes the broker reacts to
pub mod sqlstate {
    /// `duplicate_object`, raised by a concurrent `CREATE ROLE`
    pub const DUPLICATE_OBJECT: &str = "42710";
    /// `duplicate_database`, raised when the sanitized name already exists
    pub const DUPLICATE_DATABASE: &str = "42P04";
}
