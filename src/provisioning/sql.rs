// ABOUTME: SQL statement builders for database, extension, schema and role creation
// ABOUTME: Quotes every interpolated identifier and literal since DDL cannot take bind parameters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::config::{Credentials, DatabaseLocale, ExtensionSpec};
use pgfixture_core::constants::database::{CONNECTION_LIMIT, TABLESPACE};

/// Checks whether a role exists; `$1` is the role name
pub const ROLE_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = $1)";

/// Quote an identifier, doubling embedded `"`
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded `'`
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE DATABASE` owned by `owner` with fixed locale and unlimited connections
#[must_use]
pub fn create_database(name: &str, owner: &str, locale: &DatabaseLocale) -> String {
    format!(
        "CREATE DATABASE {name} WITH OWNER = {owner} ENCODING = {encoding} \
         LC_COLLATE = {collate} LC_CTYPE = {ctype} TABLESPACE = {TABLESPACE} \
         CONNECTION LIMIT = {CONNECTION_LIMIT}",
        name = quote_ident(name),
        owner = quote_ident(owner),
        encoding = quote_literal(&locale.encoding),
        collate = quote_literal(&locale.collate),
        ctype = quote_literal(&locale.ctype),
    )
}

/// `CREATE EXTENSION IF NOT EXISTS` at the pinned version
#[must_use]
pub fn create_extension(extension: &ExtensionSpec) -> String {
    format!(
        "CREATE EXTENSION IF NOT EXISTS {name} SCHEMA {schema} VERSION {version}",
        name = quote_ident(&extension.name),
        schema = quote_ident(&extension.schema),
        version = quote_literal(&extension.version),
    )
}

/// `CREATE SCHEMA IF NOT EXISTS` owned by the role it is named after
#[must_use]
pub fn create_schema(schema: &str, owner: &str) -> String {
    format!(
        "CREATE SCHEMA IF NOT EXISTS {} AUTHORIZATION {}",
        quote_ident(schema),
        quote_ident(owner)
    )
}

/// `CREATE ROLE ... LOGIN` with the restricted attribute set
#[must_use]
pub fn create_role(role: &Credentials) -> String {
    format!(
        "CREATE ROLE {} WITH LOGIN {}",
        quote_ident(&role.username),
        role_attributes(&role.password)
    )
}

/// `ALTER ROLE` resetting an existing role to the restricted attribute set
#[must_use]
pub fn alter_role(role: &Credentials) -> String {
    format!(
        "ALTER ROLE {} WITH LOGIN {}",
        quote_ident(&role.username),
        role_attributes(&role.password)
    )
}

fn role_attributes(password: &str) -> String {
    format!(
        "NOSUPERUSER NOCREATEDB NOCREATEROLE INHERIT NOREPLICATION CONNECTION LIMIT -1 PASSWORD {}",
        quote_literal(password)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting_doubles_delimiters() {
        assert_eq!(quote_ident("orders_test"), "\"orders_test\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_create_database_statement() {
        let sql = create_database("orders_test", "unprivileged", &DatabaseLocale::default());
        assert_eq!(
            sql,
            "CREATE DATABASE \"orders_test\" WITH OWNER = \"unprivileged\" ENCODING = 'UTF8' \
             LC_COLLATE = 'en_US.utf8' LC_CTYPE = 'en_US.utf8' TABLESPACE = pg_default \
             CONNECTION LIMIT = -1"
        );
    }

    #[test]
    fn test_create_extension_statement() {
        assert_eq!(
            create_extension(&ExtensionSpec::default()),
            "CREATE EXTENSION IF NOT EXISTS \"btree_gist\" SCHEMA \"public\" VERSION '1.5'"
        );
    }

    #[test]
    fn test_create_schema_statement() {
        assert_eq!(
            create_schema("unprivileged", "unprivileged"),
            "CREATE SCHEMA IF NOT EXISTS \"unprivileged\" AUTHORIZATION \"unprivileged\""
        );
    }

    #[test]
    fn test_role_statements_carry_restricted_attributes() {
        let role = Credentials::new("unprivileged", "pa'ss");
        let create = create_role(&role);
        assert!(create.starts_with("CREATE ROLE \"unprivileged\" WITH LOGIN NOSUPERUSER"));
        assert!(create.contains("NOCREATEDB NOCREATEROLE INHERIT NOREPLICATION"));
        assert!(create.ends_with("PASSWORD 'pa''ss'"));
        assert!(alter_role(&role).starts_with("ALTER ROLE \"unprivileged\" WITH LOGIN"));
    }
}
