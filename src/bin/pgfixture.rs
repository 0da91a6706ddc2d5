// ABOUTME: Command-line front end for provisioning fixture databases by hand
// ABOUTME: Provisions databases on the configured server or previews sanitized names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Usage:
//! ```bash
//! # Provision two databases; prints `name<TAB>connection uri` per database
//! PGFIXTURE_PORT=55432 cargo run --bin pgfixture -- provision orders_test "billing/refunds #2"
//!
//! # Show the names that would be used, without touching a server
//! cargo run --bin pgfixture -- sanitize "a/very/long/test/name/that/does/not/fit/in/sixty/three/bytes"
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use pgfixture::logging::LoggingConfig;
use pgfixture::naming::NameSanitizer;
use pgfixture::PgInstance;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "pgfixture",
    about = "Provision isolated PostgreSQL databases on a shared server",
    long_about = "Provision isolated PostgreSQL databases on a shared server. Server coordinates and credentials are read from PGFIXTURE_* environment variables."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create one database per name and print its restricted-role connection URI
    Provision {
        /// Requested database names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Print the engine-safe name for each requested name
    Sanitize {
        /// Requested database names
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging = logging.with_level("debug");
    }
    logging.init()?;

    match cli.command {
        Command::Provision { names } => provision_command(&names).await,
        Command::Sanitize { names } => {
            sanitize_command(&names);
            Ok(())
        }
    }
}

async fn provision_command(names: &[String]) -> Result<()> {
    let instance = PgInstance::from_env().await?;
    let mut failed = 0_usize;

    for requested in names {
        match instance.provision(requested).await {
            Ok(db) => {
                println!("{}\t{}", db.name(), db.connection_uri());
                db.close().await;
            }
            Err(e) => {
                error!(requested = %requested, error = %e, "Provisioning failed");
                failed += 1;
            }
        }
    }

    instance.close().await;
    if failed > 0 {
        bail!("{failed} of {} databases could not be provisioned", names.len());
    }
    info!(count = names.len(), "All databases provisioned");
    Ok(())
}

fn sanitize_command(names: &[String]) {
    let sanitizer = NameSanitizer::new();
    for requested in names {
        println!("{}", sanitizer.sanitize(requested));
    }
}
