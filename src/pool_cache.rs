// ABOUTME: Per-database cache of administrative connection pools
// ABOUTME: Lazily opens pools, probes liveness on reuse and replaces dead pools
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Administrative pool cache
//!
//! Each database name maps to a slot guarded by its own async mutex. The map itself
//! (a sharded `DashMap`) is only locked long enough to fetch or insert the slot handle;
//! the network work of probing or opening a pool happens under the per-key slot lock.
//! Concurrent callers for the same database therefore observe a single pool, while
//! callers for different databases never wait on each other.
//!
//! ```text
//! acquire(db)
//!   → slot = map[db] (created empty if missing, map lock released)
//!   → lock slot
//!     → Some(pool) and probe ok  → return pool
//!     → Some(pool) and probe bad → take pool, fall through
//!     → None                      → open pool, store, return
//!   → unlock slot, shut down the taken pool in a background task
//! ```

use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A connection pool the cache can probe and shut down
///
/// Clones must share the underlying connections, as `sqlx::PgPool` clones do.
#[async_trait]
pub trait ManagedPool: Clone + Send + Sync + 'static {
    /// Whether the pool can still reach its server
    ///
    /// A pool whose connections are all checked out is busy, not dead, and must
    /// report `true`.
    async fn probe(&self) -> bool;

    /// Close every connection; later use of any clone fails
    async fn shutdown(&self);

    /// Whether `shutdown` has been called
    fn is_shut_down(&self) -> bool;
}

/// Opens administrative pools for a database name
#[async_trait]
pub trait PoolConnector: Send + Sync + 'static {
    /// Pool type produced by this connector
    type Pool: ManagedPool;

    /// Open a ready pool targeting `database`
    async fn open(&self, database: &str) -> AppResult<Self::Pool>;
}

type Slot<P> = Arc<Mutex<Option<P>>>;

/// Thread-safe cache holding at most one live administrative pool per database
pub struct AdminPoolCache<C: PoolConnector> {
    connector: C,
    slots: DashMap<String, Slot<C::Pool>>,
    closed: AtomicBool,
}

impl<C: PoolConnector> AdminPoolCache<C> {
    /// Create an empty cache that opens pools with `connector`
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            slots: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// The connector used to open pools
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Return a live pool for `database`, opening or replacing it as needed
    ///
    /// # Errors
    ///
    /// Returns `InstanceClosed` after [`Self::close`], or the connector's error if a
    /// new pool cannot be opened; the slot is then left empty so a later call retries.
    pub async fn acquire(&self, database: &str) -> AppResult<C::Pool> {
        if self.is_closed() {
            return Err(AppError::instance_closed().with_database(database));
        }

        let slot = self.slot(database);
        let mut cached = slot.lock().await;

        if let Some(pool) = cached.as_ref() {
            if pool.probe().await {
                debug!(database, "Reusing cached administrative pool");
                return Ok(pool.clone());
            }
            warn!(database, "Cached administrative pool failed liveness probe, replacing it");
        }
        let stale = cached.take();

        let opened = self.connector.open(database).await;
        let pool = match opened {
            Ok(pool) if self.is_closed() => {
                drop(cached);
                retire(database, stale);
                pool.shutdown().await;
                return Err(AppError::instance_closed().with_database(database));
            }
            Ok(pool) => pool,
            Err(e) => {
                drop(cached);
                retire(database, stale);
                return Err(e);
            }
        };

        *cached = Some(pool.clone());
        drop(cached);
        retire(database, stale);
        info!(database, "Opened administrative pool");
        Ok(pool)
    }

    /// Shut down every cached pool and refuse further acquisitions
    ///
    /// Returns the number of pools shut down.
    pub async fn close(&self) -> usize {
        self.closed.store(true, Ordering::Release);

        let slots: Vec<(String, Slot<C::Pool>)> = self
            .slots
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        self.slots.clear();

        let mut shut_down = 0;
        for (database, slot) in slots {
            if let Some(pool) = slot.lock().await.take() {
                pool.shutdown().await;
                debug!(database = %database, "Closed administrative pool");
                shut_down += 1;
            }
        }
        shut_down
    }

    /// Whether [`Self::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether a pool is currently cached for `database`
    ///
    /// A slot that is mid-creation counts as cached.
    pub fn contains(&self, database: &str) -> bool {
        self.slots
            .get(database)
            .is_some_and(|slot| slot.try_lock().map_or(true, |pool| pool.is_some()))
    }

    /// Number of databases with a cached pool
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().try_lock().map_or(true, |pool| pool.is_some()))
            .count()
    }

    /// Whether no pool is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, database: &str) -> Slot<C::Pool> {
        if let Some(slot) = self.slots.get(database) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(database.to_owned()).or_default().value())
    }
}

/// Shut down a superseded pool off the caller's path
///
/// Clones handed out earlier may still hold connections, and closing waits for them,
/// so the shutdown runs as its own task instead of under the slot lock.
fn retire<P: ManagedPool>(database: &str, stale: Option<P>) {
    let Some(stale) = stale else {
        return;
    };
    let database = database.to_owned();
    tokio::spawn(async move {
        stale.shutdown().await;
        debug!(database = %database, "Closed superseded administrative pool");
    });
}
