// ABOUTME: End-to-end provisioning tests against a real PostgreSQL server
// ABOUTME: Run with --features postgres-integration and PGFIXTURE_* pointing at a ready server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![cfg(feature = "postgres-integration")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{init_test_logging, server_instance, unique_name};
use pgfixture::config::PoolSettings;
use pgfixture::errors::{ErrorCode, ProvisionStep};
use pgfixture::{InstanceConfig, InstanceState, PgInstance};
use sqlx::types::Decimal;
use std::time::Duration;

#[tokio::test]
async fn test_restricted_role_can_use_its_schema() {
    let instance = server_instance().await.unwrap();
    let db = instance.provision(&unique_name("orders_test")).await.unwrap();

    assert_eq!(db.schema(), instance.config().restricted.username);

    sqlx::query("CREATE TABLE orders (id BIGINT PRIMARY KEY, total NUMERIC NOT NULL)")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO orders (id, total) VALUES (1, 9.99)")
        .execute(db.pool())
        .await
        .unwrap();

    let (schema, count): (String, i64) = sqlx::query_as(
        "SELECT table_schema::text, (SELECT count(*) FROM orders) \
         FROM information_schema.tables WHERE table_name = 'orders'",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(schema, db.schema());
    assert_eq!(count, 1);

    db.close().await;
    instance.close().await;
}

#[tokio::test]
async fn test_restricted_role_has_no_elevated_privileges() {
    let instance = server_instance().await.unwrap();
    let db = instance.provision(&unique_name("privileges")).await.unwrap();

    let error = sqlx::query("CREATE DATABASE should_not_exist")
        .execute(db.pool())
        .await
        .unwrap_err();
    let code = error
        .as_database_error()
        .and_then(|db_error| db_error.code())
        .map(|code| code.into_owned());
    assert_eq!(code.as_deref(), Some("42501"));

    let installed: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = 'btree_gist')",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert!(installed);

    instance.close().await;
}

#[tokio::test]
async fn test_long_names_provision_distinct_databases() {
    let instance = server_instance().await.unwrap();
    let requested = format!("{}{}", unique_name("suite"), "/very/long/test/case".repeat(5));

    let first = instance.provision(&requested).await.unwrap();
    let second = instance.provision(&requested).await.unwrap();

    assert_ne!(first.name(), second.name());
    assert!(first.name().len() <= 63);
    assert!(second.name().len() <= 63);

    let current: String = sqlx::query_scalar("SELECT current_database()::text")
        .fetch_one(second.pool())
        .await
        .unwrap();
    assert_eq!(current, second.name());

    instance.close().await;
}

#[tokio::test]
async fn test_duplicate_short_name_fails_at_create_database() {
    let instance = server_instance().await.unwrap();
    let requested = unique_name("dup");

    instance.provision(&requested).await.unwrap();
    let error = instance.provision(&requested).await.unwrap_err();

    assert_eq!(error.code, ErrorCode::ProvisioningFailed);
    assert_eq!(error.step(), Some(ProvisionStep::CreateDatabase));
    assert_eq!(error.database(), Some(requested.as_str()));

    instance.close().await;
}

#[tokio::test]
async fn test_close_keeps_provisioned_pools_usable() {
    let instance = server_instance().await.unwrap();
    let db = instance.provision(&unique_name("survivor")).await.unwrap();
    assert!(instance.cached_pool_count() >= 1);
    let admin = instance.admin_pool("postgres").await.unwrap();

    instance.close().await;
    instance.close().await;

    assert_eq!(instance.state(), InstanceState::Closed);
    assert_eq!(instance.cached_pool_count(), 0);
    assert!(db.instance().is_some_and(|handle| handle.state() == InstanceState::Closed));

    let error = instance.provision("after_close").await.unwrap_err();
    assert_eq!(error.code, ErrorCode::InstanceClosed);
    assert_eq!(
        instance.admin_pool("postgres").await.unwrap_err().code,
        ErrorCode::InstanceClosed
    );
    assert!(sqlx::query("SELECT 1").execute(&admin).await.is_err());

    let one: i32 = sqlx::query_scalar("SELECT 1")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(one, 1);
}

#[tokio::test]
async fn test_concurrent_provisioning_shares_one_admin_pool() {
    let instance = server_instance().await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let instance = instance.clone();
            tokio::spawn(async move { instance.provision(&unique_name(&format!("parallel_{i}"))).await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(instance.cached_pool_count(), 1);

    instance.close().await;
}

#[tokio::test]
async fn test_tiny_deadline_times_out() {
    let instance = server_instance().await.unwrap();

    let error = instance
        .provision_within(&unique_name("deadline"), Duration::from_nanos(1))
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::OperationTimeout);
    assert!(error.code.is_transient());

    instance.close().await;
}

#[tokio::test]
async fn test_connection_uri_reaches_the_database() {
    let instance = server_instance().await.unwrap();
    let db = instance.provision(&unique_name("by_uri")).await.unwrap();

    let pool = sqlx::PgPool::connect(db.connection_uri()).await.unwrap();
    let user: String = sqlx::query_scalar("SELECT current_user::text")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(user, instance.config().restricted.username);

    pool.close().await;
    instance.close().await;
}

#[tokio::test]
async fn test_numeric_columns_decode_as_decimal() {
    let instance = server_instance().await.unwrap();
    let db = instance.provision(&unique_name("ledger")).await.unwrap();

    sqlx::query("CREATE TABLE ledger (id BIGINT PRIMARY KEY, amount NUMERIC(12, 2) NOT NULL)")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO ledger (id, amount) VALUES ($1, $2)")
        .bind(1_i64)
        .bind(Decimal::new(1_999, 2))
        .execute(db.pool())
        .await
        .unwrap();

    let amount: Decimal = sqlx::query_scalar("SELECT amount FROM ledger WHERE id = 1")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(amount, Decimal::new(1_999, 2));

    instance.close().await;
}

#[tokio::test]
async fn test_instances_in_one_process_never_reuse_a_shortened_name() {
    let first = server_instance().await.unwrap();
    let second = server_instance().await.unwrap();
    let requested = format!("{}{}", unique_name("shared"), "/suite/case".repeat(8));

    let a = first.provision(&requested).await.unwrap();
    let b = second.provision(&requested).await.unwrap();
    assert_ne!(a.name(), b.name());

    first.close().await;
    second.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_busy_admin_pool_is_reused_not_replaced() {
    init_test_logging();
    let mut config = InstanceConfig::from_env().unwrap();
    config.admin_pool = PoolSettings {
        max_connections: 1,
        min_connections: 0,
        acquire_timeout: Duration::from_secs(1),
    };
    let instance = PgInstance::connect(config).await.unwrap();

    let first = instance.admin_pool("postgres").await.unwrap();
    let mut held = first.acquire().await.unwrap();

    let second = tokio::time::timeout(Duration::from_secs(10), instance.admin_pool("postgres"))
        .await
        .expect("acquiring a busy pool must not wait for its connections")
        .unwrap();
    assert!(!first.is_closed());
    assert!(!second.is_closed());

    let sleeper = {
        let second = second.clone();
        tokio::spawn(async move { sqlx::query("SELECT pg_sleep(0.2)").execute(&second).await })
    };
    let one: i32 = sqlx::query_scalar("SELECT 1")
        .fetch_one(&mut *held)
        .await
        .unwrap();
    assert_eq!(one, 1);
    drop(held);
    sleeper.await.unwrap().unwrap();

    instance.close().await;
}
