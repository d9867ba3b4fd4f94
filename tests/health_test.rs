// ABOUTME: Tests for backend health reporting
// ABOUTME: Covers healthy introspection, outage reporting, and the serialized report shape
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use chat_store::health::{check_backend, HealthStatus};
use common::memory_backend;

#[tokio::test]
async fn test_healthy_backend_reports_introspection() -> Result<()> {
    let backend = memory_backend().await?;
    backend.store().start_conversation("Hello").await?;

    let health = check_backend(&backend.connections).await;

    assert!(health.is_healthy());
    assert_eq!(health.service, "chat-store");
    assert!(health.version.as_deref().unwrap().starts_with("memory-"));
    assert_eq!(health.connected_clients, Some(1));
    assert!(health.used_memory.is_some());
    assert_eq!(health.uptime_days, Some(0));
    assert!(health.error.is_none());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_backend_reports_unhealthy() -> Result<()> {
    let backend = memory_backend().await?;
    backend.pool.set_reachable(false);

    let health = check_backend(&backend.connections).await;

    assert_eq!(health.status, HealthStatus::Unhealthy);
    assert!(!health.is_healthy());
    assert!(health.version.is_none());
    assert!(health.error.as_deref().unwrap().contains("unreachable"));
    Ok(())
}

#[tokio::test]
async fn test_health_report_serializes_lowercase_status() -> Result<()> {
    let backend = memory_backend().await?;

    let report = serde_json::to_value(check_backend(&backend.connections).await)?;

    assert_eq!(report["status"], "healthy");
    assert_eq!(report["service"], "chat-store");
    assert!(report["checked_at"].is_string());
    assert!(report["response_time_ms"].is_u64());
    Ok(())
}
