// ABOUTME: Backend health reporting built on a liveness ping and server introspection
// ABOUTME: Always returns a report; failures are described rather than raised
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check for the storage backend

use crate::backend::{BackendConnection, BackendInfo};
use crate::connection::ConnectionManager;
use crate::constants::service_names;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info};

/// Overall health status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Ping and introspection both succeeded
    Healthy,
    /// The backend could not be reached or queried
    Unhealthy,
}

/// Health report for the storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendHealth {
    /// Reporting service
    pub service: String,
    /// Backend status
    pub status: HealthStatus,
    /// Server version
    pub version: Option<String>,
    /// Connected client count
    pub connected_clients: Option<u64>,
    /// Human-readable memory usage
    pub used_memory: Option<String>,
    /// Server uptime in days
    pub uptime_days: Option<u64>,
    /// Failure description when unhealthy
    pub error: Option<String>,
    /// Time spent on the check in milliseconds
    pub response_time_ms: u64,
    /// When the check ran
    pub checked_at: DateTime<Utc>,
}

impl BackendHealth {
    fn healthy(info: BackendInfo, started: Instant) -> Self {
        Self {
            service: service_names::CHAT_STORE.to_owned(),
            status: HealthStatus::Healthy,
            version: info.version,
            connected_clients: info.connected_clients,
            used_memory: info.used_memory,
            uptime_days: info.uptime_days,
            error: None,
            response_time_ms: started.elapsed().as_millis() as u64,
            checked_at: Utc::now(),
        }
    }

    fn unhealthy(error: String, started: Instant) -> Self {
        Self {
            service: service_names::CHAT_STORE.to_owned(),
            status: HealthStatus::Unhealthy,
            version: None,
            connected_clients: None,
            used_memory: None,
            uptime_days: None,
            error: Some(error),
            response_time_ms: started.elapsed().as_millis() as u64,
            checked_at: Utc::now(),
        }
    }

    /// Whether the backend answered both the ping and the info query
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Ping the backend and collect server introspection
pub async fn check_backend(connections: &ConnectionManager) -> BackendHealth {
    let started = Instant::now();

    match connections
        .execute("health_check", |mut conn| async move { conn.info().await })
        .await
    {
        Ok(info) => {
            info!(
                version = info.version.as_deref().unwrap_or("unknown"),
                "Backend health check passed"
            );
            BackendHealth::healthy(info, started)
        }
        Err(e) => {
            error!(error = %e, "Backend health check failed");
            BackendHealth::unhealthy(e.to_string(), started)
        }
    }
}
