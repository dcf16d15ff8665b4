//! Health endpoint payload and performance snapshot.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::HttpTarget;
use crate::probe::{AssertionFailure, HttpResponse, ProbeError, Prober};

pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of the target service's debug health endpoint. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthPayload {
    pub status: Option<String>,
    pub services: ServiceStates,
    pub performance: Option<PerformanceStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceStates {
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceStats {
    pub uptime: Option<f64>,
    pub memory_usage: Option<MemoryUsage>,
    #[serde(alias = "nodeVersion")]
    pub runtime_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemoryUsage {
    pub heap_used: Option<f64>,
}

/// Runtime figures reported by the target service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    pub uptime_secs: Option<u64>,
    pub memory_mb: Option<u64>,
    pub runtime_version: Option<String>,
    pub status: Option<String>,
}

impl HealthPayload {
    pub fn database(&self) -> Option<&str> {
        self.services.database.as_deref()
    }

    pub fn database_connected(&self) -> bool {
        self.database() == Some("connected")
    }

    /// Heap usage in whole megabytes.
    pub fn memory_mb(&self) -> Option<u64> {
        let heap = self.performance.as_ref()?.memory_usage.as_ref()?.heap_used?;
        Some((heap / 1024.0 / 1024.0).round().max(0.0) as u64)
    }

    pub fn uptime_secs(&self) -> Option<f64> {
        self.performance.as_ref()?.uptime
    }

    pub fn runtime_version(&self) -> Option<&str> {
        self.performance.as_ref()?.runtime_version.as_deref()
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        PerformanceSnapshot {
            uptime_secs: self.uptime_secs().map(|u| u.round().max(0.0) as u64),
            memory_mb: self.memory_mb(),
            runtime_version: self.runtime_version().map(str::to_string),
            status: self.status.clone(),
        }
    }
}

/// A fetched health payload, the status it came with and how long it took.
#[derive(Debug, Clone)]
pub struct HealthReading {
    pub payload: HealthPayload,
    pub status: u16,
    pub elapsed: Duration,
}

/// Fetch the health endpoint.
///
/// A degraded service often answers non-2xx with a full payload, so any JSON
/// object body is read whatever the status. Only transport errors and bodies
/// that are not JSON objects are errors.
pub async fn fetch_health(prober: &Prober, endpoint: &str) -> Result<HealthReading, ProbeError> {
    let response: HttpResponse = prober.fetch(&HttpTarget::get(endpoint), HEALTH_TIMEOUT).await?;
    if !response.body.is_object() {
        let failure = if response.is_success() {
            AssertionFailure::UnexpectedBody {
                actual: response.status,
            }
        } else {
            AssertionFailure::Unsuccessful {
                actual: response.status,
            }
        };
        return Err(failure.into());
    }
    if !response.is_success() {
        tracing::warn!("Health: endpoint answered {}, reading its payload anyway", response.status);
    }

    let payload = serde_json::from_value(response.body).unwrap_or_else(|e| {
        tracing::debug!("Health: unexpected payload shape: {}", e);
        HealthPayload::default()
    });
    Ok(HealthReading {
        payload,
        status: response.status,
        elapsed: response.elapsed,
    })
}
