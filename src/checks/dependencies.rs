//! Dependency health checks: third-party APIs, storage and catalog command checks.

use serde::Serialize;
use std::time::Duration;

use super::{fetch_health, EnvSource};
use crate::catalog::{Catalog, CommandDependency, ExternalApiSpec, HttpTarget};
use crate::probe::{capture_output, Prober};

const EXTERNAL_API_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCategory {
    Api,
    Database,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    /// Reachable and reporting the expected state.
    Healthy,
    /// Reachable but reporting something else.
    Unhealthy,
    /// Could not be reached at all.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyRecord {
    pub name: String,
    pub category: DependencyCategory,
    pub status: DependencyStatus,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_configured: Option<bool>,
}

impl DependencyRecord {
    pub fn is_healthy(&self) -> bool {
        self.status == DependencyStatus::Healthy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyReport {
    pub records: Vec<DependencyRecord>,
    pub healthy: usize,
    pub total: usize,
}

impl DependencyReport {
    fn new(records: Vec<DependencyRecord>) -> Self {
        let healthy = records.iter().filter(|r| r.is_healthy()).count();
        Self {
            total: records.len(),
            healthy,
            records,
        }
    }

    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }
}

async fn check_external_api(prober: &Prober, api: &ExternalApiSpec, env: &dyn EnvSource) -> DependencyRecord {
    let credential = env.var(&api.credential_var);
    let mut target = HttpTarget::get(&api.url);
    for (name, value) in &api.headers {
        target = target.header(name, value);
    }
    if let Some(key) = &credential {
        target = target.header(&api.credential_header, key);
    }

    let (status, detail, status_code) = match prober.fetch(&target, EXTERNAL_API_TIMEOUT).await {
        Ok(response) if response.is_success() => (
            DependencyStatus::Healthy,
            format!("operational in {}ms", response.elapsed.as_millis()),
            Some(response.status),
        ),
        Ok(response) => (
            DependencyStatus::Unhealthy,
            format!("HTTP {}", response.status),
            Some(response.status),
        ),
        Err(e) => (DependencyStatus::Failed, e.to_string(), None),
    };

    DependencyRecord {
        name: api.name.clone(),
        category: DependencyCategory::Api,
        status,
        detail,
        status_code,
        credential_configured: Some(credential.is_some()),
    }
}

async fn check_storage(prober: &Prober, catalog: &Catalog, env: &dyn EnvSource) -> DependencyRecord {
    let (status, detail) = match fetch_health(prober, &catalog.endpoints.health).await {
        Ok(reading) if reading.payload.database_connected() => {
            (DependencyStatus::Healthy, "connected".to_string())
        }
        Ok(reading) => (
            DependencyStatus::Unhealthy,
            reading
                .payload
                .database()
                .map_or_else(|| format!("no storage state reported (HTTP {})", reading.status), str::to_string),
        ),
        Err(e) => (DependencyStatus::Failed, e.to_string()),
    };

    DependencyRecord {
        name: "Database".to_string(),
        category: DependencyCategory::Database,
        status,
        detail,
        status_code: None,
        credential_configured: Some(env.is_set(&catalog.environment.security.connection_string)),
    }
}

async fn check_command(prober: &Prober, dep: &CommandDependency) -> DependencyRecord {
    let result = prober.budget().guard(capture_output(&dep.command, dep.timeout)).await;
    let (status, detail) = match result {
        Ok(output) if output.trimmed() == dep.expected_status => {
            (DependencyStatus::Healthy, output.trimmed().to_string())
        }
        Ok(output) => (
            DependencyStatus::Unhealthy,
            format!("reported '{}', expected '{}'", output.trimmed(), dep.expected_status),
        ),
        Err(e) => (DependencyStatus::Failed, e.to_string()),
    };

    DependencyRecord {
        name: dep.name.clone(),
        category: DependencyCategory::Command,
        status,
        detail,
        status_code: None,
        credential_configured: None,
    }
}

/// Run the dependency battery. Every check is evaluated regardless of earlier failures.
pub async fn check_dependencies(prober: &Prober, catalog: &Catalog, env: &dyn EnvSource) -> DependencyReport {
    tracing::info!("Dependencies: checking {} external APIs", catalog.external_apis.len());
    let mut records = Vec::new();

    for api in &catalog.external_apis {
        records.push(check_external_api(prober, api, env).await);
    }
    records.push(check_storage(prober, catalog, env).await);
    for dep in &catalog.command_dependencies {
        records.push(check_command(prober, dep).await);
    }

    for record in records.iter().filter(|r| !r.is_healthy()) {
        tracing::warn!("Dependencies: {} is {:?}: {}", record.name, record.status, record.detail);
    }

    let report = DependencyReport::new(records);
    tracing::info!("Dependencies: {}/{} healthy", report.healthy, report.total);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::RunBudget;
    use crate::testing::{serve, FakePlatform};
    use std::collections::HashMap;

    fn external(name: &str, url: String) -> ExternalApiSpec {
        ExternalApiSpec {
            name: name.to_string(),
            url,
            credential_var: "PRIMARY_KEY".to_string(),
            credential_header: "x-api-key".to_string(),
            headers: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_classifies_every_dependency() {
        let base = serve(FakePlatform::default().router()).await;
        let prober = Prober::direct(&base, RunBudget::unbounded()).unwrap();

        let mut catalog = Catalog::default();
        catalog.external_apis = vec![
            external("Keyed API", format!("{}/external/keyed", base)),
            external("Broken API", format!("{}/external/broken", base)),
            external("Offline API", "http://127.0.0.1:9/unreachable".to_string()),
        ];
        catalog.command_dependencies = vec![
            CommandDependency {
                name: "cache".to_string(),
                command: "echo PONG".to_string(),
                expected_status: "PONG".to_string(),
                timeout: Duration::from_secs(2),
            },
            CommandDependency {
                name: "queue".to_string(),
                command: "echo degraded".to_string(),
                expected_status: "ok".to_string(),
                timeout: Duration::from_secs(2),
            },
        ];
        let env = HashMap::from([("PRIMARY_KEY".to_string(), "k-123".to_string())]);

        let report = check_dependencies(&prober, &catalog, &env).await;
        let statuses: Vec<_> = report.records.iter().map(|r| (r.name.as_str(), r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("Keyed API", DependencyStatus::Healthy),
                ("Broken API", DependencyStatus::Unhealthy),
                ("Offline API", DependencyStatus::Failed),
                ("Database", DependencyStatus::Healthy),
                ("cache", DependencyStatus::Healthy),
                ("queue", DependencyStatus::Unhealthy),
            ]
        );
        assert_eq!(report.records[0].credential_configured, Some(true));
        assert_eq!(report.records[1].status_code, Some(503));
        assert_eq!(report.records[3].credential_configured, Some(false));
        assert_eq!((report.healthy, report.total), (3, 6));
        assert!(!report.all_healthy());
    }

    #[tokio::test]
    async fn test_missing_credential_is_unhealthy() {
        let base = serve(FakePlatform::default().router()).await;
        let prober = Prober::direct(&base, RunBudget::unbounded()).unwrap();

        let mut catalog = Catalog::default();
        catalog.external_apis = vec![external("Keyed API", format!("{}/external/keyed", base))];

        let report = check_dependencies(&prober, &catalog, &HashMap::<String, String>::new()).await;
        let api = &report.records[0];
        assert_eq!(api.status, DependencyStatus::Unhealthy);
        assert_eq!(api.status_code, Some(401));
        assert_eq!(api.credential_configured, Some(false));
    }

    #[tokio::test]
    async fn test_disconnected_storage() {
        let base = serve(
            FakePlatform {
                database: "disconnected".to_string(),
                ..Default::default()
            }
            .router(),
        )
        .await;
        let prober = Prober::direct(&base, RunBudget::unbounded()).unwrap();

        let mut catalog = Catalog::default();
        catalog.external_apis.clear();

        let report = check_dependencies(&prober, &catalog, &HashMap::<String, String>::new()).await;
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].status, DependencyStatus::Unhealthy);
        assert_eq!(report.records[0].detail, "disconnected");
    }

    #[tokio::test]
    async fn test_degraded_health_reports_storage_state() {
        let base = serve(
            FakePlatform {
                health_status: 503,
                database: "disconnected".to_string(),
                ..Default::default()
            }
            .router(),
        )
        .await;
        let prober = Prober::direct(&base, RunBudget::unbounded()).unwrap();

        let mut catalog = Catalog::default();
        catalog.external_apis.clear();

        let report = check_dependencies(&prober, &catalog, &HashMap::<String, String>::new()).await;
        assert_eq!(report.records[0].status, DependencyStatus::Unhealthy);
        assert_eq!(report.records[0].detail, "disconnected");
    }
}
