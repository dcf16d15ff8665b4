use super::{Advisor, FixAction, IssueCategory};
use crate::checks::fetch_health;

const CATEGORY: IssueCategory = IssueCategory::Performance;

const STABLE_UPTIME_SECS: f64 = 300.0;
const MEMORY_LIMIT_MB: u64 = 250;

impl Advisor<'_> {
    pub(super) async fn check_performance(&self, actions: &mut Vec<FixAction>) {
        let payload = match fetch_health(self.prober, &self.catalog.endpoints.health).await {
            Ok(reading) => reading.payload,
            Err(e) => {
                actions.push(FixAction::failed(
                    CATEGORY,
                    "Performance Monitoring",
                    e.to_string(),
                    "Enable performance monitoring endpoints",
                ));
                return;
            }
        };

        if payload.performance.is_none() {
            actions.push(FixAction::recommended(
                CATEGORY,
                "Performance Monitoring",
                "Expose runtime figures on the health endpoint",
                "No performance data",
                "Performance figures reported",
            ));
            return;
        }

        if let Some(uptime) = payload.uptime_secs() {
            if uptime > STABLE_UPTIME_SECS {
                actions.push(FixAction::applied(
                    CATEGORY,
                    "System Stability",
                    format!("System stable with {}s uptime", uptime.round()),
                ));
            } else {
                actions.push(FixAction::recommended(
                    CATEGORY,
                    "System Stability",
                    "Service restarted recently; watch for restart loops",
                    format!("{}s", uptime.round()),
                    ">300s",
                ));
            }
        }

        if let Some(mb) = payload.memory_mb() {
            if mb < MEMORY_LIMIT_MB {
                actions.push(FixAction::applied(
                    CATEGORY,
                    "Memory Management",
                    format!("Memory usage healthy at {}MB", mb),
                ));
            } else {
                actions.push(FixAction::recommended(
                    CATEGORY,
                    "High Memory Usage",
                    "Consider restarting the application to clear memory",
                    format!("{}MB", mb),
                    "<250MB",
                ));
            }
        }

        if let Some(expected) = &self.catalog.expected_runtime_version {
            match payload.runtime_version() {
                Some(version) if version == expected => actions.push(FixAction::applied(
                    CATEGORY,
                    "Runtime Version",
                    format!("Running {}", version),
                )),
                other => actions.push(FixAction::recommended(
                    CATEGORY,
                    "Runtime Version",
                    format!("Move the runtime to {}", expected),
                    other.unwrap_or("unknown"),
                    expected,
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::FixStatus;
    use crate::catalog::Catalog;
    use crate::probe::{Prober, RunBudget};
    use crate::testing::{serve, FakePlatform};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_degraded_runtime() {
        let base = serve(
            FakePlatform {
                uptime_secs: 42.0,
                heap_mb: 300,
                runtime_version: "v18.0.0".to_string(),
                ..Default::default()
            }
            .router(),
        )
        .await;
        let prober = Prober::direct(&base, RunBudget::unbounded()).unwrap();
        let catalog = Catalog::default();
        let env = HashMap::<String, String>::new();

        let report = Advisor::new(&prober, &catalog, &env).advise("performance").await.unwrap();
        assert_eq!(report.recommended, 3);
        assert_eq!(report.applied, 0);

        let version = report.actions.iter().find(|a| a.issue == "Runtime Version").unwrap();
        assert_eq!(version.current.as_deref(), Some("v18.0.0"));
        assert_eq!(version.target.as_deref(), Some("v20.18.1"));
        assert!(report.actions.iter().all(|a| a.status == FixStatus::Recommended));
    }

    #[tokio::test]
    async fn test_version_check_skipped_without_expectation() {
        let base = serve(FakePlatform::default().router()).await;
        let prober = Prober::direct(&base, RunBudget::unbounded()).unwrap();
        let catalog = Catalog {
            expected_runtime_version: None,
            ..Catalog::default()
        };
        let env = HashMap::<String, String>::new();

        let report = Advisor::new(&prober, &catalog, &env).advise("performance").await.unwrap();
        assert_eq!(report.applied, 2);
        assert!(report.actions.iter().all(|a| a.issue != "Runtime Version"));
    }
}
