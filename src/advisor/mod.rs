//! Read-only remediation advisor.
//!
//! For each issue category the advisor runs a handful of diagnostic sub-probes
//! against the target service and classifies what it finds as `applied` (already
//! in a good state), `failed` or `recommended`. It never changes anything: every
//! request it issues is a read, an analysis request that computes without
//! storing, or an `OPTIONS` availability probe.

mod api;
mod database;
mod foreclosure;
mod performance;

use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;

use crate::catalog::{Catalog, ConfigError, HttpTarget};
use crate::checks::EnvSource;
use crate::probe::{HttpResponse, ProbeError, Prober};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueCategory {
    DatabaseIssues,
    ApiConnections,
    Performance,
    ForeclosureSystem,
}

impl IssueCategory {
    /// Order used when every category is selected.
    pub const ALL: [IssueCategory; 4] = [
        IssueCategory::DatabaseIssues,
        IssueCategory::ApiConnections,
        IssueCategory::Performance,
        IssueCategory::ForeclosureSystem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::DatabaseIssues => "databaseIssues",
            IssueCategory::ApiConnections => "apiConnections",
            IssueCategory::Performance => "performance",
            IssueCategory::ForeclosureSystem => "foreclosureSystem",
        }
    }

    /// Resolve `all` or a single category name.
    pub fn select(name: &str) -> Result<Vec<IssueCategory>, ConfigError> {
        if name == "all" {
            return Ok(Self::ALL.to_vec());
        }
        Ok(vec![name.parse()?])
    }
}

impl FromStr for IssueCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownCategory(s.to_string()))
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Applied,
    Failed,
    Recommended,
}

/// One advisory finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixAction {
    pub category: IssueCategory,
    pub issue: String,
    pub status: FixStatus,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl FixAction {
    pub fn applied(category: IssueCategory, issue: &str, detail: impl Into<String>) -> Self {
        Self {
            category,
            issue: issue.to_string(),
            status: FixStatus::Applied,
            detail: detail.into(),
            recommendation: None,
            current: None,
            target: None,
        }
    }

    pub fn failed(
        category: IssueCategory,
        issue: &str,
        detail: impl Into<String>,
        recommendation: &str,
    ) -> Self {
        Self {
            status: FixStatus::Failed,
            recommendation: Some(recommendation.to_string()),
            ..Self::applied(category, issue, detail)
        }
    }

    pub fn recommended(
        category: IssueCategory,
        issue: &str,
        suggestion: impl Into<String>,
        current: impl Into<String>,
        target: &str,
    ) -> Self {
        Self {
            status: FixStatus::Recommended,
            current: Some(current.into()),
            target: Some(target.to_string()),
            ..Self::applied(category, issue, suggestion)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryReport {
    pub categories: Vec<IssueCategory>,
    pub actions: Vec<FixAction>,
    pub applied: usize,
    pub failed: usize,
    pub recommended: usize,
    pub healthy: bool,
}

impl AdvisoryReport {
    fn new(categories: Vec<IssueCategory>, actions: Vec<FixAction>) -> Self {
        let count = |status: FixStatus| actions.iter().filter(|a| a.status == status).count();
        let applied = count(FixStatus::Applied);
        let failed = count(FixStatus::Failed);
        let recommended = count(FixStatus::Recommended);
        Self {
            categories,
            applied,
            failed,
            recommended,
            healthy: applied > failed,
            actions,
        }
    }

    pub fn with_status(&self, status: FixStatus) -> impl Iterator<Item = &FixAction> {
        self.actions.iter().filter(move |a| a.status == status)
    }
}

/// Runs read-only diagnostic sub-probes and reports what a fix would need.
pub struct Advisor<'a> {
    prober: &'a Prober,
    catalog: &'a Catalog,
    env: &'a dyn EnvSource,
}

impl<'a> Advisor<'a> {
    pub fn new(prober: &'a Prober, catalog: &'a Catalog, env: &'a dyn EnvSource) -> Self {
        Self { prober, catalog, env }
    }

    /// Advise on `all` or a single named category.
    pub async fn advise(&self, selection: &str) -> Result<AdvisoryReport, ConfigError> {
        let categories = IssueCategory::select(selection)?;
        Ok(self.run(categories).await)
    }

    pub async fn run(&self, categories: Vec<IssueCategory>) -> AdvisoryReport {
        let mut actions = Vec::new();
        for category in &categories {
            tracing::info!("Advisor: checking {}", category);
            let before = actions.len();
            match category {
                IssueCategory::DatabaseIssues => self.check_database(&mut actions).await,
                IssueCategory::ApiConnections => self.check_api_connections(&mut actions).await,
                IssueCategory::Performance => self.check_performance(&mut actions).await,
                IssueCategory::ForeclosureSystem => self.check_foreclosure_system(&mut actions).await,
            }
            for action in actions[before..].iter().filter(|a| a.status != FixStatus::Applied) {
                tracing::warn!("Advisor: {} {:?}: {}", action.issue, action.status, action.detail);
            }
        }

        let report = AdvisoryReport::new(categories, actions);
        tracing::info!(
            "Advisor: {} applied, {} failed, {} recommended",
            report.applied,
            report.failed,
            report.recommended
        );
        report
    }

    async fn fetch(&self, target: HttpTarget, timeout: Duration) -> Result<HttpResponse, ProbeError> {
        self.prober.fetch(&target, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::RunBudget;
    use crate::testing::{serve, FakePlatform};
    use std::collections::HashMap;

    fn configured_env() -> HashMap<String, String> {
        HashMap::from([
            ("DATABASE_URL".to_string(), "postgres://db.example.com/app".to_string()),
            ("ATTOM_API_KEY".to_string(), "a1b2c3d4e5f6a7b8c9d0".to_string()),
        ])
    }

    #[test]
    fn test_category_selection() {
        assert_eq!(IssueCategory::select("all").unwrap(), IssueCategory::ALL.to_vec());
        assert_eq!(
            IssueCategory::select("performance").unwrap(),
            vec![IssueCategory::Performance]
        );
        assert!(matches!(
            IssueCategory::select("networking"),
            Err(ConfigError::UnknownCategory(ref name)) if name == "networking"
        ));
    }

    #[test]
    fn test_report_counts() {
        let category = IssueCategory::Performance;
        let report = AdvisoryReport::new(
            vec![category],
            vec![
                FixAction::applied(category, "a", "ok"),
                FixAction::failed(category, "b", "down", "restart"),
                FixAction::failed(category, "c", "down", "restart"),
                FixAction::recommended(category, "d", "tune", "300MB", "<250MB"),
            ],
        );
        assert_eq!((report.applied, report.failed, report.recommended), (1, 2, 1));
        assert!(!report.healthy);
    }

    #[tokio::test]
    async fn test_healthy_service() {
        let base = serve(FakePlatform::default().router()).await;
        let prober = Prober::direct(&base, RunBudget::unbounded()).unwrap();
        let catalog = Catalog::default();
        let env = configured_env();

        let report = Advisor::new(&prober, &catalog, &env).advise("all").await.unwrap();
        assert_eq!(report.categories, IssueCategory::ALL.to_vec());
        assert_eq!(report.failed, 0, "{:#?}", report.actions);
        assert_eq!(report.recommended, 0, "{:#?}", report.actions);
        assert!(report.healthy);
        // Every category contributes findings
        for category in IssueCategory::ALL {
            assert!(report.actions.iter().any(|a| a.category == category), "{}", category);
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_each_category() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let prober = Prober::direct(&base, RunBudget::unbounded()).unwrap();
        let catalog = Catalog::default();
        let env = configured_env();

        let report = Advisor::new(&prober, &catalog, &env).advise("all").await.unwrap();
        for category in IssueCategory::ALL {
            assert!(
                report
                    .with_status(FixStatus::Failed)
                    .any(|a| a.category == category),
                "{} should report a failure",
                category
            );
        }
        assert!(!report.healthy);
    }

    #[tokio::test]
    async fn test_unknown_category_runs_nothing() {
        let prober = Prober::direct("http://127.0.0.1:9", RunBudget::unbounded()).unwrap();
        let catalog = Catalog::default();
        let env = HashMap::<String, String>::new();
        let err = Advisor::new(&prober, &catalog, &env).advise("cache").await.unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCategory(_)));
    }
}
