//! Feature suite runner and the full run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{Catalog, ConfigError, FeatureSuite};
use crate::checks::{check_dependencies, validate_environment, DependencyReport, EnvSource, EnvironmentReport};
use crate::probe::{Outcome, Prober};

/// A probe outcome together with the suggested fix for a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub description: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    pub feature: String,
    pub description: String,
    pub cases: Vec<CaseResult>,
    pub passed: usize,
    pub failed: usize,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

fn suggestion_for(suite: &FeatureSuite, outcome: &Outcome) -> Option<String> {
    let kind = outcome.error_kind?;
    suite
        .common_errors
        .get(kind.as_str())
        .cloned()
        .or_else(|| kind.remediation().map(str::to_string))
}

/// Run every probe of one feature in order.
pub async fn run_suite(prober: &Prober, suite: &FeatureSuite) -> SuiteReport {
    tracing::info!("Suite {}: running {} probes", suite.name, suite.probes.len());

    let mut cases = Vec::with_capacity(suite.probes.len());
    for probe in &suite.probes {
        let outcome = prober.run(probe).await;
        let suggestion = if outcome.passed {
            None
        } else {
            suggestion_for(suite, &outcome)
        };
        cases.push(CaseResult {
            description: probe.description.clone(),
            outcome,
            suggestion,
        });
    }

    let passed = cases.iter().filter(|c| c.outcome.passed).count();
    tracing::info!("Suite {}: {}/{} passed", suite.name, passed, cases.len());

    SuiteReport {
        feature: suite.name.clone(),
        description: suite.description.clone(),
        failed: cases.len() - passed,
        passed,
        cases,
    }
}

/// Run `all` features or one named feature. Unknown names fail before anything runs.
pub async fn run_suites(prober: &Prober, catalog: &Catalog, selection: &str) -> Result<Vec<SuiteReport>, ConfigError> {
    let suites = catalog.select_features(selection)?;
    let mut reports = Vec::with_capacity(suites.len());
    for suite in suites {
        reports.push(run_suite(prober, suite).await);
    }
    Ok(reports)
}

/// Environment, dependencies and every feature suite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullReport {
    pub timestamp: DateTime<Utc>,
    pub environment: EnvironmentReport,
    pub dependencies: DependencyReport,
    pub suites: Vec<SuiteReport>,
    pub truncated: bool,
}

impl FullReport {
    pub fn healthy(&self) -> bool {
        self.environment.ready
            && self.dependencies.all_healthy()
            && self.suites.iter().all(SuiteReport::all_passed)
    }
}

pub async fn run_full(prober: &Prober, catalog: &Catalog, env: &dyn EnvSource) -> FullReport {
    let timestamp = Utc::now();
    let environment = validate_environment(&catalog.environment, env);
    let dependencies = check_dependencies(prober, catalog, env).await;

    let mut suites = Vec::with_capacity(catalog.features.len());
    for suite in &catalog.features {
        suites.push(run_suite(prober, suite).await);
    }

    FullReport {
        timestamp,
        environment,
        dependencies,
        suites,
        truncated: prober.budget().is_exhausted(),
    }
}
