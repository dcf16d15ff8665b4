//! Diagnosis aggregation.
//!
//! A diagnosis runs sequentially: environment validation, dependency checks, the
//! curated feature probes and finally a performance snapshot. No phase aborts the
//! run; a failed phase is recorded and the next one starts. The result is a single
//! [`DiagnosisReport`] value.

mod recommend;
mod scoring;

pub use recommend::*;
pub use scoring::*;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use crate::catalog::{Catalog, FeatureCheck, ProbeTarget};
use crate::checks::{
    check_dependencies, fetch_health, validate_environment, DependencyReport, EnvSource,
    EnvironmentReport, PerformanceSnapshot,
};
use crate::probe::{Outcome, Prober};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    Operational,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureResult {
    pub name: String,
    pub status: FeatureStatus,
    pub response_time_ms: u64,
    /// Whether one of the feature's result fields carried a value.
    pub has_result: bool,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisReport {
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub environment: EnvironmentReport,
    pub dependencies: DependencyReport,
    /// In probe order.
    pub features: Vec<FeatureResult>,
    pub performance: Option<PerformanceSnapshot>,
    pub recommendations: Vec<Recommendation>,
    pub health_score: u8,
    pub health_level: HealthLevel,
    /// Set when the run budget ran out before every probe completed.
    pub truncated: bool,
}

impl DiagnosisReport {
    pub fn operational(&self) -> usize {
        self.features
            .iter()
            .filter(|f| f.status == FeatureStatus::Operational)
            .count()
    }
}

fn carries_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(_) => true,
    }
}

/// True if any field, at the top level or under `data`, carries a value.
fn has_result(body: &Value, fields: &[String]) -> bool {
    if fields.is_empty() {
        return true;
    }
    fields.iter().any(|field| {
        [body.get(field), body.get("data").and_then(|d| d.get(field))]
            .into_iter()
            .flatten()
            .any(carries_value)
    })
}

async fn probe_feature(prober: &Prober, check: &FeatureCheck) -> FeatureResult {
    let (outcome, body) = match &check.probe.target {
        ProbeTarget::Http(target) => {
            let exchange = prober.exchange(&check.probe, target).await;
            let body = exchange.response.map(|r| r.body).unwrap_or(Value::Null);
            (exchange.outcome, body)
        }
        ProbeTarget::Command(_) => {
            let outcome = prober.run(&check.probe).await;
            let body = outcome.observed_value.clone();
            (outcome, body)
        }
    };

    let has_result = outcome.passed && has_result(&body, &check.result_fields);
    let status = if has_result {
        FeatureStatus::Operational
    } else {
        FeatureStatus::Failed
    };

    match status {
        FeatureStatus::Operational => {
            tracing::info!("Diagnosis: {} operational in {}ms", check.feature, outcome.duration_ms)
        }
        FeatureStatus::Failed if outcome.passed => {
            tracing::warn!("Diagnosis: {} responded without any result data", check.feature)
        }
        FeatureStatus::Failed => tracing::warn!(
            "Diagnosis: {} failed: {}",
            check.feature,
            outcome.failure_reason.as_deref().unwrap_or("unknown")
        ),
    }

    FeatureResult {
        name: check.feature.clone(),
        status,
        response_time_ms: outcome.duration_ms,
        has_result,
        outcome,
    }
}

/// Run a full diagnosis against the prober's target.
pub async fn run_diagnosis(prober: &Prober, catalog: &Catalog, env: &dyn EnvSource) -> DiagnosisReport {
    let timestamp = Utc::now();
    let start = Instant::now();

    tracing::info!("Diagnosis: phase 1, environment");
    let environment = validate_environment(&catalog.environment, env);

    tracing::info!("Diagnosis: phase 2, dependencies");
    let dependencies = check_dependencies(prober, catalog, env).await;

    tracing::info!("Diagnosis: phase 3, feature probes");
    let mut features = Vec::new();
    for check in catalog.feature_checks() {
        features.push(probe_feature(prober, &check).await);
    }

    tracing::info!("Diagnosis: phase 4, performance");
    let performance = match fetch_health(prober, &catalog.endpoints.health).await {
        Ok(reading) => Some(reading.payload.snapshot()),
        Err(e) => {
            tracing::warn!("Diagnosis: performance snapshot unavailable: {}", e);
            None
        }
    };

    let recommendations = synthesize(&environment, &dependencies, &features, performance.as_ref());
    let operational = features
        .iter()
        .filter(|f| f.status == FeatureStatus::Operational)
        .count();
    let health_score = health_score(operational, features.len());
    let health_level = HealthLevel::from_score(health_score);
    let truncated = prober.budget().is_exhausted();
    if truncated {
        tracing::warn!("Diagnosis: run budget exhausted, report is partial");
    }

    tracing::info!(
        "Diagnosis: {}/{} features operational, health {} ({})",
        operational,
        features.len(),
        health_score,
        health_level
    );

    DiagnosisReport {
        timestamp,
        duration_ms: start.elapsed().as_millis() as u64,
        environment,
        dependencies,
        features,
        performance,
        recommendations,
        health_score,
        health_level,
        truncated,
    }
}
