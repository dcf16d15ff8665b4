//! Recommendation synthesis.

use serde::Serialize;

use super::{FeatureResult, FeatureStatus};
use crate::checks::{DependencyReport, EnvironmentReport, PerformanceSnapshot};

/// Heap usage above this many megabytes is degraded performance.
pub const MEMORY_THRESHOLD_MB: u64 = 200;
/// An operational feature slower than this is degraded performance.
pub const SLOW_FEATURE_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub category: String,
    pub priority: Priority,
    pub issue: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
}

impl Recommendation {
    fn new(category: &str, priority: Priority, issue: String, action: &str) -> Self {
        Self {
            category: category.to_string(),
            priority,
            issue,
            action: action.to_string(),
            current: None,
        }
    }

    fn with_current(mut self, current: String) -> Self {
        self.current = Some(current);
        self
    }
}

/// Walk the collected results in phase order and emit recommendations.
pub fn synthesize(
    environment: &EnvironmentReport,
    dependencies: &DependencyReport,
    features: &[FeatureResult],
    performance: Option<&PerformanceSnapshot>,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for var in environment.problems() {
        let state = if var.present { "invalid" } else { "missing" };
        if var.critical {
            out.push(Recommendation::new(
                "Environment",
                Priority::High,
                format!("{} is {}", var.name, state),
                "Configure the credential in the deployment secrets",
            ));
        } else {
            out.push(Recommendation::new(
                "Environment",
                Priority::Low,
                format!("{} is {}", var.name, state),
                "Configure the optional fallback credential",
            ));
        }
    }

    if let Some(mb) = performance.and_then(|p| p.memory_mb) {
        if mb > MEMORY_THRESHOLD_MB {
            out.push(
                Recommendation::new(
                    "Performance",
                    Priority::Medium,
                    format!("High memory usage: {}MB", mb),
                    "Consider restarting the application to clear memory",
                )
                .with_current(mb.to_string()),
            );
        }
    }

    for feature in features {
        match feature.status {
            FeatureStatus::Failed => out.push(Recommendation::new(
                "Features",
                Priority::High,
                format!("{} not working", feature.name),
                "Check the feature configuration and API connectivity",
            )),
            FeatureStatus::Operational if feature.response_time_ms > SLOW_FEATURE_MS => out.push(
                Recommendation::new(
                    "Performance",
                    Priority::Medium,
                    format!("{} slow response: {}ms", feature.name, feature.response_time_ms),
                    "Investigate API performance or network connectivity",
                )
                .with_current(feature.response_time_ms.to_string()),
            ),
            FeatureStatus::Operational => {}
        }
    }

    for dep in dependencies.records.iter().filter(|d| !d.is_healthy()) {
        out.push(Recommendation::new(
            "Dependencies",
            Priority::Low,
            format!("{} is {}", dep.name, dep.detail),
            "Verify the dependency's credentials and reachability",
        ));
    }

    out
}
