//! Plain-text and JSON rendering of run results.

use serde::Serialize;

use crate::advisor::{AdvisoryReport, FixStatus};
use crate::checks::{DependencyReport, DependencyStatus, EnvironmentReport};
use crate::diagnosis::{DiagnosisReport, FeatureStatus};
use crate::suite::{FullReport, SuiteReport};

pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "ok  "
    } else {
        "FAIL"
    }
}

pub fn render_suites(reports: &[SuiteReport]) -> String {
    let mut lines = Vec::new();
    for report in reports {
        lines.push(format!(
            "{} ({}/{} passed)",
            report.feature,
            report.passed,
            report.cases.len()
        ));
        for case in &report.cases {
            let outcome = &case.outcome;
            lines.push(format!(
                "  [{}] {} {}ms",
                mark(outcome.passed),
                outcome.probe_name,
                outcome.duration_ms
            ));
            if case.description != outcome.probe_name {
                lines.push(format!("         {}", case.description));
            }
            if let Some(reason) = &outcome.failure_reason {
                lines.push(format!("         {}", reason));
            }
            if let Some(suggestion) = &case.suggestion {
                lines.push(format!("         fix: {}", suggestion));
            }
            for warning in &outcome.warnings {
                lines.push(format!("         warning: {}", warning));
            }
        }
    }
    let passed: usize = reports.iter().map(|r| r.passed).sum();
    let total: usize = reports.iter().map(|r| r.cases.len()).sum();
    lines.push(format!("{}/{} probes passed", passed, total));
    lines.join("\n")
}

pub fn render_dependencies(report: &DependencyReport) -> String {
    let mut lines: Vec<String> = report
        .records
        .iter()
        .map(|r| {
            let status = match r.status {
                DependencyStatus::Healthy => "healthy",
                DependencyStatus::Unhealthy => "unhealthy",
                DependencyStatus::Failed => "failed",
            };
            let credential = match r.credential_configured {
                Some(true) => " (credential configured)",
                Some(false) => " (credential missing)",
                None => "",
            };
            format!("  [{}] {}: {}{}", status, r.name, r.detail, credential)
        })
        .collect();
    lines.push(format!("{}/{} dependencies healthy", report.healthy, report.total));
    lines.join("\n")
}

pub fn render_environment(report: &EnvironmentReport) -> String {
    let mut lines = vec!["Required:".to_string()];
    for var in &report.required {
        let state = match (var.present, var.valid) {
            (false, _) => "MISSING",
            (true, false) => "INVALID",
            (true, true) => "valid",
        };
        let critical = if var.critical { " (critical)" } else { "" };
        lines.push(format!("  {:<8} {} = {}{}", state, var.name, var.masked_value, critical));
    }
    lines.push("Optional:".to_string());
    for var in &report.optional {
        let mut line = format!("  {:<8} {} = {}", if var.present { "set" } else { "unset" }, var.name, var.masked_value);
        if let (Some(expected), Some(false)) = (&var.expected, var.matches_expected) {
            line.push_str(&format!(" (expected {})", expected));
        }
        lines.push(line);
    }
    lines.push("Security:".to_string());
    for check in &report.security {
        lines.push(format!("  [{}] {}", mark(check.passed), check.description));
    }
    lines.push(format!(
        "{} security checks passed, environment {}",
        report.security_passed,
        if report.ready { "ready" } else { "not ready" }
    ));
    lines.join("\n")
}

pub fn render_advisory(report: &AdvisoryReport) -> String {
    let mut lines = Vec::new();
    for action in &report.actions {
        let status = match action.status {
            FixStatus::Applied => "applied",
            FixStatus::Failed => "failed",
            FixStatus::Recommended => "recommended",
        };
        lines.push(format!("  [{}] {} / {}: {}", status, action.category, action.issue, action.detail));
        if let Some(recommendation) = &action.recommendation {
            lines.push(format!("      {}", recommendation));
        }
        if let (Some(current), Some(target)) = (&action.current, &action.target) {
            lines.push(format!("      current {}, target {}", current, target));
        }
    }
    lines.push(format!(
        "{} applied, {} failed, {} recommended: {}",
        report.applied,
        report.failed,
        report.recommended,
        if report.healthy { "healthy" } else { "needs attention" }
    ));
    lines.join("\n")
}

pub fn render_diagnosis(report: &DiagnosisReport) -> String {
    let mut lines = vec![format!("Diagnosis at {}", report.timestamp.to_rfc3339())];
    lines.push(format!(
        "Environment: {}/{} required variables valid, {}",
        report.environment.required.iter().filter(|v| v.present && v.valid).count(),
        report.environment.required.len(),
        if report.environment.ready { "ready" } else { "not ready" }
    ));
    lines.push(format!(
        "Dependencies: {}/{} healthy",
        report.dependencies.healthy, report.dependencies.total
    ));
    lines.push("Features:".to_string());
    for feature in &report.features {
        let ok = feature.status == FeatureStatus::Operational;
        lines.push(format!("  [{}] {} {}ms", mark(ok), feature.name, feature.response_time_ms));
        if let Some(reason) = &feature.outcome.failure_reason {
            lines.push(format!("         {}", reason));
        }
    }
    if let Some(perf) = &report.performance {
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| "unknown".to_string());
        lines.push(format!(
            "Performance: memory {}MB, uptime {}s, runtime {}",
            or_unknown(perf.memory_mb.map(|m| m.to_string())),
            or_unknown(perf.uptime_secs.map(|u| u.to_string())),
            or_unknown(perf.runtime_version.clone())
        ));
    }
    if !report.recommendations.is_empty() {
        lines.push("Recommendations:".to_string());
        for rec in &report.recommendations {
            lines.push(format!("  [{}] {}: {}", rec.priority, rec.category, rec.issue));
            lines.push(format!("         {}", rec.action));
        }
    }
    lines.push(format!(
        "Health: {} ({}), {}/{} features operational in {}ms{}",
        report.health_score,
        report.health_level,
        report.operational(),
        report.features.len(),
        report.duration_ms,
        if report.truncated { ", truncated" } else { "" }
    ));
    lines.join("\n")
}

pub fn render_full(report: &FullReport) -> String {
    [
        render_environment(&report.environment),
        render_dependencies(&report.dependencies),
        render_suites(&report.suites),
        format!(
            "Overall: {}{}",
            if report.healthy() { "healthy" } else { "needs attention" },
            if report.truncated { " (truncated)" } else { "" }
        ),
    ]
    .join("\n\n")
}
