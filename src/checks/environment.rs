//! Environment variable validation.

use serde::Serialize;

use super::EnvSource;
use crate::catalog::EnvCatalog;

const NOT_SET: &str = "not_set";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvVarRecord {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub critical: bool,
    pub present: bool,
    pub valid: bool,
    /// Masked or redacted value; never the full secret.
    pub masked_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches_expected: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityCheck {
    pub name: String,
    pub description: String,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentReport {
    pub required: Vec<EnvVarRecord>,
    pub optional: Vec<EnvVarRecord>,
    pub security: Vec<SecurityCheck>,
    pub security_passed: usize,
    pub ready: bool,
}

impl EnvironmentReport {
    /// Required variables that are missing or fail the validity heuristic.
    pub fn problems(&self) -> impl Iterator<Item = &EnvVarRecord> {
        self.required.iter().filter(|r| !(r.present && r.valid))
    }
}

/// Heuristic: long enough and not obviously a test or placeholder value.
pub fn looks_valid(value: &str) -> bool {
    value.chars().count() > 10 && !value.contains("test") && !value.contains("placeholder")
}

/// First 8 characters followed by an ellipsis.
pub fn mask(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("{}...", v.chars().take(8).collect::<String>()),
        None => NOT_SET.to_string(),
    }
}

/// Validate the catalog's environment variables against `env`.
pub fn validate_environment(catalog: &EnvCatalog, env: &dyn EnvSource) -> EnvironmentReport {
    let required: Vec<EnvVarRecord> = catalog
        .required
        .iter()
        .map(|var| {
            let value = env.var(&var.name);
            let record = EnvVarRecord {
                name: var.name.clone(),
                description: var.description.clone(),
                required: true,
                critical: var.critical,
                present: value.is_some(),
                valid: value.as_deref().is_some_and(looks_valid),
                masked_value: mask(value.as_deref()),
                expected: None,
                matches_expected: None,
            };
            if !record.present {
                tracing::debug!("Environment: {} is missing", record.name);
            } else if !record.valid {
                tracing::warn!("Environment: {} looks like test or placeholder data", record.name);
            }
            record
        })
        .collect();

    let optional = catalog
        .optional
        .iter()
        .map(|var| {
            let value = env.var(&var.name);
            let shown = match (&value, var.sensitive) {
                (Some(_), true) => "configured".to_string(),
                (Some(v), false) => v.clone(),
                (None, _) => NOT_SET.to_string(),
            };
            EnvVarRecord {
                name: var.name.clone(),
                description: var.description.clone(),
                required: false,
                critical: false,
                present: value.is_some(),
                valid: value.is_some(),
                masked_value: shown,
                expected: var.expected.clone(),
                matches_expected: var.expected.as_ref().map(|e| value.as_ref() == Some(e)),
            }
        })
        .collect();

    let security_vars = &catalog.security;
    let connection = env.var(&security_vars.connection_string).unwrap_or_default();
    let mode = env.var(&security_vars.runtime_mode);
    let security = vec![
        SecurityCheck {
            name: "API Key Format".to_string(),
            description: "API keys meet minimum length requirements".to_string(),
            passed: !security_vars.api_keys.is_empty()
                && security_vars
                    .api_keys
                    .iter()
                    .all(|k| env.var(k).is_some_and(|v| v.chars().count() >= 32)),
        },
        SecurityCheck {
            name: "Database Security".to_string(),
            description: "Database connection uses SSL encryption".to_string(),
            passed: connection.contains("ssl=true") || connection.contains("sslmode=require"),
        },
        SecurityCheck {
            name: "Environment Isolation".to_string(),
            description: "Runtime mode is development or production".to_string(),
            passed: matches!(mode.as_deref(), Some("development") | Some("production")),
        },
    ];

    let security_passed = security.iter().filter(|c| c.passed).count();
    let critical_ok = required
        .iter()
        .filter(|r| r.critical)
        .all(|r| r.present && r.valid);

    EnvironmentReport {
        required,
        optional,
        security,
        security_passed,
        ready: critical_ok && security_passed >= 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_environment;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn record<'a>(report: &'a EnvironmentReport, name: &str) -> &'a EnvVarRecord {
        report
            .required
            .iter()
            .chain(&report.optional)
            .find(|r| r.name == name)
            .unwrap()
    }

    #[test]
    fn test_masking() {
        assert_eq!(mask(Some("abcdefghijklmnop")), "abcdefgh...");
        assert_eq!(mask(Some("abc")), "abc...");
        assert_eq!(mask(None), "not_set");
    }

    #[test]
    fn test_missing_and_placeholder_values() {
        let source = env(&[
            ("DATABASE_URL", "postgres://u:p@db.example.com/app?sslmode=require"),
            ("ATTOM_API_KEY", "placeholder-key-value"),
            ("RAPIDAPI_KEY", "short"),
        ]);
        let report = validate_environment(&default_environment(), &source);

        let db = record(&report, "DATABASE_URL");
        assert!(db.present && db.valid);
        assert_eq!(db.masked_value, "postgres...");

        let attom = record(&report, "ATTOM_API_KEY");
        assert!(attom.present && !attom.valid);

        let rapid = record(&report, "RAPIDAPI_KEY");
        assert!(rapid.present && !rapid.valid);

        let geodb = record(&report, "GEODB_API_KEY");
        assert!(!geodb.present && !geodb.critical);
        assert_eq!(geodb.masked_value, "not_set");

        assert_eq!(report.problems().count(), 4);
        assert!(!report.ready);
    }

    #[test]
    fn test_optional_values() {
        let source = env(&[("NODE_ENV", "production"), ("SESSION_SECRET", "s3cr3t-value")]);
        let report = validate_environment(&default_environment(), &source);

        let mode = record(&report, "NODE_ENV");
        assert_eq!(mode.masked_value, "production");
        assert_eq!(mode.expected.as_deref(), Some("development"));
        assert_eq!(mode.matches_expected, Some(false));

        let secret = record(&report, "SESSION_SECRET");
        assert_eq!(secret.masked_value, "configured");
        assert_eq!(secret.matches_expected, None);

        assert_eq!(record(&report, "ISSUER_URL").masked_value, "not_set");
    }

    #[test]
    fn test_ready_environment() {
        let source = env(&[
            ("DATABASE_URL", "postgres://u:p@db.example.com/app?ssl=true"),
            ("ATTOM_API_KEY", "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6"),
            ("RAPIDAPI_KEY", "f0e1d2c3b4a5968778695a4b3c2d1e0f"),
            ("NODE_ENV", "development"),
        ]);
        let report = validate_environment(&default_environment(), &source);
        assert_eq!(report.security_passed, 3);
        assert!(report.ready);
        // Non-critical gaps do not block readiness
        assert_eq!(report.problems().count(), 2);
    }

    #[test]
    fn test_security_threshold() {
        let source = env(&[
            ("DATABASE_URL", "postgres://u:p@db.example.com/app"),
            ("ATTOM_API_KEY", "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6"),
            ("RAPIDAPI_KEY", "f0e1d2c3b4a5968778695a4b3c2d1e0f"),
        ]);
        let report = validate_environment(&default_environment(), &source);
        assert_eq!(report.security_passed, 1);
        assert!(!report.ready);
    }

    #[test]
    fn test_validation_is_deterministic() {
        let source = env(&[("DATABASE_URL", "postgres://localhost/app"), ("NODE_ENV", "production")]);
        let catalog = default_environment();
        assert_eq!(
            validate_environment(&catalog, &source),
            validate_environment(&catalog, &source)
        );
    }
}
