//! Check definitions: probes, feature suites, dependency and environment targets.
//!
//! The catalog is loaded once per run, either from the built-in defaults or from a
//! JSON file, and validated up front so malformed entries fail before anything
//! executes. Sections missing from a file fall back to the defaults.

mod defaults;
mod models;
mod raw;

pub use defaults::*;
pub use models::*;

use raw::{build_feature, RawCatalog};
use std::path::Path;
use thiserror::Error;

/// Configuration error types. These halt the invocation that hit them.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown feature: {0}")]
    UnknownFeature(String),
    #[error("unknown issue category: {0}")]
    UnknownCategory(String),
    #[error("invalid probe '{name}': {reason}")]
    InvalidProbe { name: String, reason: String },
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Catalog {
    /// Parse and validate a catalog from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawCatalog = serde_json::from_str(text)?;
        let mut catalog = Catalog::default();

        if let Some(features) = raw.features {
            catalog.features = features
                .into_iter()
                .map(|(name, feature)| build_feature(name, feature))
                .collect::<Result<Vec<_>, _>>()?;
        }

        if let Some(deps) = raw.dependencies {
            if let Some(apis) = deps.external_apis {
                catalog.external_apis = apis;
            }
            catalog.command_dependencies = deps
                .command_checks
                .into_iter()
                .map(CommandDependency::try_from)
                .collect::<Result<Vec<_>, _>>()?;
        }

        if let Some(environment) = raw.environment {
            catalog.environment = environment;
        }
        if let Some(endpoints) = raw.endpoints {
            catalog.endpoints = endpoints;
        }
        if raw.expected_runtime_version.is_some() {
            catalog.expected_runtime_version = raw.expected_runtime_version;
        }

        Ok(catalog)
    }

    /// Load a catalog file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json(&text)?;
        tracing::info!(
            "Loaded catalog from {} ({} features)",
            path.as_ref().display(),
            catalog.features.len()
        );
        Ok(catalog)
    }

    /// Look up a feature suite by name.
    pub fn feature(&self, name: &str) -> Result<&FeatureSuite, ConfigError> {
        self.features
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ConfigError::UnknownFeature(name.to_string()))
    }

    /// Resolve `all` or a single feature name to the suites to run.
    pub fn select_features(&self, name: &str) -> Result<Vec<&FeatureSuite>, ConfigError> {
        if name == "all" {
            return Ok(self.features.iter().collect());
        }
        Ok(vec![self.feature(name)?])
    }

    /// Curated feature probes for the diagnosis run.
    pub fn feature_checks(&self) -> Vec<FeatureCheck> {
        curated_checks(&self.endpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_default_catalog() {
        let catalog = Catalog::default();
        assert!(catalog.feature("propertyIntelligence").is_ok());
        assert_eq!(catalog.feature_checks().len(), 4);
        assert_eq!(catalog.environment.required.iter().filter(|v| v.critical).count(), 3);
        assert_eq!(catalog.external_apis.len(), 2);
    }

    #[test]
    fn test_unknown_feature() {
        let catalog = Catalog::default();
        let err = catalog.select_features("globalSearch").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFeature(ref name) if name == "globalSearch"));
        assert_eq!(catalog.select_features("all").unwrap().len(), catalog.features.len());
    }

    #[test]
    fn test_parse_http_probe() {
        let catalog = Catalog::from_json(
            r#"{
                "features": {
                    "search": {
                        "commonErrors": { "timeout": "slow down" },
                        "probes": [{
                            "name": "zip search",
                            "kind": "http",
                            "endpoint": "/api/properties",
                            "method": "get",
                            "query": { "zipCode": "90210" },
                            "timeoutMs": 2500,
                            "expected": {
                                "status": 200,
                                "minProperties": 10,
                                "contains": ["price"],
                                "maxResponseTime": 1000
                            }
                        }]
                    }
                }
            }"#,
        )
        .unwrap();

        let suite = catalog.feature("search").unwrap();
        assert_eq!(suite.common_errors.get("timeout").unwrap(), "slow down");
        let probe = &suite.probes[0];
        assert_eq!(probe.timeout, Duration::from_millis(2500));
        assert_eq!(
            probe.assertions,
            vec![
                Assertion::StatusEquals(200),
                Assertion::MinCount { min: 10, source: CountSource::Results },
                Assertion::FieldsPresent(vec!["price".to_string()]),
                Assertion::MaxDuration(Duration::from_millis(1000)),
            ]
        );
        match &probe.target {
            ProbeTarget::Http(t) => {
                assert_eq!(t.method, HttpMethod::Get);
                assert_eq!(t.query, vec![("zipCode".to_string(), "90210".to_string())]);
            }
            other => panic!("expected http target, got {:?}", other),
        }

        // Sections not in the file keep their defaults
        assert_eq!(catalog.environment, default_environment());
    }

    #[test]
    fn test_parse_command_probe() {
        let catalog = Catalog::from_json(
            r#"{
                "features": {
                    "storage": {
                        "probes": [
                            { "name": "row count", "kind": "command", "command": "echo 3", "expected": { "greaterThan": 0 } },
                            { "name": "ping", "kind": "command", "command": "echo ok", "expected": { "pattern": "^ok" } }
                        ]
                    }
                },
                "dependencies": {
                    "commandChecks": [{ "name": "redis", "statusCheck": "echo PONG", "expectedStatus": "PONG" }]
                }
            }"#,
        )
        .unwrap();

        let probes = &catalog.feature("storage").unwrap().probes;
        assert!(matches!(
            &probes[0].target,
            ProbeTarget::Command(CommandTarget { expect: OutputExpectation::GreaterThan(0), .. })
        ));
        assert!(matches!(
            &probes[1].target,
            ProbeTarget::Command(CommandTarget { expect: OutputExpectation::Matches(_), .. })
        ));
        assert_eq!(catalog.command_dependencies[0].expected_status, "PONG");
        assert_eq!(catalog.command_dependencies[0].timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_malformed_probes() {
        let cases = [
            (r#"{ "name": "a", "kind": "http" }"#, "missing an endpoint"),
            (r#"{ "name": "b", "kind": "ftp", "endpoint": "/" }"#, "unknown probe kind"),
            (r#"{ "name": "c", "kind": "http", "endpoint": "/", "timeoutMs": 0 }"#, "greater than zero"),
            (r#"{ "name": "d", "kind": "command", "command": "true" }"#, "needs output"),
            (
                r#"{ "name": "e", "kind": "command", "command": "true", "expected": { "pattern": "(" } }"#,
                "invalid pattern",
            ),
            (
                r#"{ "name": "f", "kind": "http", "endpoint": "/", "expected": { "output": "x" } }"#,
                "command probes only",
            ),
            (r#"{ "name": "g", "kind": "http", "endpoint": "/", "method": "BREW" }"#, "unsupported method"),
            (
                r#"{ "name": "h", "kind": "http", "endpoint": "/", "expected": { "minProperties": 1, "minResults": 5 } }"#,
                "set only one",
            ),
        ];

        for (probe, expected) in cases {
            let text = format!(r#"{{ "features": {{ "f": {{ "probes": [{}] }} }} }}"#, probe);
            match Catalog::from_json(&text) {
                Err(ConfigError::InvalidProbe { reason, .. }) => {
                    assert!(reason.contains(expected), "{} -> {}", probe, reason)
                }
                other => panic!("expected InvalidProbe for {}, got {:?}", probe, other),
            }
        }
    }

    #[test]
    fn test_rejects_duplicate_probe_names() {
        let text = r#"{ "features": { "f": { "probes": [
            { "name": "same", "kind": "http", "endpoint": "/a" },
            { "name": "same", "kind": "http", "endpoint": "/b" }
        ] } } }"#;
        assert!(matches!(
            Catalog::from_json(text),
            Err(ConfigError::InvalidProbe { ref name, .. }) if name == "same"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "endpoints": {{ "health": "/healthz" }}, "expectedRuntimeVersion": "v22.1.0" }}"#)
            .unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.endpoints.health, "/healthz");
        // Unset endpoint fields keep their defaults
        assert_eq!(catalog.endpoints.foreclosures, "/api/foreclosures");
        assert_eq!(catalog.expected_runtime_version.as_deref(), Some("v22.1.0"));

        assert!(matches!(Catalog::load("/nonexistent/catalog.json"), Err(ConfigError::Io(_))));
        assert!(matches!(Catalog::from_json("{ not json"), Err(ConfigError::Parse(_))));
    }
}
