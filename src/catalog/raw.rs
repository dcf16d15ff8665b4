//! Catalog file format and its validation into typed definitions.

use super::models::*;
use super::ConfigError;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawCatalog {
    #[serde(default)]
    pub features: Option<BTreeMap<String, RawFeature>>,
    #[serde(default)]
    pub dependencies: Option<RawDependencies>,
    #[serde(default)]
    pub environment: Option<EnvCatalog>,
    #[serde(default)]
    pub endpoints: Option<Endpoints>,
    #[serde(default)]
    pub expected_runtime_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawFeature {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub common_errors: BTreeMap<String, String>,
    pub probes: Vec<RawProbe>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawDependencies {
    #[serde(default)]
    pub external_apis: Option<Vec<ExternalApiSpec>>,
    #[serde(default)]
    pub command_checks: Vec<RawCommandCheck>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawCommandCheck {
    pub name: String,
    #[serde(alias = "command")]
    pub status_check: String,
    pub expected_status: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawProbe {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub expected: RawExpected,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawExpected {
    pub status: Option<u16>,
    pub min_properties: Option<usize>,
    pub min_results: Option<usize>,
    pub min_listings: Option<usize>,
    pub contains: Option<Vec<String>>,
    pub required_fields: Option<Vec<String>>,
    pub max_response_time: Option<u64>,
    pub output: Option<String>,
    pub pattern: Option<String>,
    pub greater_than: Option<i64>,
}

fn invalid(name: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidProbe {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn timeout_from(name: &str, timeout_ms: Option<u64>) -> Result<Duration, ConfigError> {
    match timeout_ms {
        None => Ok(DEFAULT_TIMEOUT),
        Some(0) => Err(invalid(name, "timeoutMs must be greater than zero")),
        Some(ms) => Ok(Duration::from_millis(ms)),
    }
}

impl RawExpected {
    fn has_command_fields(&self) -> bool {
        self.output.is_some() || self.pattern.is_some() || self.greater_than.is_some()
    }

    fn has_http_fields(&self) -> bool {
        self.status.is_some()
            || self.min_properties.is_some()
            || self.min_results.is_some()
            || self.min_listings.is_some()
            || self.contains.is_some()
            || self.required_fields.is_some()
            || self.max_response_time.is_some()
    }

    fn into_assertions(self) -> Vec<Assertion> {
        let mut assertions = Vec::new();
        if let Some(status) = self.status {
            assertions.push(Assertion::StatusEquals(status));
        }
        if let Some(min) = self.min_properties.or(self.min_results) {
            assertions.push(Assertion::MinCount {
                min,
                source: CountSource::Results,
            });
        }
        if let Some(min) = self.min_listings {
            assertions.push(Assertion::MinCount {
                min,
                source: CountSource::Listings,
            });
        }
        if let Some(fields) = self.contains {
            assertions.push(Assertion::FieldsPresent(fields));
        }
        if let Some(fields) = self.required_fields {
            assertions.push(Assertion::FieldsPresentStrict(fields));
        }
        if let Some(ms) = self.max_response_time {
            assertions.push(Assertion::MaxDuration(Duration::from_millis(ms)));
        }
        assertions
    }
}

impl TryFrom<RawProbe> for ProbeSpec {
    type Error = ConfigError;

    fn try_from(raw: RawProbe) -> Result<Self, Self::Error> {
        let name = raw.name.trim().to_string();
        if name.is_empty() {
            return Err(invalid("<unnamed>", "probe name cannot be empty"));
        }
        let timeout = timeout_from(&name, raw.timeout_ms)?;
        let description = raw.description.unwrap_or_else(|| name.clone());

        match raw.kind.to_ascii_lowercase().as_str() {
            "http" => {
                if raw.command.is_some() {
                    return Err(invalid(&name, "http probes take an endpoint, not a command"));
                }
                if raw.expected.has_command_fields() {
                    return Err(invalid(&name, "output expectations apply to command probes only"));
                }
                if raw.expected.min_properties.is_some() && raw.expected.min_results.is_some() {
                    return Err(invalid(&name, "minProperties and minResults are aliases; set only one"));
                }
                let endpoint = match raw.endpoint {
                    Some(e) if !e.trim().is_empty() => e,
                    _ => return Err(invalid(&name, "http probe is missing an endpoint")),
                };
                let method = match raw.method {
                    Some(m) => m.parse().map_err(|e: String| invalid(&name, e))?,
                    None => HttpMethod::Get,
                };
                Ok(ProbeSpec {
                    name,
                    description,
                    target: ProbeTarget::Http(HttpTarget {
                        endpoint,
                        method,
                        query: raw.query.into_iter().collect(),
                        headers: raw.headers.into_iter().collect(),
                        payload: raw.payload,
                    }),
                    timeout,
                    assertions: raw.expected.into_assertions(),
                })
            }
            "command" => {
                if raw.endpoint.is_some() {
                    return Err(invalid(&name, "command probes take a command, not an endpoint"));
                }
                if raw.expected.has_http_fields() {
                    return Err(invalid(&name, "response assertions apply to http probes only"));
                }
                let command = match raw.command {
                    Some(c) if !c.trim().is_empty() => c,
                    _ => return Err(invalid(&name, "command probe is missing a command")),
                };
                let expected = raw.expected;
                let expect = match (expected.greater_than, expected.output, expected.pattern) {
                    (Some(n), None, None) => OutputExpectation::GreaterThan(n),
                    (None, Some(s), None) => OutputExpectation::Contains(s),
                    (None, None, Some(p)) => OutputExpectation::Matches(
                        Regex::new(&p).map_err(|e| invalid(&name, format!("invalid pattern: {}", e)))?,
                    ),
                    (None, None, None) => {
                        return Err(invalid(&name, "command probe needs output, pattern or greaterThan"))
                    }
                    _ => {
                        return Err(invalid(
                            &name,
                            "command probe takes exactly one of output, pattern or greaterThan",
                        ))
                    }
                };

                Ok(ProbeSpec {
                    name,
                    description,
                    target: ProbeTarget::Command(CommandTarget { command, expect }),
                    timeout,
                    assertions: Vec::new(),
                })
            }
            other => Err(invalid(&name, format!("unknown probe kind: {}", other))),
        }
    }
}

impl TryFrom<RawCommandCheck> for CommandDependency {
    type Error = ConfigError;

    fn try_from(raw: RawCommandCheck) -> Result<Self, Self::Error> {
        if raw.status_check.trim().is_empty() {
            return Err(invalid(&raw.name, "dependency check is missing a statusCheck command"));
        }
        Ok(CommandDependency {
            timeout: timeout_from(&raw.name, raw.timeout_ms.or(Some(5_000)))?,
            name: raw.name,
            command: raw.status_check,
            expected_status: raw.expected_status,
        })
    }
}

pub(super) fn build_feature(name: String, raw: RawFeature) -> Result<FeatureSuite, ConfigError> {
    if raw.probes.is_empty() {
        return Err(invalid(&name, "feature has no probes"));
    }

    let mut seen = HashSet::new();
    let mut probes = Vec::with_capacity(raw.probes.len());
    for raw_probe in raw.probes {
        let probe = ProbeSpec::try_from(raw_probe)?;
        if !seen.insert(probe.name.clone()) {
            return Err(invalid(&probe.name, format!("duplicate probe name in feature {}", name)));
        }
        probes.push(probe);
    }

    Ok(FeatureSuite {
        description: if raw.description.is_empty() { name.clone() } else { raw.description },
        name,
        probes,
        common_errors: raw.common_errors,
    })
}
