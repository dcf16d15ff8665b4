//! Validated check definition types.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Default probe timeout when the catalog does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// HTTP method for an HTTP probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

/// Where a result count is read from in a JSON response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSource {
    /// `properties`, then `foreclosures`, then `data.properties`.
    Results,
    /// `foreclosures` only.
    Listings,
}

impl CountSource {
    /// JSON pointers checked in order; the first non-empty array wins.
    pub fn pointers(&self) -> &'static [&'static str] {
        match self {
            CountSource::Results => &["/properties", "/foreclosures", "/data/properties"],
            CountSource::Listings => &["/foreclosures"],
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            CountSource::Results => "results",
            CountSource::Listings => "listings",
        }
    }
}

/// One expectation on an HTTP probe's response.
#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    StatusEquals(u16),
    MinCount { min: usize, source: CountSource },
    /// Every name must appear somewhere in the serialized body.
    FieldsPresent(Vec<String>),
    /// Every name must be a key of the first result object. Null values count.
    FieldsPresentStrict(Vec<String>),
    /// Soft limit: exceeding it is reported as a warning only.
    MaxDuration(Duration),
}

/// Expected output of a command probe.
#[derive(Debug, Clone)]
pub enum OutputExpectation {
    /// Trimmed output parses to an integer strictly greater than the threshold.
    GreaterThan(i64),
    Contains(String),
    Matches(Regex),
}

impl std::fmt::Display for OutputExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputExpectation::GreaterThan(n) => write!(f, "an integer greater than {}", n),
            OutputExpectation::Contains(s) => write!(f, "output containing '{}'", s),
            OutputExpectation::Matches(re) => write!(f, "output matching /{}/", re.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpTarget {
    /// Path relative to the base URL, or an absolute URL.
    pub endpoint: String,
    pub method: HttpMethod,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub payload: Option<Value>,
}

impl HttpTarget {
    pub fn get(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method: HttpMethod::Get,
            query: Vec::new(),
            headers: Vec::new(),
            payload: None,
        }
    }

    pub fn post(endpoint: &str, payload: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            payload: Some(payload),
            ..Self::get(endpoint)
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct CommandTarget {
    pub command: String,
    pub expect: OutputExpectation,
}

#[derive(Debug, Clone)]
pub enum ProbeTarget {
    Http(HttpTarget),
    Command(CommandTarget),
}

/// One configured check. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ProbeSpec {
    pub name: String,
    pub description: String,
    pub target: ProbeTarget,
    pub timeout: Duration,
    /// Only meaningful for HTTP probes.
    pub assertions: Vec<Assertion>,
}

impl ProbeSpec {
    pub fn http(name: &str, target: HttpTarget) -> Self {
        Self {
            name: name.to_string(),
            description: name.to_string(),
            target: ProbeTarget::Http(target),
            timeout: DEFAULT_TIMEOUT,
            assertions: Vec::new(),
        }
    }

    pub fn command(name: &str, command: &str, expect: OutputExpectation) -> Self {
        Self {
            name: name.to_string(),
            description: name.to_string(),
            target: ProbeTarget::Command(CommandTarget {
                command: command.to_string(),
                expect,
            }),
            timeout: DEFAULT_TIMEOUT,
            assertions: Vec::new(),
        }
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }

    pub fn expect(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn kind(&self) -> &'static str {
        match self.target {
            ProbeTarget::Http(_) => "http",
            ProbeTarget::Command(_) => "command",
        }
    }
}

/// A named capability of the target service and the probes that exercise it.
#[derive(Debug, Clone)]
pub struct FeatureSuite {
    pub name: String,
    pub description: String,
    pub probes: Vec<ProbeSpec>,
    /// Suggested fixes keyed by error kind (`timeout`, `no_results`, ...).
    pub common_errors: BTreeMap<String, String>,
}

/// A curated feature probe used by the diagnosis run.
#[derive(Debug, Clone)]
pub struct FeatureCheck {
    pub feature: String,
    pub probe: ProbeSpec,
    /// The feature counts as operational only if one of these carries a value.
    pub result_fields: Vec<String>,
}

/// Outbound reachability check for a third-party API the service relies on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalApiSpec {
    pub name: String,
    pub url: String,
    /// Environment variable holding the API credential.
    pub credential_var: String,
    /// Header the credential is sent in.
    pub credential_header: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Dependency check backed by a local command whose output is compared to a status.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDependency {
    pub name: String,
    pub command: String,
    pub expected_status: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredVar {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionalVar {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Report only whether it is configured, never the value.
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub expected: Option<String>,
}

/// Variables consulted by the security checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityVars {
    pub api_keys: Vec<String>,
    pub connection_string: String,
    pub runtime_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvCatalog {
    pub required: Vec<RequiredVar>,
    #[serde(default)]
    pub optional: Vec<OptionalVar>,
    pub security: SecurityVars,
}

/// Paths of the target service endpoints the built-in checks use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoints {
    pub health: String,
    pub property_search: String,
    pub appraisal: String,
    pub foreclosures: String,
    pub foreclosure_track: String,
    pub lien_analysis: String,
    pub auth_user: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            health: "/api/v3/debug/health".to_string(),
            property_search: "/api/properties".to_string(),
            appraisal: "/api/properties/appraise".to_string(),
            foreclosures: "/api/foreclosures".to_string(),
            foreclosure_track: "/api/foreclosures/track".to_string(),
            lien_analysis: "/api/properties/lien-analysis".to_string(),
            auth_user: "/api/auth/user".to_string(),
        }
    }
}

/// The complete, validated set of check definitions for one run.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub features: Vec<FeatureSuite>,
    pub external_apis: Vec<ExternalApiSpec>,
    pub command_dependencies: Vec<CommandDependency>,
    pub environment: EnvCatalog,
    pub endpoints: Endpoints,
    /// Runtime version the performance advisor considers current.
    pub expected_runtime_version: Option<String>,
}
