//! Probe execution.
//!
//! Supports HTTP and command probes. Executors never fail across their boundary:
//! every [`ProbeError`] is folded into a failed [`Outcome`] carrying a typed
//! [`ErrorKind`].

mod budget;
mod command;
mod http;

pub use budget::*;
pub use command::*;
pub use http::*;

use crate::catalog::{ProbeSpec, ProbeTarget};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("{0}")]
    Assertion(#[from] AssertionFailure),
    #[error("command failed: {0}")]
    Command(String),
    #[error("run budget exhausted before the probe completed")]
    Cancelled,
}

/// A response or command output that did not meet an expectation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssertionFailure {
    #[error("status {actual}, expected {expected}")]
    UnexpectedStatus { expected: u16, actual: u16 },
    #[error("status {actual}, expected a 2xx response")]
    Unsuccessful { actual: u16 },
    #[error("status {actual} with a body that is not a JSON object")]
    UnexpectedBody { actual: u16 },
    #[error("only {actual} {noun}, expected at least {expected}")]
    TooFewResults {
        expected: usize,
        actual: usize,
        noun: &'static str,
    },
    #[error("missing fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("unexpected output '{actual}', expected {expected}")]
    OutputMismatch { expected: String, actual: String },
}

/// Failure category derived from the typed error, used to pick a remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    NoResults,
    InvalidInput,
    ApiError,
    Assertion,
    Connection,
    Command,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::NoResults => "no_results",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ApiError => "api_error",
            ErrorKind::Assertion => "assertion",
            ErrorKind::Connection => "connection",
            ErrorKind::Command => "command",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    /// Generic suggested fix for this kind of failure.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            ErrorKind::Timeout => {
                Some("Increase the probe timeout or check upstream API latency and rate limits")
            }
            ErrorKind::NoResults => {
                Some("Verify data provider API keys and that the queried area has coverage")
            }
            ErrorKind::InvalidInput => Some("Check the request parameters (e.g. a valid 5-digit ZIP code)"),
            ErrorKind::ApiError => Some("Inspect server logs for the failing route and restart the service"),
            ErrorKind::Connection => Some("Verify the target service is running at the configured base URL"),
            ErrorKind::Assertion | ErrorKind::Command | ErrorKind::Cancelled => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Timeout(_) => ErrorKind::Timeout,
            ProbeError::Connection(_) => ErrorKind::Connection,
            ProbeError::Command(_) => ErrorKind::Command,
            ProbeError::Cancelled => ErrorKind::Cancelled,
            ProbeError::Assertion(failure) => match failure {
                AssertionFailure::TooFewResults { .. } => ErrorKind::NoResults,
                AssertionFailure::UnexpectedStatus { actual, .. }
                | AssertionFailure::Unsuccessful { actual } => match *actual {
                    400 | 422 => ErrorKind::InvalidInput,
                    400..=599 => ErrorKind::ApiError,
                    _ => ErrorKind::Assertion,
                },
                AssertionFailure::MissingFields(_)
                | AssertionFailure::OutputMismatch { .. }
                | AssertionFailure::UnexpectedBody { .. } => ErrorKind::Assertion,
            },
        }
    }
}

/// Result of executing one probe. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub probe_name: String,
    pub passed: bool,
    pub duration_ms: u64,
    pub observed_value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Outcome {
    pub fn passed(probe_name: &str, duration: Duration, observed_value: Value, warnings: Vec<String>) -> Self {
        Self {
            probe_name: probe_name.to_string(),
            passed: true,
            duration_ms: duration.as_millis() as u64,
            observed_value,
            failure_reason: None,
            error_kind: None,
            warnings,
        }
    }

    pub fn failed(probe_name: &str, duration: Duration, observed_value: Value, error: &ProbeError) -> Self {
        Self {
            probe_name: probe_name.to_string(),
            passed: false,
            duration_ms: duration.as_millis() as u64,
            observed_value,
            failure_reason: Some(error.to_string()),
            error_kind: Some(error.kind()),
            warnings: Vec::new(),
        }
    }
}

/// Fail with a timeout if a completed exchange ran past its deadline.
pub(crate) fn enforce_timeout(elapsed: Duration, timeout: Duration) -> Result<(), ProbeError> {
    if elapsed > timeout {
        return Err(ProbeError::Timeout(timeout));
    }
    Ok(())
}

/// Executes probes against one target service within one run budget.
pub struct Prober {
    client: reqwest::Client,
    base_url: String,
    budget: RunBudget,
}

impl Prober {
    /// Create a prober that honours the system proxy settings.
    pub fn new(base_url: &str, budget: RunBudget) -> Result<Self, ProbeError> {
        Self::build(base_url, budget, reqwest::Client::builder())
    }

    /// Create a prober that connects directly, ignoring proxy settings.
    pub fn direct(base_url: &str, budget: RunBudget) -> Result<Self, ProbeError> {
        Self::build(base_url, budget, reqwest::Client::builder().no_proxy())
    }

    fn build(base_url: &str, budget: RunBudget, builder: reqwest::ClientBuilder) -> Result<Self, ProbeError> {
        let client = builder
            .user_agent(concat!("platform-doctor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            budget,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn budget(&self) -> &RunBudget {
        &self.budget
    }

    /// Run a probe with the given definition.
    pub async fn run(&self, spec: &ProbeSpec) -> Outcome {
        tracing::debug!("Running {} probe {}", spec.kind(), spec.name);

        let outcome = match &spec.target {
            ProbeTarget::Http(target) => self.exchange(spec, target).await.outcome,
            ProbeTarget::Command(target) => run_command_probe(spec, target, &self.budget).await,
        };

        if outcome.passed {
            tracing::debug!("Probe {} passed in {}ms", spec.name, outcome.duration_ms);
        } else {
            tracing::warn!(
                "Probe {} failed in {}ms: {}",
                spec.name,
                outcome.duration_ms,
                outcome.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
        outcome
    }
}
