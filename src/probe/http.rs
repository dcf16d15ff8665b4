//! HTTP probe implementation.

use super::{enforce_timeout, AssertionFailure, Outcome, ProbeError, Prober};
use crate::catalog::{Assertion, CountSource, HttpMethod, HttpTarget, ProbeSpec};

use serde_json::{json, Value};
use std::time::{Duration, Instant};

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// A received HTTP response, before any assertion is applied.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed JSON body; a non-JSON body is kept as a string, an empty one as null.
    pub body: Value,
    pub bytes: usize,
    pub elapsed: Duration,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outcome of an HTTP probe together with the body it was judged on.
#[derive(Debug, Clone)]
pub struct HttpExchange {
    pub outcome: Outcome,
    pub response: Option<HttpResponse>,
}

fn map_request_error(e: reqwest::Error, timeout: Duration) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout(timeout)
    } else {
        ProbeError::Connection(e.to_string())
    }
}

impl Prober {
    /// Resolve an endpoint against the base URL; absolute URLs pass through.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Issue one request and read the full body. No status check is applied.
    pub async fn fetch(&self, target: &HttpTarget, timeout: Duration) -> Result<HttpResponse, ProbeError> {
        let url = self.url_for(&target.endpoint);
        self.budget
            .guard(async {
                let mut request = self
                    .client
                    .request(target.method.into(), &url)
                    .timeout(timeout)
                    .query(&target.query);
                for (name, value) in &target.headers {
                    request = request.header(name.as_str(), value.as_str());
                }
                if let Some(payload) = &target.payload {
                    request = request.json(payload);
                }

                let start = Instant::now();
                let response = request.send().await.map_err(|e| map_request_error(e, timeout))?;
                let status = response.status().as_u16();

                // Read the full body so the timing covers the complete transfer
                let text = response.text().await.map_err(|e| map_request_error(e, timeout))?;
                let elapsed = start.elapsed();
                enforce_timeout(elapsed, timeout)?;

                let body = if text.trim().is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()))
                };

                Ok(HttpResponse {
                    status,
                    body,
                    bytes: text.len(),
                    elapsed,
                })
            })
            .await
    }

    /// Run an HTTP probe and evaluate its assertions.
    pub async fn exchange(&self, spec: &ProbeSpec, target: &HttpTarget) -> HttpExchange {
        let start = Instant::now();

        let response = match self.fetch(target, spec.timeout).await {
            Ok(response) => response,
            Err(e) => {
                return HttpExchange {
                    outcome: Outcome::failed(&spec.name, start.elapsed(), Value::Null, &e),
                    response: None,
                }
            }
        };

        let observed = json!({
            "status": response.status,
            "count": result_count(&response.body, CountSource::Results),
            "bytes": response.bytes,
        });

        let outcome = match evaluate_assertions(&spec.assertions, &response) {
            Ok(warnings) => {
                for warning in &warnings {
                    tracing::warn!("Probe {}: {}", spec.name, warning);
                }
                Outcome::passed(&spec.name, response.elapsed, observed, warnings)
            }
            Err(failure) => Outcome::failed(&spec.name, response.elapsed, observed, &failure.into()),
        };

        HttpExchange {
            outcome,
            response: Some(response),
        }
    }
}

/// Resolve a result count from the conventional list shapes.
pub fn result_count(body: &Value, source: CountSource) -> usize {
    source
        .pointers()
        .iter()
        .filter_map(|pointer| body.pointer(pointer).and_then(Value::as_array))
        .map(Vec::len)
        .find(|&n| n > 0)
        .unwrap_or(0)
}

/// First object of the first non-empty result list, or the body itself.
pub fn first_result(body: &Value) -> &Value {
    CountSource::Results
        .pointers()
        .iter()
        .filter_map(|pointer| body.pointer(pointer).and_then(Value::as_array))
        .find_map(|items| items.first())
        .unwrap_or(body)
}

/// Evaluate assertions in order: status, counts, fields, durations.
///
/// Returns the warnings raised by soft duration limits when everything else holds.
pub fn evaluate_assertions(
    assertions: &[Assertion],
    response: &HttpResponse,
) -> Result<Vec<String>, AssertionFailure> {
    let expected_status = assertions.iter().find_map(|a| match a {
        Assertion::StatusEquals(status) => Some(*status),
        _ => None,
    });
    match expected_status {
        Some(expected) if expected != response.status => {
            return Err(AssertionFailure::UnexpectedStatus {
                expected,
                actual: response.status,
            })
        }
        None if !response.is_success() => {
            return Err(AssertionFailure::Unsuccessful {
                actual: response.status,
            })
        }
        _ => {}
    }

    for assertion in assertions {
        if let Assertion::MinCount { min, source } = assertion {
            let count = result_count(&response.body, *source);
            if count < *min {
                return Err(AssertionFailure::TooFewResults {
                    expected: *min,
                    actual: count,
                    noun: source.noun(),
                });
            }
        }
    }

    for assertion in assertions {
        let missing: Vec<String> = match assertion {
            Assertion::FieldsPresent(fields) => {
                let text = response.body.to_string();
                fields.iter().filter(|f| !text.contains(f.as_str())).cloned().collect()
            }
            Assertion::FieldsPresentStrict(fields) => {
                let first = first_result(&response.body);
                fields
                    .iter()
                    .filter(|f| first.get(f.as_str()).is_none())
                    .cloned()
                    .collect()
            }
            _ => continue,
        };
        if !missing.is_empty() {
            return Err(AssertionFailure::MissingFields(missing));
        }
    }

    let mut warnings = Vec::new();
    for assertion in assertions {
        if let Assertion::MaxDuration(limit) = assertion {
            if response.elapsed > *limit {
                warnings.push(format!(
                    "response time {}ms exceeds target {}ms",
                    response.elapsed.as_millis(),
                    limit.as_millis()
                ));
            }
        }
    }

    Ok(warnings)
}
