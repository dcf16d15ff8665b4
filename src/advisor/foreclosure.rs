use serde_json::Value;
use std::time::Duration;

use super::{Advisor, FixAction, IssueCategory};
use crate::catalog::{CountSource, HttpMethod, HttpTarget};
use crate::probe::result_count;

const CATEGORY: IssueCategory = IssueCategory::ForeclosureSystem;

const REQUIRED_FIELDS: [&str; 3] = ["address", "id", "estimatedValue"];
const FAST_LISTING_MS: u128 = 5_000;
const SLOW_LISTING_MS: u128 = 15_000;

/// Null, empty, false and zero all count as missing.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

impl Advisor<'_> {
    pub(super) async fn check_foreclosure_system(&self, actions: &mut Vec<FixAction>) {
        let endpoints = &self.catalog.endpoints;

        let listing = HttpTarget::get(&endpoints.foreclosures)
            .query("zipCode", "90210")
            .query("limit", "3");
        match self.fetch(listing, Duration::from_secs(10)).await {
            Ok(response) => {
                let ms = response.elapsed.as_millis();
                if response.is_success() {
                    let count = result_count(&response.body, CountSource::Listings);
                    actions.push(FixAction::applied(
                        CATEGORY,
                        "API Connectivity",
                        format!("Foreclosure API responding in {}ms with {} results", ms, count),
                    ));
                    if count > 0 {
                        actions.push(self.listing_structure(&response.body["foreclosures"][0]));
                    }
                } else {
                    actions.push(FixAction::failed(
                        CATEGORY,
                        "API Connectivity",
                        format!("HTTP {}", response.status),
                        "Check foreclosure API configuration and authentication",
                    ));
                }
                actions.push(listing_latency(ms));
            }
            Err(e) => actions.push(FixAction::failed(
                CATEGORY,
                "API Connectivity",
                e.to_string(),
                "Check foreclosure API configuration and authentication",
            )),
        }

        let secondary = HttpTarget::get(&endpoints.foreclosures)
            .query("zipCode", "33460")
            .query("limit", "1");
        let coverage = match self.fetch(secondary, Duration::from_secs(8)).await {
            Ok(response) if response.is_success() => {
                if result_count(&response.body, CountSource::Listings) > 0 {
                    Ok(())
                } else {
                    Err("No listings in secondary market".to_string())
                }
            }
            Ok(response) => Err(format!("Secondary market returned HTTP {}", response.status)),
            Err(e) => Err(e.to_string()),
        };
        actions.push(match coverage {
            Ok(()) => FixAction::applied(
                CATEGORY,
                "Data Availability",
                "Foreclosure data available across multiple markets",
            ),
            Err(current) => FixAction::recommended(
                CATEGORY,
                "Data Coverage",
                "Verify foreclosure data availability across different markets",
                current,
                "Full market coverage",
            ),
        });

        // OPTIONS keeps the tracking check free of side effects
        let track = HttpTarget::get(&endpoints.foreclosure_track).with_method(HttpMethod::Options);
        actions.push(match self.fetch(track, Duration::from_secs(5)).await {
            Ok(response) if response.status != 404 && response.status < 500 => FixAction::applied(
                CATEGORY,
                "Tracking System",
                format!("Tracking endpoint available (HTTP {})", response.status),
            ),
            Ok(response) => FixAction::recommended(
                CATEGORY,
                "Tracking System",
                "Implement or fix the foreclosure tracking endpoint",
                format!("HTTP {}", response.status),
                "Operational tracking system",
            ),
            Err(_) => FixAction::recommended(
                CATEGORY,
                "Tracking System",
                "Implement foreclosure tracking functionality",
                "Endpoint not available",
                "Full tracking capabilities",
            ),
        });

        self.emergency_preparedness(actions);
    }

    fn listing_structure(&self, first: &Value) -> FixAction {
        let missing: Vec<&str> = REQUIRED_FIELDS
            .into_iter()
            .filter(|field| is_blank(first.get(*field)))
            .collect();
        if missing.is_empty() {
            FixAction::applied(
                CATEGORY,
                "Data Structure",
                "All required fields present in foreclosure data",
            )
        } else {
            FixAction::recommended(
                CATEGORY,
                "Missing Data Fields",
                format!("Update foreclosure data mapping for fields: {}", missing.join(", ")),
                format!("Missing: {}", missing.join(", ")),
                "Complete data structure",
            )
        }
    }

    fn emergency_preparedness(&self, actions: &mut Vec<FixAction>) {
        let security = &self.catalog.environment.security;
        let checks = [
            ("Database backup capability", self.env.is_set(&security.connection_string)),
            (
                "API fallback configuration",
                self.env.is_set("RAPIDAPI_KEY_2") || self.env.is_set("ATTOM_API_KEY"),
            ),
            // Logs always go to stderr through tracing
            ("Error logging system", true),
        ];

        for (name, available) in checks {
            actions.push(if available {
                FixAction::applied(CATEGORY, "Emergency Protocol", format!("{} verified", name))
            } else {
                FixAction::recommended(
                    CATEGORY,
                    "Emergency Protocol",
                    format!("Configure {}", name.to_lowercase()),
                    "Not configured",
                    "Full emergency preparedness",
                )
            });
        }
    }
}

fn listing_latency(ms: u128) -> FixAction {
    if ms > SLOW_LISTING_MS {
        FixAction::recommended(
            CATEGORY,
            "Performance",
            "Optimize foreclosure API response time",
            format!("{}ms", ms),
            "<10000ms",
        )
    } else if ms < FAST_LISTING_MS {
        FixAction::applied(
            CATEGORY,
            "Performance",
            format!("Foreclosure API performance excellent: {}ms", ms),
        )
    } else {
        FixAction::applied(
            CATEGORY,
            "Performance",
            format!("Foreclosure API performance acceptable: {}ms", ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::FixStatus;
    use crate::catalog::Catalog;
    use crate::probe::{Prober, RunBudget};
    use crate::testing::{serve, FakePlatform};
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_blank_values() {
        let listing = json!({ "id": 0, "address": "", "estimatedValue": 1, "flag": false });
        assert!(is_blank(listing.get("id")));
        assert!(is_blank(listing.get("address")));
        assert!(is_blank(listing.get("flag")));
        assert!(is_blank(listing.get("missing")));
        assert!(!is_blank(listing.get("estimatedValue")));
    }

    #[test]
    fn test_latency_thresholds() {
        assert_eq!(listing_latency(1_200).status, FixStatus::Applied);
        assert!(listing_latency(9_000).detail.contains("acceptable"));
        let slow = listing_latency(16_000);
        assert_eq!(slow.status, FixStatus::Recommended);
        assert_eq!(slow.target.as_deref(), Some("<10000ms"));
    }

    #[tokio::test]
    async fn test_incomplete_listings_and_missing_tracking() {
        let base = serve(
            FakePlatform {
                complete_listings: false,
                track_available: false,
                ..Default::default()
            }
            .router(),
        )
        .await;
        let prober = Prober::direct(&base, RunBudget::unbounded()).unwrap();
        let catalog = Catalog::default();
        let env = HashMap::<String, String>::new();

        let report = Advisor::new(&prober, &catalog, &env)
            .advise("foreclosureSystem")
            .await
            .unwrap();

        let fields = report.actions.iter().find(|a| a.issue == "Missing Data Fields").unwrap();
        assert_eq!(fields.current.as_deref(), Some("Missing: estimatedValue"));

        let tracking = report.actions.iter().find(|a| a.issue == "Tracking System").unwrap();
        assert_eq!(tracking.status, FixStatus::Recommended);
        assert_eq!(tracking.current.as_deref(), Some("HTTP 404"));

        // Storage URL and fallback key are unset; logging is always available
        let emergency: Vec<_> = report
            .actions
            .iter()
            .filter(|a| a.issue == "Emergency Protocol")
            .map(|a| a.status)
            .collect();
        assert_eq!(
            emergency,
            vec![FixStatus::Recommended, FixStatus::Recommended, FixStatus::Applied]
        );
        assert_eq!(report.failed, 0);
    }
}
