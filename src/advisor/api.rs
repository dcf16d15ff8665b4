use serde_json::json;
use std::time::Duration;

use super::{Advisor, FixAction, IssueCategory};
use crate::catalog::HttpTarget;

const CATEGORY: IssueCategory = IssueCategory::ApiConnections;

impl Advisor<'_> {
    pub(super) async fn check_api_connections(&self, actions: &mut Vec<FixAction>) {
        let endpoints = &self.catalog.endpoints;

        let checks = [
            (
                "Internal API Health",
                HttpTarget::get(&endpoints.health),
                Duration::from_secs(3),
                "Restart the server process",
            ),
            (
                "Property Search API",
                HttpTarget::get(&endpoints.property_search)
                    .query("zipCode", "90210")
                    .query("limit", "1"),
                Duration::from_secs(10),
                "Check Attom API key configuration",
            ),
            (
                "Lien Analysis API",
                HttpTarget::post(
                    &endpoints.lien_analysis,
                    json!({ "address": "1209 Auld Ln", "zipCode": "90210" }),
                ),
                Duration::from_secs(5),
                "Verify lien analysis service configuration",
            ),
        ];

        for (issue, target, timeout, recommendation) in checks {
            let action = match self.fetch(target, timeout).await {
                Ok(response) if response.is_success() => FixAction::applied(
                    CATEGORY,
                    issue,
                    format!("Responding in {}ms", response.elapsed.as_millis()),
                ),
                Ok(response) => FixAction::failed(
                    CATEGORY,
                    issue,
                    format!("HTTP {}", response.status),
                    recommendation,
                ),
                Err(e) => FixAction::failed(CATEGORY, issue, e.to_string(), recommendation),
            };
            actions.push(action);
        }
    }
}
