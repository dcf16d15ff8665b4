use std::time::Duration;

use super::{Advisor, FixAction, IssueCategory};
use crate::catalog::HttpTarget;
use crate::checks::fetch_health;

const CATEGORY: IssueCategory = IssueCategory::DatabaseIssues;

const MEMORY_LIMIT_MB: u64 = 200;
const FAST_QUERY_MS: u128 = 100;
const SLOW_QUERY_MS: u128 = 1000;

impl Advisor<'_> {
    pub(super) async fn check_database(&self, actions: &mut Vec<FixAction>) {
        match fetch_health(self.prober, &self.catalog.endpoints.health).await {
            Ok(reading) => {
                let payload = reading.payload;
                if payload.database_connected() {
                    actions.push(FixAction::applied(
                        CATEGORY,
                        "Database Connection",
                        "Verified connection is healthy",
                    ));
                } else {
                    actions.push(FixAction::failed(
                        CATEGORY,
                        "Database Connection",
                        format!("storage reports '{}'", payload.database().unwrap_or("unknown")),
                        "Check DATABASE_URL and that the database accepts connections",
                    ));
                }

                match payload.memory_mb() {
                    Some(mb) if mb > MEMORY_LIMIT_MB => actions.push(FixAction::recommended(
                        CATEGORY,
                        "High Memory Usage",
                        "Consider connection pool optimization",
                        format!("{}MB", mb),
                        "<150MB",
                    )),
                    Some(mb) => actions.push(FixAction::applied(
                        CATEGORY,
                        "Memory Usage",
                        format!("Memory usage is optimal at {}MB", mb),
                    )),
                    None => {}
                }
            }
            Err(e) => actions.push(FixAction::failed(
                CATEGORY,
                "Database Health Check",
                e.to_string(),
                "Restart the service and verify DATABASE_URL",
            )),
        }

        // Auth lookups hit the database; the status code is irrelevant here
        let target = HttpTarget::get(&self.catalog.endpoints.auth_user);
        match self.fetch(target, Duration::from_secs(3)).await {
            Ok(response) => {
                let ms = response.elapsed.as_millis();
                if ms > SLOW_QUERY_MS {
                    actions.push(FixAction::recommended(
                        CATEGORY,
                        "Slow Query Performance",
                        "Consider adding database indexes",
                        format!("{}ms", ms),
                        "<100ms",
                    ));
                } else if ms < FAST_QUERY_MS {
                    actions.push(FixAction::applied(
                        CATEGORY,
                        "Query Performance",
                        format!("Database queries responding in {}ms", ms),
                    ));
                } else {
                    actions.push(FixAction::applied(
                        CATEGORY,
                        "Query Performance",
                        format!("Query performance acceptable at {}ms", ms),
                    ));
                }
            }
            Err(e) => actions.push(FixAction::failed(
                CATEGORY,
                "Query Performance",
                e.to_string(),
                "Verify the service is accepting requests",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::FixStatus;
    use crate::catalog::Catalog;
    use crate::probe::{Prober, RunBudget};
    use crate::testing::{serve, FakePlatform};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_memory_and_connection_findings() {
        let base = serve(
            FakePlatform {
                health_status: 503,
                database: "error".to_string(),
                heap_mb: 260,
                ..Default::default()
            }
            .router(),
        )
        .await;
        let prober = Prober::direct(&base, RunBudget::unbounded()).unwrap();
        let catalog = Catalog::default();
        let env = HashMap::<String, String>::new();

        let report = Advisor::new(&prober, &catalog, &env).advise("databaseIssues").await.unwrap();
        let connection = &report.actions[0];
        assert_eq!(connection.status, FixStatus::Failed);
        assert_eq!(connection.detail, "storage reports 'error'");

        let memory = &report.actions[1];
        assert_eq!(memory.status, FixStatus::Recommended);
        assert_eq!(memory.current.as_deref(), Some("260MB"));
        assert_eq!(memory.target.as_deref(), Some("<150MB"));

        assert_eq!(report.actions[2].issue, "Query Performance");
        assert_eq!(report.actions[2].status, FixStatus::Applied);
    }
}
