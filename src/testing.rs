//! In-process stand-in for the target service, used by tests.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, options, post},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Knobs for the fake service's behaviour.
#[derive(Debug, Clone)]
pub struct FakePlatform {
    pub properties: usize,
    pub foreclosures: usize,
    pub appraisal_ok: bool,
    pub lien_ok: bool,
    pub track_available: bool,
    /// Whether listings carry a non-null `estimatedValue`.
    pub complete_listings: bool,
    /// Status the health endpoint answers with; the payload is sent regardless.
    pub health_status: u16,
    pub database: String,
    pub heap_mb: u64,
    pub uptime_secs: f64,
    pub runtime_version: String,
    /// Delay applied to feature endpoints, not to health.
    pub delay_ms: u64,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            properties: 5,
            foreclosures: 3,
            appraisal_ok: true,
            lien_ok: true,
            track_available: true,
            complete_listings: true,
            health_status: 200,
            database: "connected".to_string(),
            heap_mb: 120,
            uptime_secs: 3600.0,
            runtime_version: "v20.18.1".to_string(),
            delay_ms: 0,
        }
    }
}

type Shared = State<Arc<FakePlatform>>;

impl FakePlatform {
    pub fn router(self) -> Router {
        Router::new()
            .route("/api/v3/debug/health", get(health))
            .route("/api/properties", get(properties))
            .route("/api/properties/search", get(properties))
            .route("/api/v1/properties/search", post(properties))
            .route("/api/properties/{id}", get(property_detail))
            .route("/api/properties/appraise", post(appraise))
            .route("/api/properties/lien-analysis", post(lien_analysis))
            .route("/api/foreclosures", get(foreclosures))
            .route("/api/foreclosures/track", options(track))
            .route("/api/auth/user", get(|| async { StatusCode::UNAUTHORIZED }))
            .route("/external/keyed", get(keyed_external))
            .route("/external/broken", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .with_state(Arc::new(self))
    }

    async fn pause(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn limited(total: usize, query: &HashMap<String, String>) -> usize {
    query
        .get("limit")
        .and_then(|l| l.parse().ok())
        .map_or(total, |limit: usize| total.min(limit))
}

async fn health(State(fake): Shared) -> impl IntoResponse {
    let status = StatusCode::from_u16(fake.health_status).unwrap();
    let status_text = if status.is_success() { "healthy" } else { "degraded" };
    (status, Json(json!({
        "status": status_text,
        "services": { "database": fake.database },
        "performance": {
            "uptime": fake.uptime_secs,
            "memoryUsage": { "heapUsed": (fake.heap_mb * 1024 * 1024) as f64 },
            "nodeVersion": fake.runtime_version,
        }
    })))
}

async fn properties(State(fake): Shared, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    fake.pause().await;
    let items: Vec<Value> = (0..limited(fake.properties, &query))
        .map(|i| json!({ "id": i, "address": format!("{} Rodeo Dr", i + 100), "price": 500_000 }))
        .collect();
    Json(json!({ "properties": items }))
}

async fn property_detail(State(fake): Shared) -> Json<Value> {
    fake.pause().await;
    Json(json!({ "property": { "id": 111904, "address": "1209 Auld Ln" } }))
}

async fn appraise(State(fake): Shared) -> impl IntoResponse {
    fake.pause().await;
    if !fake.appraisal_ok {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "valuation failed" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "estimatedValue": 1_250_000,
            "propertyAddress": "1209 Auld Ln",
            "appraisal": { "marketValue": 1_250_000, "comparables": [] }
        })),
    )
}

async fn lien_analysis(State(fake): Shared) -> impl IntoResponse {
    fake.pause().await;
    if !fake.lien_ok {
        return (StatusCode::BAD_GATEWAY, Json(json!({ "error": "records unavailable" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "analysis": { "liens": [] }, "riskAssessment": "low" })),
    )
}

async fn foreclosures(State(fake): Shared, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    fake.pause().await;
    let items: Vec<Value> = (0..limited(fake.foreclosures, &query))
        .map(|i| {
            json!({
                "id": format!("fc-{}", i),
                "address": format!("{} Palm Ave", i + 1),
                "estimatedValue": if fake.complete_listings { json!(450_000) } else { Value::Null },
            })
        })
        .collect();
    Json(json!({ "foreclosures": items }))
}

async fn track(State(fake): Shared) -> StatusCode {
    if fake.track_available {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn keyed_external(headers: HeaderMap) -> impl IntoResponse {
    if headers.contains_key("x-api-key") {
        (StatusCode::OK, Json(json!({ "ok": true })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "missing key" })))
    }
}
