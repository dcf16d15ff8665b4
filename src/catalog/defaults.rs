//! Built-in check definitions for the property platform.

use super::models::*;

use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

fn common_errors(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn min_results(min: usize) -> Assertion {
    Assertion::MinCount {
        min,
        source: CountSource::Results,
    }
}

/// Feature suites run by `test` and `full`.
pub fn default_features() -> Vec<FeatureSuite> {
    vec![
        FeatureSuite {
            name: "propertyIntelligence".to_string(),
            description: "Property search and detail lookup".to_string(),
            probes: vec![
                ProbeSpec::http(
                    "US Property Search (Beverly Hills)",
                    HttpTarget::get("/api/properties").query("zipCode", "90210"),
                )
                .timeout_ms(30_000)
                .expect(min_results(1000)),
                ProbeSpec::http(
                    "International Property Search (Berlin)",
                    HttpTarget::post(
                        "/api/v1/properties/search",
                        json!({
                            "country": "DE",
                            "region": "Berlin",
                            "minPrice": 200000,
                            "currency": "EUR"
                        }),
                    ),
                )
                .expect(min_results(10)),
                ProbeSpec::http("Property Detail Lookup", HttpTarget::get("/api/properties/111904"))
                    .timeout_ms(5_000),
                ProbeSpec::http(
                    "Advanced Property Search",
                    HttpTarget::get("/api/properties/search")
                        .query("zipCode", "33460")
                        .query("minPrice", "100000")
                        .query("maxPrice", "500000"),
                )
                .timeout_ms(20_000)
                .expect(min_results(50)),
            ],
            common_errors: common_errors(&[
                ("timeout", "Reduce the search radius or check upstream API rate limits"),
                ("no_results", "Verify property data API keys and that the ZIP code has coverage"),
                ("invalid_input", "Use a valid 5-digit US ZIP code"),
                ("api_error", "Check server logs for the failing property route"),
            ]),
        },
        FeatureSuite {
            name: "aiAppraisal".to_string(),
            description: "AI property valuation".to_string(),
            probes: vec![ProbeSpec::http(
                "AI Property Appraisal",
                HttpTarget::post(
                    "/api/properties/appraise",
                    json!({
                        "address": "1209 Auld Ln",
                        "zipCode": "90210",
                        "sqft": 2500,
                        "bedrooms": 4,
                        "bathrooms": 3
                    }),
                ),
            )
            .expect(Assertion::FieldsPresent(vec![
                "appraisal".to_string(),
                "marketValue".to_string(),
                "comparables".to_string(),
            ]))],
            common_errors: common_errors(&[
                ("timeout", "Check the valuation model provider latency"),
                ("api_error", "Verify the appraisal service credentials"),
            ]),
        },
        FeatureSuite {
            name: "foreclosureSystem".to_string(),
            description: "Foreclosure listing and data structure".to_string(),
            probes: vec![
                ProbeSpec::http(
                    "Foreclosure Property Search",
                    HttpTarget::get("/api/foreclosures")
                        .query("region", "California")
                        .query("zipCode", "90210"),
                )
                .timeout_ms(15_000)
                .expect(min_results(10)),
                ProbeSpec::http(
                    "Foreclosure Data Structure",
                    HttpTarget::get("/api/foreclosures")
                        .query("zipCode", "90210")
                        .query("limit", "3"),
                )
                .timeout_ms(20_000)
                .expect(Assertion::StatusEquals(200))
                .expect(Assertion::MinCount {
                    min: 1,
                    source: CountSource::Listings,
                })
                .expect(Assertion::FieldsPresentStrict(vec![
                    "address".to_string(),
                    "id".to_string(),
                    "estimatedValue".to_string(),
                ]))
                .expect(Assertion::MaxDuration(Duration::from_millis(10_000))),
            ],
            common_errors: common_errors(&[
                ("timeout", "Foreclosure sources are slow; lower the result limit"),
                ("no_results", "Check foreclosure data provider keys and regional coverage"),
                ("api_error", "Restart the server and inspect foreclosure route logs"),
            ]),
        },
        FeatureSuite {
            name: "lienAnalysis".to_string(),
            description: "Lien and title risk analysis".to_string(),
            probes: vec![ProbeSpec::http(
                "Lien Analysis",
                HttpTarget::post(
                    "/api/properties/lien-analysis",
                    json!({ "address": "1209 Auld Ln", "zipCode": "90210" }),
                ),
            )
            .timeout_ms(6_000)
            .expect(Assertion::StatusEquals(200))],
            common_errors: common_errors(&[(
                "api_error",
                "Verify lien analysis service configuration",
            )]),
        },
    ]
}

/// Fixed battery of third-party APIs checked by the dependency checker.
pub fn default_external_apis() -> Vec<ExternalApiSpec> {
    vec![
        ExternalApiSpec {
            name: "Attom Data API".to_string(),
            url: "https://api.attomdata.com/propertyapi/v1.0.0/property/address?address1=1%20Rosedale&locality=Beverly%20Hills&division=CA".to_string(),
            credential_var: "ATTOM_API_KEY".to_string(),
            credential_header: "apikey".to_string(),
            headers: BTreeMap::from([("Accept".to_string(), "application/json".to_string())]),
        },
        ExternalApiSpec {
            name: "RapidAPI Property Service".to_string(),
            url: "https://realty-mole-property-api.p.rapidapi.com/properties?address=1%20Rosedale%2C%20Beverly%20Hills%2C%20CA".to_string(),
            credential_var: "RAPIDAPI_KEY".to_string(),
            credential_header: "X-RapidAPI-Key".to_string(),
            headers: BTreeMap::from([(
                "X-RapidAPI-Host".to_string(),
                "realty-mole-property-api.p.rapidapi.com".to_string(),
            )]),
        },
    ]
}

pub fn default_environment() -> EnvCatalog {
    let required = |name: &str, description: &str, critical: bool| RequiredVar {
        name: name.to_string(),
        description: description.to_string(),
        critical,
    };
    let optional = |name: &str, description: &str, sensitive: bool, expected: Option<&str>| OptionalVar {
        name: name.to_string(),
        description: description.to_string(),
        sensitive,
        expected: expected.map(str::to_string),
    };

    EnvCatalog {
        required: vec![
            required("DATABASE_URL", "PostgreSQL connection string", true),
            required("ATTOM_API_KEY", "Attom Data API access key", true),
            required("RAPIDAPI_KEY", "Primary RapidAPI subscription key", true),
            required("RAPIDAPI_KEY_2", "Backup RapidAPI subscription key", false),
            required("GEODB_API_KEY", "GeoDB Cities API key", false),
        ],
        optional: vec![
            optional("NODE_ENV", "Runtime environment", false, Some("development")),
            optional("SESSION_SECRET", "Session encryption key", true, None),
            optional("REPLIT_DOMAINS", "Allowed domains for authentication", false, None),
            optional("ISSUER_URL", "OAuth issuer URL", false, None),
        ],
        security: SecurityVars {
            api_keys: vec!["ATTOM_API_KEY".to_string(), "RAPIDAPI_KEY".to_string()],
            connection_string: "DATABASE_URL".to_string(),
            runtime_mode: "NODE_ENV".to_string(),
        },
    }
}

/// Feature probes run by the diagnosis, built against the configured endpoints.
pub fn curated_checks(endpoints: &Endpoints) -> Vec<FeatureCheck> {
    let fields = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let sample_address = json!({ "address": "1209 Auld Ln", "zipCode": "90210" });

    vec![
        FeatureCheck {
            feature: "propertySearch".to_string(),
            probe: ProbeSpec::http(
                "Property Search",
                HttpTarget::get(&endpoints.property_search)
                    .query("zipCode", "90210")
                    .query("limit", "5"),
            )
            .timeout_ms(10_000),
            result_fields: fields(&["properties"]),
        },
        FeatureCheck {
            feature: "aiAppraisal".to_string(),
            probe: ProbeSpec::http(
                "AI Appraisal",
                HttpTarget::post(&endpoints.appraisal, sample_address.clone()),
            )
            .timeout_ms(8_000),
            result_fields: fields(&["estimatedValue", "propertyAddress", "appraisal"]),
        },
        FeatureCheck {
            feature: "foreclosureListing".to_string(),
            probe: ProbeSpec::http(
                "Foreclosure Listing",
                HttpTarget::get(&endpoints.foreclosures)
                    .query("zipCode", "90210")
                    .query("limit", "3"),
            )
            .timeout_ms(8_000),
            result_fields: fields(&["foreclosures"]),
        },
        FeatureCheck {
            feature: "lienAnalysis".to_string(),
            probe: ProbeSpec::http(
                "Lien Analysis",
                HttpTarget::post(&endpoints.lien_analysis, sample_address),
            )
            .timeout_ms(6_000),
            result_fields: fields(&["analysis", "riskAssessment"]),
        },
    ]
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            features: default_features(),
            external_apis: default_external_apis(),
            command_dependencies: Vec::new(),
            environment: default_environment(),
            endpoints: Endpoints::default(),
            expected_runtime_version: Some("v20.18.1".to_string()),
        }
    }
}
