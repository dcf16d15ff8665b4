//! Configuration module for platform-doctor.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Command line flags override whatever is loaded here.

use std::path::PathBuf;
use std::time::Duration;

use crate::checks::{EnvSource, ProcessEnv};
use crate::probe::RunBudget;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DoctorConfig {
    /// Base URL of the target service (default: "http://localhost:5000")
    pub base_url: String,
    /// Optional catalog file; the built-in catalog is used when unset
    pub catalog_path: Option<PathBuf>,
    /// Overall time budget for one run; unbounded when unset
    pub budget: Option<Duration>,
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            catalog_path: None,
            budget: None,
        }
    }
}

impl DoctorConfig {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `PLATFORM_DOCTOR_BASE_URL`: target base URL
    /// - `PLATFORM_DOCTOR_CATALOG`: path to a catalog JSON file
    /// - `PLATFORM_DOCTOR_BUDGET_SECS`: overall run budget in seconds
    pub fn load() -> Self {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(env: &dyn EnvSource) -> Self {
        let mut cfg = Self::default();

        if let Some(base_url) = env.var("PLATFORM_DOCTOR_BASE_URL") {
            cfg.base_url = base_url;
        }

        if let Some(path) = env.var("PLATFORM_DOCTOR_CATALOG") {
            cfg.catalog_path = Some(PathBuf::from(path));
        }

        if let Some(secs) = env.var("PLATFORM_DOCTOR_BUDGET_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => cfg.budget = Some(Duration::from_secs(secs)),
                _ => tracing::warn!("Ignoring invalid PLATFORM_DOCTOR_BUDGET_SECS: {}", secs),
            }
        }

        cfg
    }

    /// A fresh budget for one run, starting now.
    pub fn run_budget(&self) -> RunBudget {
        match self.budget {
            Some(limit) => RunBudget::with_limit(limit),
            None => RunBudget::unbounded(),
        }
    }
}
