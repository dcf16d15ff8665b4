//! platform-doctor - diagnostics for the property platform service.
//!
//! Runs declarative HTTP and command probes against a running service, checks its
//! dependencies and environment, and aggregates the results into a scored report
//! with prioritized recommendations.

pub mod advisor;
pub mod catalog;
pub mod checks;
pub mod config;
pub mod diagnosis;
pub mod probe;
pub mod report;
pub mod suite;

#[cfg(test)]
mod testing;
