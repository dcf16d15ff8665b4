//! Health score and level.

use serde::Serialize;

/// Percentage of operational features, rounded. No features scores zero.
pub fn health_score(operational: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (operational.min(total) as f64 / total as f64) * 100.0;
    pct.round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl HealthLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => HealthLevel::Excellent,
            75..=89 => HealthLevel::Good,
            50..=74 => HealthLevel::Fair,
            _ => HealthLevel::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLevel::Excellent => "excellent",
            HealthLevel::Good => "good",
            HealthLevel::Fair => "fair",
            HealthLevel::Poor => "poor",
        }
    }
}

impl std::fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
