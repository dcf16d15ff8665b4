//! Environment and dependency checks.

mod dependencies;
mod environment;
mod health;

pub use dependencies::*;
pub use environment::*;
pub use health::*;

use std::collections::HashMap;

/// Source of environment variable values.
///
/// Empty values are treated as unset.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;

    fn is_set(&self, name: &str) -> bool {
        self.var(name).is_some()
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_source_ignores_empty_values() {
        let env = HashMap::from([
            ("A".to_string(), "value".to_string()),
            ("B".to_string(), String::new()),
        ]);
        assert_eq!(env.var("A").as_deref(), Some("value"));
        assert!(!env.is_set("B"));
        assert!(!env.is_set("C"));
    }
}
