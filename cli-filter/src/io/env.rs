//! Environment lookup capability.
//!
//! The policy reads the partition override and debug level through this trait
//! so tests can substitute a fixed map instead of touching process state.

use std::collections::BTreeMap;

pub trait Environment {
    fn var(&self, name: &str) -> Option<String>;

    /// Variable value, treating an empty string as unset.
    fn non_empty(&self, name: &str) -> Option<String> {
        self.var(name).filter(|value| !value.trim().is_empty())
    }
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed environment, used by tests and by callers that capture variables up front.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }
}

impl Environment for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Parse a debug-level variable; only values greater than zero enable debug output.
pub fn debug_enabled<E: Environment + ?Sized>(env: &E, name: &str) -> bool {
    env.var(name)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .is_some_and(|level| level > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_not_set() {
        let env = MapEnv::new().with("SLURM_JOB_PARTITION", "");
        assert_eq!(env.non_empty("SLURM_JOB_PARTITION"), None);
        assert_eq!(env.var("SLURM_JOB_PARTITION"), Some(String::new()));
    }

    #[test]
    fn debug_requires_positive_number() {
        let name = "SLURM_CLI_FILTER_DEBUG";
        assert!(!debug_enabled(&MapEnv::new(), name));
        assert!(!debug_enabled(&MapEnv::new().with(name, "0"), name));
        assert!(!debug_enabled(&MapEnv::new().with(name, "yes"), name));
        assert!(!debug_enabled(&MapEnv::new().with(name, "-1"), name));
        assert!(debug_enabled(&MapEnv::new().with(name, "1"), name));
        assert!(debug_enabled(&MapEnv::new().with(name, " 2 "), name));
    }
}
