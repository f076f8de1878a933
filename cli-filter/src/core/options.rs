//! Submission option record and the rules for "was this option requested?".

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Option names the policy reads or writes.
pub mod names {
    pub const PARTITION: &str = "partition";
    pub const EXCLUSIVE: &str = "exclusive";
    pub const MEM: &str = "mem";
    pub const MEM_PER_CPU: &str = "mem-per-cpu";
    pub const MEM_PER_GPU: &str = "mem-per-gpu";
    pub const CPUS_PER_TASK: &str = "cpus-per-task";
    pub const CPUS_PER_GPU: &str = "cpus-per-gpu";
    pub const CORES_PER_SOCKET: &str = "cores-per-socket";
    pub const GRES: &str = "gres";
    pub const GPUS: &str = "gpus";
    pub const GPUS_PER_NODE: &str = "gpus-per-node";
    pub const GPUS_PER_TASK: &str = "gpus-per-task";
    pub const THREADS_PER_CORE: &str = "threads-per-core";
    pub const TYPE: &str = "type";
}

/// A user's submission options, mutated in place by the policy engine.
///
/// Plugin options live in `spank`, keyed by plugin name and then option name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRecord {
    #[serde(flatten)]
    values: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    spank: BTreeMap<String, BTreeMap<String, String>>,
}

impl OptionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn set_spank(&mut self, plugin: &str, name: &str, value: impl Into<String>) {
        self.spank
            .entry(plugin.to_string())
            .or_default()
            .insert(name.to_string(), value.into());
    }

    /// Plugin options named `name`, across every plugin, as `(plugin, value)`.
    pub fn spank_option<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.spank.iter().filter_map(move |(plugin, options)| {
            options
                .get(name)
                .map(|value| (plugin.as_str(), value.as_str()))
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OptionRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            spank: BTreeMap::new(),
        }
    }
}

/// Per-option sets of values that mean "not requested".
///
/// Absence always means "not requested". On top of that every option uses the
/// default set unless it has an override, so a legitimate `"0"` can be kept
/// meaningful for the options that need it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelRules {
    pub default: BTreeSet<String>,
    pub overrides: BTreeMap<String, BTreeSet<String>>,
}

impl Default for SentinelRules {
    fn default() -> Self {
        Self {
            default: ["-2", "0", "unset"].into_iter().map(String::from).collect(),
            overrides: BTreeMap::new(),
        }
    }
}

impl SentinelRules {
    pub fn sentinels_for(&self, name: &str) -> &BTreeSet<String> {
        self.overrides.get(name).unwrap_or(&self.default)
    }

    pub fn is_unset(&self, name: &str, value: Option<&str>) -> bool {
        match value {
            None => true,
            Some(value) => self.sentinels_for(name).contains(value),
        }
    }

    /// The option's value when it counts as requested.
    pub fn requested<'a>(&self, options: &'a OptionRecord, name: &str) -> Option<&'a str> {
        let value = options.get(name);
        if self.is_unset(name, value) {
            None
        } else {
            value
        }
    }

    pub fn is_set(&self, options: &OptionRecord, name: &str) -> bool {
        self.requested(options, name).is_some()
    }

    pub fn any_set(&self, options: &OptionRecord, names: &[&str]) -> bool {
        names.iter().any(|name| self.is_set(options, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_default_sentinels_are_unset() {
        let rules = SentinelRules::default();
        let options: OptionRecord = [("mem", "-2"), ("gpus", "0"), ("exclusive", "unset")]
            .into_iter()
            .collect();
        assert!(!rules.is_set(&options, "mem"));
        assert!(!rules.is_set(&options, "gpus"));
        assert!(!rules.is_set(&options, "exclusive"));
        assert!(!rules.is_set(&options, "cpus-per-task"));
    }

    #[test]
    fn real_values_are_set() {
        let rules = SentinelRules::default();
        let options: OptionRecord = [("mem", "4G"), ("exclusive", "exclusive")]
            .into_iter()
            .collect();
        assert_eq!(rules.requested(&options, "mem"), Some("4G"));
        assert!(rules.any_set(&options, &["gpus", "exclusive"]));
    }

    #[test]
    fn overrides_replace_the_default_set() {
        let mut rules = SentinelRules::default();
        rules
            .overrides
            .insert("cores-per-socket".to_string(), BTreeSet::from(["-2".to_string()]));
        let options: OptionRecord = [("cores-per-socket", "0")].into_iter().collect();
        assert!(rules.is_set(&options, "cores-per-socket"));
    }

    #[test]
    fn spank_options_are_found_across_plugins() {
        let mut options = OptionRecord::new();
        options.set_spank("nvidia", "gpu-srange", "1200-1400");
        options.set_spank("other", "unrelated", "1");
        let found: Vec<_> = options.spank_option("gpu-srange").collect();
        assert_eq!(found, vec![("nvidia", "1200-1400")]);
    }

    #[test]
    fn json_shape_is_flat_with_nested_spank() {
        let options: OptionRecord = serde_json::from_str(
            r#"{"partition":"gpu","gpus":"1","spank":{"nvidia":{"gpu-power-cap":"300"}}}"#,
        )
        .expect("parse options");
        assert_eq!(options.get("partition"), Some("gpu"));
        assert_eq!(options.spank_option("gpu-power-cap").count(), 1);
        let back = serde_json::to_value(&options).expect("serialize");
        assert_eq!(back["gpus"], "1");
        assert_eq!(back["spank"]["nvidia"]["gpu-power-cap"], "300");
    }
}
