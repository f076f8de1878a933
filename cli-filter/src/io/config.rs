//! Filter configuration, read from a TOML file (default `/etc/slurm/cli_filter.toml`).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::options::SentinelRules;
use crate::core::types::PartitionClass;
use crate::core::units::to_mebibytes;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/slurm/cli_filter.toml";
/// Overrides [`DEFAULT_CONFIG_PATH`] when set.
pub const CONFIG_PATH_ENV: &str = "CLI_FILTER_CONFIG";

/// Filter configuration (TOML).
///
/// Missing fields fall back to the site defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilterConfig {
    /// Partitions whose CPU and memory allocation is driven by GPU requests.
    pub gpu_partitions: BTreeSet<String>,

    /// Pass-through partition that bypasses the policy entirely.
    pub acceptance_partition: String,

    /// GPUs per node on GPU partitions, granted in full to exclusive jobs.
    pub gpus_per_node: u64,

    /// Hard ceiling for node-local temporary storage requests (e.g. `3500G`).
    pub tmp_ceiling: String,

    /// Plugin options only allowed on exclusive GPU allocations.
    pub gated_plugin_options: Vec<String>,

    /// Partition override; presence also marks a step launched inside an allocation.
    pub partition_env: String,

    /// Debug level variable; values above zero enable informational logging.
    pub debug_env: String,

    /// Value of `mem` that asks for all memory on the node.
    pub all_node_memory: String,

    pub sentinels: SentinelRules,

    /// Options applied by `setup-defaults` unless the user already set them.
    pub defaults: BTreeMap<String, String>,

    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueryConfig {
    /// Partition report command; the partition name is appended when scoped.
    pub partition_command: Vec<String>,

    /// Node generic-resource command; the partition name is appended.
    pub node_gres_command: Vec<String>,

    /// Optional wall-clock bound per query. Unset waits for the command to finish.
    pub timeout_secs: Option<u64>,

    /// Truncate query stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            partition_command: ["scontrol", "--oneliner", "show", "partition"]
                .into_iter()
                .map(String::from)
                .collect(),
            node_gres_command: ["sinfo", "--noheader", "--format=%G", "--partition"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeout_secs: None,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            gpu_partitions: BTreeSet::from(["gpu".to_string()]),
            acceptance_partition: "acceptance".to_string(),
            gpus_per_node: 8,
            tmp_ceiling: "3500G".to_string(),
            gated_plugin_options: vec!["gpu-srange".to_string(), "gpu-power-cap".to_string()],
            partition_env: "SLURM_JOB_PARTITION".to_string(),
            debug_env: "SLURM_CLI_FILTER_DEBUG".to_string(),
            all_node_memory: "0?".to_string(),
            sentinels: SentinelRules::default(),
            defaults: BTreeMap::from([("threads-per-core".to_string(), "1".to_string())]),
            query: QueryConfig::default(),
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.gpus_per_node == 0 {
            return Err(anyhow!("gpus_per_node must be > 0"));
        }
        if to_mebibytes(self.tmp_ceiling.as_str()).is_none() {
            return Err(anyhow!(
                "tmp_ceiling must be a size such as 3500G (got {:?})",
                self.tmp_ceiling
            ));
        }
        if self.partition_env.trim().is_empty() {
            return Err(anyhow!("partition_env must be non-empty"));
        }
        if self.query.output_limit_bytes == 0 {
            return Err(anyhow!("query.output_limit_bytes must be > 0"));
        }
        if self.query.timeout_secs == Some(0) {
            return Err(anyhow!("query.timeout_secs must be > 0 when set"));
        }
        for (label, command) in [
            ("query.partition_command", &self.query.partition_command),
            ("query.node_gres_command", &self.query.node_gres_command),
        ] {
            if command.is_empty() || command[0].trim().is_empty() {
                return Err(anyhow!("{label} must be a non-empty array"));
            }
        }
        Ok(())
    }

    /// Ceiling for temporary storage, in mebibytes.
    pub fn tmp_ceiling_mib(&self) -> f64 {
        to_mebibytes(self.tmp_ceiling.as_str()).unwrap_or(0.0)
    }

    pub fn classify(&self, partition: Option<&str>) -> PartitionClass {
        match partition {
            Some(name) if self.gpu_partitions.contains(name) => PartitionClass::Gpu,
            Some(name) if name == self.acceptance_partition => PartitionClass::Acceptance,
            _ => PartitionClass::General,
        }
    }
}

/// Resolve the config path: explicit flag, then `CLI_FILTER_CONFIG`, then the default.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FilterConfig::default()`.
pub fn load_config(path: &Path) -> Result<FilterConfig> {
    if !path.exists() {
        let cfg = FilterConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FilterConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
