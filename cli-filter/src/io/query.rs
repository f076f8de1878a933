//! Cluster-query collaborator.
//!
//! The [`ClusterQuery`] trait decouples the policy from the scheduler's query
//! commands. [`SlurmQuery`] spawns `scontrol`/`sinfo`; tests use scripted
//! queries that return canned reports without spawning processes.

use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::io::config::QueryConfig;
use crate::io::process::run_command;

/// Raw query result: report text plus exit status (`0` = success).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutput {
    pub text: String,
    pub status: i32,
}

impl QueryOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: 0,
        }
    }

    pub fn failed(status: i32) -> Self {
        Self {
            text: String::new(),
            status,
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }
}

pub trait ClusterQuery {
    /// Partition report for `partition`, or for every partition when `None`.
    fn partitions(&self, partition: Option<&str>) -> Result<QueryOutput>;

    /// Generic resources advertised by the nodes of `partition`.
    fn node_gres(&self, partition: &str) -> Result<QueryOutput>;
}

/// Query backed by the scheduler's command-line tools.
#[derive(Debug, Clone)]
pub struct SlurmQuery {
    config: QueryConfig,
}

impl SlurmQuery {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    fn run(&self, argv: &[String], extra: Option<&str>) -> Result<QueryOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("query command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(extra) = extra {
            cmd.arg(extra);
        }
        let output = run_command(cmd, self.config.timeout(), self.config.output_limit_bytes)
            .with_context(|| format!("run {program}"))?;
        let status = output.code();
        if status != 0 {
            warn!(
                program = %program,
                status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "query command failed"
            );
        }
        Ok(QueryOutput {
            text: output.stdout_lossy(),
            status,
        })
    }
}

impl ClusterQuery for SlurmQuery {
    #[instrument(skip(self))]
    fn partitions(&self, partition: Option<&str>) -> Result<QueryOutput> {
        debug!("querying partition report");
        self.run(&self.config.partition_command, partition)
    }

    #[instrument(skip(self))]
    fn node_gres(&self, partition: &str) -> Result<QueryOutput> {
        debug!("querying node generic resources");
        self.run(&self.config.node_gres_command, Some(partition))
    }
}
