//! Test-only collaborators and canned cluster reports.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::io::query::{ClusterQuery, QueryOutput};
use crate::logging::Logger;

/// General-class partition: 920 MiB per CPU, 2048 CPUs over 8 nodes.
pub const CPU_PARTITION_LINE: &str = "PartitionName=cpu AllowGroups=ALL Default=YES \
    DefMemPerCPU=920 JobDefaults=(null) MaxMemPerNode=UNLIMITED State=UP \
    TotalCPUs=2048 TotalNodes=8 TRES=cpu=2048,mem=1840000M,node=8,billing=2048 \
    TRESBillingWeights=CPU=1.0";

/// GPU-class partition: 512 CPUs and 32 GPUs, 64 GiB default memory per GPU.
pub const GPU_PARTITION_LINE: &str = "PartitionName=gpu AllowGroups=ALL Default=NO \
    DefMemPerCPU=0 JobDefaults=DefMemPerGPU=65536 State=UP TotalCPUs=512 TotalNodes=4 \
    TRES=cpu=512,mem=2000G,node=4,billing=512,gres/gpu=32 TRESBillingWeights=CPU=1.0,GRES/gpu=16";

pub const GPU_NODE_GRES: &str = "gpu:8(S:0-7),tmp:3500G\n";

/// Scripted [`ClusterQuery`] that records every call it receives.
#[derive(Debug, Default)]
pub struct FakeQuery {
    partitions: BTreeMap<String, QueryOutput>,
    listing: Option<QueryOutput>,
    node_gres: BTreeMap<String, QueryOutput>,
    unreachable: bool,
    calls: RefCell<Vec<String>>,
}

impl FakeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster with the canned `cpu` and `gpu` partitions; `cpu` is the default.
    pub fn standard() -> Self {
        Self::new()
            .with_partition("cpu", CPU_PARTITION_LINE)
            .with_partition("gpu", GPU_PARTITION_LINE)
            .with_listing(&format!("{CPU_PARTITION_LINE}\n{GPU_PARTITION_LINE}\n"))
            .with_node_gres("gpu", GPU_NODE_GRES)
            .with_node_gres("cpu", "(null)\n")
    }

    pub fn with_partition(mut self, name: &str, line: &str) -> Self {
        self.partitions
            .insert(name.to_string(), QueryOutput::ok(format!("{line}\n")));
        self
    }

    pub fn with_partition_status(mut self, name: &str, status: i32) -> Self {
        self.partitions
            .insert(name.to_string(), QueryOutput::failed(status));
        self
    }

    pub fn with_listing(mut self, text: &str) -> Self {
        self.listing = Some(QueryOutput::ok(text));
        self
    }

    pub fn with_node_gres(mut self, partition: &str, text: &str) -> Self {
        self.node_gres
            .insert(partition.to_string(), QueryOutput::ok(text));
        self
    }

    pub fn with_node_gres_status(mut self, partition: &str, status: i32) -> Self {
        self.node_gres
            .insert(partition.to_string(), QueryOutput::failed(status));
        self
    }

    /// Every query fails to run, as if the commands were missing.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Calls received so far, e.g. `partitions(gpu)` or `node_gres(gpu)`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ClusterQuery for FakeQuery {
    fn partitions(&self, partition: Option<&str>) -> Result<QueryOutput> {
        self.calls
            .borrow_mut()
            .push(format!("partitions({})", partition.unwrap_or("*")));
        if self.unreachable {
            return Err(anyhow!("spawn scontrol: not found"));
        }
        let output = match partition {
            Some(name) => self.partitions.get(name).cloned(),
            None => self.listing.clone(),
        };
        Ok(output.unwrap_or_else(|| QueryOutput::failed(1)))
    }

    fn node_gres(&self, partition: &str) -> Result<QueryOutput> {
        self.calls
            .borrow_mut()
            .push(format!("node_gres({partition})"));
        if self.unreachable {
            return Err(anyhow!("spawn sinfo: not found"));
        }
        Ok(self
            .node_gres
            .get(partition)
            .cloned()
            .unwrap_or_else(|| QueryOutput::failed(1)))
    }
}

/// Logger that keeps messages for assertions.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    errors: RefCell<Vec<String>>,
    infos: RefCell<Vec<String>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.borrow().clone()
    }
}

impl Logger for RecordingLogger {
    fn error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }

    fn info(&self, message: &str) {
        self.infos.borrow_mut().push(message.to_string());
    }
}

/// Temporary directory holding a `cli_filter.toml` and optional report fixtures.
pub struct ConfigDir {
    dir: tempfile::TempDir,
}

impl ConfigDir {
    pub fn new(config_toml: &str) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("cli_filter.toml"), config_toml)?;
        Ok(Self { dir })
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("cli_filter.toml")
    }

    /// Write a fixture file next to the config and return its path.
    pub fn write_fixture(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}
