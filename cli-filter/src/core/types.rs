//! Shared deterministic types for the policy core.

use serde::Serialize;

/// Outcome of evaluating one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "message", rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    /// One-line, human-readable reason shown to the submitter.
    Rejected(String),
}

impl Decision {
    pub fn reject(message: impl Into<String>) -> Self {
        Decision::Rejected(message.into())
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted)
    }
}

/// How a partition is treated by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionClass {
    /// GPU-bearing partitions: CPU and memory follow the GPU request.
    Gpu,
    /// Pass-through partition, no policy applied.
    Acceptance,
    /// Everything else: memory defaults derived from the partition.
    General,
}
