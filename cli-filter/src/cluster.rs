//! Cluster-state accessors: run a query and hand its text to the matching parser.
//!
//! Failed queries are treated as "no information" and never retried.

use tracing::{debug, warn};

use crate::core::gres::{NodeGres, parse_node_gres};
use crate::core::partition::{PartitionInfo, parse_partition_line, parse_partition_listing};
use crate::io::env::Environment;
use crate::io::query::{ClusterQuery, QueryOutput};

/// Attributes of `partition`, or `None` when it is empty or the query fails.
pub fn get_partition_info<Q: ClusterQuery + ?Sized>(
    query: &Q,
    partition: &str,
) -> Option<PartitionInfo> {
    if partition.is_empty() {
        return None;
    }
    let output = successful(query.partitions(Some(partition)), "partition")?;
    parse_partition_line(&output.text)
}

/// Partition from the `partition_env` override, else the partition flagged
/// `Default=YES` in an unscoped listing.
pub fn get_default_partition_or_env<Q, E>(query: &Q, env: &E, partition_env: &str) -> Option<String>
where
    Q: ClusterQuery + ?Sized,
    E: Environment + ?Sized,
{
    if let Some(partition) = env.non_empty(partition_env) {
        debug!(partition = %partition, "partition from environment");
        return Some(partition);
    }
    let output = successful(query.partitions(None), "partition listing")?;
    let partition = parse_partition_listing(&output.text)
        .into_iter()
        .find(PartitionInfo::is_default)?
        .name()?
        .to_string();
    debug!(partition = %partition, "default partition from listing");
    Some(partition)
}

/// Generic resources of `partition`'s nodes. Empty when unknown.
pub fn get_node_gres<Q: ClusterQuery + ?Sized>(query: &Q, partition: &str) -> NodeGres {
    if partition.is_empty() {
        return NodeGres::default();
    }
    successful(query.node_gres(partition), "node gres")
        .map(|output| parse_node_gres(&output.text))
        .unwrap_or_default()
}

fn successful(result: anyhow::Result<QueryOutput>, what: &str) -> Option<QueryOutput> {
    match result {
        Ok(output) if output.success() => Some(output),
        Ok(output) => {
            debug!(status = output.status, what, "query returned non-zero status");
            None
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), what, "query could not be run");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::env::MapEnv;
    use crate::test_support::{FakeQuery, GPU_PARTITION_LINE};

    #[test]
    fn partition_info_is_parsed() {
        let query = FakeQuery::new().with_partition("gpu", GPU_PARTITION_LINE);
        let info = get_partition_info(&query, "gpu").expect("info");
        assert_eq!(info.structured_number("TRES", "gres/gpu"), Some(32.0));
    }

    #[test]
    fn empty_partition_name_is_not_queried() {
        let query = FakeQuery::new();
        assert_eq!(get_partition_info(&query, ""), None);
        assert!(get_node_gres(&query, "").is_empty());
        assert!(query.calls().is_empty());
    }

    #[test]
    fn failed_partition_query_is_none() {
        let query = FakeQuery::new().with_partition_status("gpu", 1);
        assert_eq!(get_partition_info(&query, "gpu"), None);
    }

    #[test]
    fn unreachable_query_is_none() {
        let query = FakeQuery::new().unreachable();
        assert_eq!(get_partition_info(&query, "gpu"), None);
        assert_eq!(
            get_default_partition_or_env(&query, &MapEnv::new(), "SLURM_JOB_PARTITION"),
            None
        );
        assert!(get_node_gres(&query, "gpu").is_empty());
    }

    #[test]
    fn environment_override_wins_without_query() {
        let query = FakeQuery::new();
        let env = MapEnv::new().with("SLURM_JOB_PARTITION", "gpu");
        assert_eq!(
            get_default_partition_or_env(&query, &env, "SLURM_JOB_PARTITION"),
            Some("gpu".to_string())
        );
        assert!(query.calls().is_empty());
    }

    #[test]
    fn default_partition_found_in_listing() {
        let query = FakeQuery::new().with_listing(
            "PartitionName=debug Default=NO\nPartitionName=cpu Default=YES\nPartitionName=gpu Default=NO\n",
        );
        assert_eq!(
            get_default_partition_or_env(&query, &MapEnv::new(), "SLURM_JOB_PARTITION"),
            Some("cpu".to_string())
        );
    }

    #[test]
    fn listing_without_default_is_none() {
        let query = FakeQuery::new().with_listing("PartitionName=a Default=NO\n");
        assert_eq!(
            get_default_partition_or_env(&query, &MapEnv::new(), "SLURM_JOB_PARTITION"),
            None
        );
    }

    #[test]
    fn node_gres_is_parsed_and_failure_is_empty() {
        let query = FakeQuery::new()
            .with_node_gres("gpu", "gpu:8(S:0-7),tmp:3500G\n")
            .with_node_gres_status("cpu", 1);
        assert_eq!(get_node_gres(&query, "gpu").get("tmp"), Some("3500G"));
        assert!(get_node_gres(&query, "cpu").is_empty());
        assert!(get_node_gres(&query, "other").is_empty());
    }
}
