//! Node generic-resource strings, e.g. `gpu:8(S:0-7),tmp:3500G`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::kvlist;

/// Resource type → descriptor, as advertised by a partition's nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NodeGres {
    resources: BTreeMap<String, String>,
}

impl NodeGres {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, kind: &str) -> Option<&str> {
        self.resources.get(kind).map(String::as_str)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.resources.contains_key(kind)
    }

    /// Leading count of a descriptor: `8(S:0-7)` → 8, `a100:4(S:0-1)` → 4.
    pub fn count(&self, kind: &str) -> Option<u64> {
        gres_count(self.get(kind)?)
    }
}

/// Parse a node generic-resource listing. One listing per line is accepted;
/// the first line mentioning a type wins.
pub fn parse_node_gres(text: &str) -> NodeGres {
    let mut gres = NodeGres::default();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line == "(null)" {
            continue;
        }
        let list = kvlist::decode(line, ":", None);
        for (kind, descriptor) in list.pairs() {
            gres.resources
                .entry(kind.clone())
                .or_insert_with(|| descriptor.clone());
        }
    }
    gres
}

/// Count carried by a gres value such as `2`, `a100:2` or `8(S:0-7)`.
pub fn gres_count(value: &str) -> Option<u64> {
    let value = value.split('(').next().unwrap_or(value);
    let count = value.rsplit(':').next().unwrap_or(value);
    count.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_types_and_descriptors() {
        let gres = parse_node_gres("gpu:8(S:0-7),tmp:3500G");
        assert_eq!(gres.get("gpu"), Some("8(S:0-7)"));
        assert_eq!(gres.get("tmp"), Some("3500G"));
        assert_eq!(gres.count("gpu"), Some(8));
    }

    #[test]
    fn absent_type_is_not_present() {
        let gres = parse_node_gres("gpu:8(S:0-7)");
        assert!(!gres.contains("tmp"));
        assert_eq!(gres.get("tmp"), None);
    }

    #[test]
    fn null_and_blank_are_empty() {
        assert!(parse_node_gres("").is_empty());
        assert!(parse_node_gres("(null)\n").is_empty());
    }

    #[test]
    fn first_line_wins_per_type() {
        let gres = parse_node_gres("gpu:4\ngpu:8,tmp:100G\n");
        assert_eq!(gres.count("gpu"), Some(4));
        assert_eq!(gres.get("tmp"), Some("100G"));
    }

    #[test]
    fn count_skips_model_names() {
        assert_eq!(gres_count("a100:2"), Some(2));
        assert_eq!(gres_count("a100:4(S:0-1)"), Some(4));
        assert_eq!(gres_count("2"), Some(2));
        assert_eq!(gres_count("a100"), None);
    }
}
