//! Parser for one-line partition reports (`scontrol show partition --oneliner`).
//!
//! A report line is a whitespace-separated run of `Key=Value` fields. Only the
//! first `=` of a field separates key from value, so
//! `TRES=cpu=512,gres/gpu=32` keeps its nested pairs intact.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::kvlist::{self, KvList};
use crate::core::tokenize::Tokenizer;

/// Attributes whose values are themselves `key=value` lists.
pub const STRUCTURED_ATTRIBUTES: [&str; 3] = ["JobDefaults", "TRES", "TRESBillingWeights"];

const NULL_VALUE: &str = "(null)";

/// One attribute value, shaped by its attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PartitionValue {
    Plain(String),
    Structured(KvList),
}

/// Attributes of a single partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PartitionInfo {
    attributes: BTreeMap<String, PartitionValue>,
}

impl PartitionInfo {
    pub fn attributes(&self) -> &BTreeMap<String, PartitionValue> {
        &self.attributes
    }

    pub fn plain(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name)? {
            PartitionValue::Plain(value) => Some(value),
            PartitionValue::Structured(_) => None,
        }
    }

    pub fn structured(&self, name: &str) -> Option<&KvList> {
        match self.attributes.get(name)? {
            PartitionValue::Structured(list) => Some(list),
            PartitionValue::Plain(_) => None,
        }
    }

    /// Numeric plain attribute (`UNLIMITED`, `N/A` and the like yield `None`).
    pub fn number(&self, name: &str) -> Option<f64> {
        parse_number(self.plain(name)?)
    }

    /// Numeric entry of a structured attribute, e.g. `("TRES", "gres/gpu")`.
    pub fn structured_number(&self, name: &str, key: &str) -> Option<f64> {
        parse_number(self.structured(name)?.get(key)?)
    }

    pub fn name(&self) -> Option<&str> {
        self.plain("PartitionName")
    }

    pub fn is_default(&self) -> bool {
        self.plain("Default")
            .is_some_and(|value| value.eq_ignore_ascii_case("yes"))
    }
}

/// Parse the first non-blank line of a partition report.
///
/// Fields without `=` are ignored. Blank input yields `None`.
pub fn parse_partition_line(text: &str) -> Option<PartitionInfo> {
    let line = text.lines().map(str::trim).find(|line| !line.is_empty())?;

    let fields = Tokenizer::whitespace();
    let pair = Tokenizer::literal("=");
    let mut info = PartitionInfo::default();

    for field in fields.split(line, 0) {
        let mut parts = pair.split(&field, 2).into_iter();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        if key.is_empty() {
            continue;
        }
        let value = if STRUCTURED_ATTRIBUTES.contains(&key.as_str()) {
            PartitionValue::Structured(parse_structured(&value))
        } else {
            PartitionValue::Plain(value)
        };
        info.attributes.insert(key, value);
    }

    Some(info)
}

/// Parse every non-blank line of an unscoped partition listing.
pub fn parse_partition_listing(text: &str) -> Vec<PartitionInfo> {
    text.lines().filter_map(parse_partition_line).collect()
}

fn parse_structured(value: &str) -> KvList {
    if value == NULL_VALUE {
        return KvList::new();
    }
    kvlist::decode(value, "=", None)
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
