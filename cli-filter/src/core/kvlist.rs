//! Comma-separated key/value lists such as `gpu:2,tmp:100G` or
//! `cpu=512,mem=1T,gres/gpu=32`.
//!
//! A list mixes bare tokens and `key<delim>value` pairs. Both shapes are kept
//! side by side: bare tokens in order, pairs in a keyed map. A pair whose key
//! happens to be a decimal integer (`0=x`) is still a pair and is addressed by
//! its string key, never by position.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::tokenize::Tokenizer;

pub const DEFAULT_PAIR_DELIMITER: &str = ":";
const ITEM_DELIMITER: &str = ",";

/// Decoded key/value list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvList {
    items: Vec<String>,
    pairs: BTreeMap<String, String>,
}

impl KvList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.pairs.is_empty()
    }

    /// Bare tokens in source order.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn pairs(&self) -> &BTreeMap<String, String> {
        &self.pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    /// True when `name` is present either as a pair key or as a bare token.
    pub fn contains(&self, name: &str) -> bool {
        self.pairs.contains_key(name) || self.items.iter().any(|item| item == name)
    }

    pub fn push_item(&mut self, item: impl Into<String>) {
        self.items.push(item.into());
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.pairs.insert(key.into(), value.into())
    }

    /// Remove `name` as a pair and as a bare token.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.items.retain(|item| item != name);
        self.pairs.remove(name)
    }
}

/// Decode `text` into a [`KvList`].
///
/// Empty items are skipped. `key_prefix`, when given, is stripped from keys
/// that start with it.
pub fn decode(text: &str, pair_delimiter: &str, key_prefix: Option<&str>) -> KvList {
    let mut list = KvList::new();
    let items = Tokenizer::literal(ITEM_DELIMITER);
    let pair = Tokenizer::literal(pair_delimiter);

    for item in items.split(text, -1) {
        if item.is_empty() {
            continue;
        }
        let mut parts = pair.split(&item, 2).into_iter();
        let key = parts.next().unwrap_or_default();
        match parts.next() {
            Some(value) if !key.is_empty() => {
                let key = match key_prefix {
                    Some(prefix) => key.strip_prefix(prefix).unwrap_or(key.as_str()).to_string(),
                    None => key,
                };
                list.pairs.insert(key, value);
            }
            _ => list.items.push(item),
        }
    }
    list
}

/// Encode a [`KvList`] back into its textual form.
///
/// Bare tokens come first in stored order, then pairs in key order.
pub fn encode(list: &KvList, pair_delimiter: &str, key_prefix: Option<&str>) -> String {
    let prefix = key_prefix.unwrap_or("");
    list.items
        .iter()
        .cloned()
        .chain(
            list.pairs
                .iter()
                .map(|(key, value)| format!("{prefix}{key}{pair_delimiter}{value}")),
        )
        .collect::<Vec<_>>()
        .join(ITEM_DELIMITER)
}
