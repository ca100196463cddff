//! Configuration fingerprinting — a stable identity for a rule set.
//!
//! Two registries with the same rules (identifier, kind, enabled flag,
//! weight, params, thresholds) in the same order hash identically across
//! runs and platforms, so reports produced under one configuration can be
//! grouped and compared.

use crate::config::RuleConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// BLAKE3 hex digest of a canonical rule-set serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    /// Hash `(identifier, kind, config)` entries in the given order.
    pub fn of_rules<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a RuleConfig)>) -> Self {
        // serde_json objects are key-sorted, and RuleConfig maps are BTreeMaps.
        let canonical: Vec<serde_json::Value> = entries
            .into_iter()
            .map(|(id, kind, config)| {
                json!({
                    "id": id,
                    "kind": kind,
                    "enabled": config.enabled,
                    "weight": config.weight,
                    "params": &config.params,
                    "thresholds": &config.thresholds,
                })
            })
            .collect();
        let digest = blake3::hash(serde_json::Value::Array(canonical).to_string().as_bytes());
        Self(digest.to_hex().to_string())
    }

    /// First 12 hex characters, for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
