//! Rule configuration records and their eager validation.
//!
//! A `RuleConfig` is plain data read from TOML or built in code. Each rule
//! publishes a [`ParamSchema`] naming exactly the keys it recognizes; the
//! registry checks every config against its rule's schema at registration,
//! before any scan runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ─── Error type ──────────────────────────────────────────────────────

/// Configuration-time faults. These fail registry construction; they never
/// surface during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("duplicate rule identifier: {0}")]
    DuplicateRule(String),

    #[error("invalid config for rule '{rule}': {reason}")]
    InvalidConfig { rule: String, reason: String },

    #[error("unknown rule kind: {0}")]
    UnknownRuleKind(String),
}

// ─── RuleConfig ──────────────────────────────────────────────────────

/// Per-rule configuration: enabled flag, composite weight, numeric params
/// and numeric thresholds.
///
/// `BTreeMap` keeps key order deterministic for hashing and display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
}

fn default_enabled() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            params: BTreeMap::new(),
            thresholds: BTreeMap::new(),
        }
    }
}

impl RuleConfig {
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_threshold(mut self, key: impl Into<String>, value: f64) -> Self {
        self.thresholds.insert(key.into(), value);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Named param, falling back to `default`.
    pub fn param(&self, key: &str, default: f64) -> f64 {
        self.params.get(key).copied().unwrap_or(default)
    }

    /// Named threshold, falling back to `default`.
    pub fn threshold(&self, key: &str, default: f64) -> f64 {
        self.thresholds.get(key).copied().unwrap_or(default)
    }
}

// ─── Schema ──────────────────────────────────────────────────────────

/// Largest accepted window param, in bars.
pub const MAX_WINDOW_BARS: usize = 100_000;

/// Value domain of a recognized key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Whole number of bars in [1, MAX_WINDOW_BARS].
    Window,
    /// Open interval (0, 1).
    Fraction,
    /// Strictly positive.
    Positive,
    /// Closed interval [0, 100].
    Score,
}

#[derive(Debug, Clone, Copy)]
pub struct ParamDef {
    pub key: &'static str,
    pub default: f64,
    pub kind: ParamKind,
}

impl ParamDef {
    pub const fn new(key: &'static str, default: f64, kind: ParamKind) -> Self {
        Self { key, default, kind }
    }

    fn check(&self, value: f64) -> Result<(), String> {
        if !value.is_finite() {
            return Err(format!("{} must be finite, got {value}", self.key));
        }
        let ok = match self.kind {
            ParamKind::Window => {
                value >= 1.0 && value <= MAX_WINDOW_BARS as f64 && value.fract() == 0.0
            }
            ParamKind::Fraction => value > 0.0 && value < 1.0,
            ParamKind::Positive => value > 0.0,
            ParamKind::Score => (0.0..=100.0).contains(&value),
        };
        if ok {
            Ok(())
        } else {
            let expected = match self.kind {
                ParamKind::Window => "a whole number of bars between 1 and 100000",
                ParamKind::Fraction => "between 0 and 1 (exclusive)",
                ParamKind::Positive => "greater than 0",
                ParamKind::Score => "between 0 and 100",
            };
            Err(format!("{} must be {expected}, got {value}", self.key))
        }
    }
}

/// The recognized params and thresholds of one rule kind.
#[derive(Debug, Clone, Copy)]
pub struct ParamSchema {
    pub params: &'static [ParamDef],
    pub thresholds: &'static [ParamDef],
}

impl ParamSchema {
    /// Reject non-positive weights, unknown keys and out-of-domain values.
    pub fn validate(&self, config: &RuleConfig) -> Result<(), String> {
        if !(config.weight.is_finite() && config.weight > 0.0) {
            return Err(format!("weight must be a positive number, got {}", config.weight));
        }
        check_section("params", &config.params, self.params)?;
        check_section("thresholds", &config.thresholds, self.thresholds)
    }

    /// A config carrying every default explicitly.
    pub fn defaults(&self) -> RuleConfig {
        let collect = |defs: &[ParamDef]| -> BTreeMap<String, f64> {
            defs.iter().map(|d| (d.key.to_string(), d.default)).collect()
        };
        RuleConfig {
            params: collect(self.params),
            thresholds: collect(self.thresholds),
            ..RuleConfig::default()
        }
    }

    /// Resolve a window param to a bar count. Call after `validate`.
    pub fn window(&self, config: &RuleConfig, key: &str) -> usize {
        self.param(config, key) as usize
    }

    /// Resolve a param, falling back to its declared default.
    pub fn param(&self, config: &RuleConfig, key: &str) -> f64 {
        config.param(key, default_of(self.params, key))
    }

    /// Resolve a threshold, falling back to its declared default.
    pub fn threshold(&self, config: &RuleConfig, key: &str) -> f64 {
        config.threshold(key, default_of(self.thresholds, key))
    }
}

fn default_of(defs: &[ParamDef], key: &str) -> f64 {
    defs.iter()
        .find(|d| d.key == key)
        .map(|d| d.default)
        .unwrap_or(f64::NAN)
}

fn check_section(
    section: &str,
    values: &BTreeMap<String, f64>,
    defs: &[ParamDef],
) -> Result<(), String> {
    for (key, &value) in values {
        let def = defs.iter().find(|d| d.key == key).ok_or_else(|| {
            let known: Vec<&str> = defs.iter().map(|d| d.key).collect();
            format!("unknown {section} key '{key}' (recognized: {})", known.join(", "))
        })?;
        def.check(value)?;
    }
    Ok(())
}
