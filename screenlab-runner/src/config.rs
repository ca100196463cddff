//! Scan configuration file.
//!
//! ```toml
//! [scan]
//! min_composite_score = 60
//! max_concurrency = 4
//! indicators = ["sma_20", "momentum_10"]
//!
//! [provider]
//! retry_max_attempts = 3
//! retry_base_delay_ms = 500
//! retry_backoff = 2.0
//!
//! [rules.pit]
//! kind = "golden_pit"
//! weight = 1.0
//! params = { drawdown_threshold = 0.25 }
//!
//! [rules.breakout]
//! kind = "trend_breakout"
//! enabled = false
//! ```
//!
//! Every section is optional. With no `[rules]` table, both built-in rules
//! are registered under their kind names with default configuration. Rule
//! tables register in identifier order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use screenlab_core::{ConfigError, RuleConfig, RuleKind, RuleRegistry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::{RetryPolicy, MAX_RETRY_DELAY};
use crate::scan::{ScanRequest, DEFAULT_MAX_CONCURRENCY, DEFAULT_MIN_COMPOSITE_SCORE};

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid {section} setting: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanFile {
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSection {
    #[serde(default = "default_min_score")]
    pub min_composite_score: f64,
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub indicators: Vec<String>,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            min_composite_score: DEFAULT_MIN_COMPOSITE_SCORE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            indicators: Vec::new(),
        }
    }
}

fn default_min_score() -> f64 {
    DEFAULT_MIN_COMPOSITE_SCORE
}

fn default_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSection {
    #[serde(default = "default_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_backoff")]
    pub retry_backoff: f64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            retry_max_attempts: default_attempts(),
            retry_base_delay_ms: default_base_delay_ms(),
            retry_backoff: default_backoff(),
        }
    }
}

fn default_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_backoff() -> f64 {
    2.0
}

/// One `[rules.<id>]` table: a kind tag plus the `RuleConfig` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSection {
    pub kind: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
}

impl RuleSection {
    pub fn rule_config(&self) -> RuleConfig {
        let defaults = RuleConfig::default();
        RuleConfig {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            weight: self.weight.unwrap_or(defaults.weight),
            params: self.params.clone(),
            thresholds: self.thresholds.clone(),
        }
    }
}

impl ScanFile {
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and check the scan and provider sections. Rule configs are
    /// checked by [`ScanFile::build_registry`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        let file: ScanFile = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<(), ConfigFileError> {
        let invalid = |section, reason: String| ConfigFileError::Invalid { section, reason };
        if self.scan.max_concurrency == 0 {
            return Err(invalid("scan", "max_concurrency must be at least 1".into()));
        }
        if !self.scan.min_composite_score.is_finite() {
            return Err(invalid("scan", "min_composite_score must be finite".into()));
        }
        if self.provider.retry_max_attempts == 0 {
            return Err(invalid("provider", "retry_max_attempts must be at least 1".into()));
        }
        if self.provider.retry_base_delay_ms > MAX_RETRY_DELAY.as_millis() as u64 {
            return Err(invalid(
                "provider",
                format!(
                    "retry_base_delay_ms must be at most {}, got {}",
                    MAX_RETRY_DELAY.as_millis(),
                    self.provider.retry_base_delay_ms
                ),
            ));
        }
        if !self.provider.retry_backoff.is_finite() || self.provider.retry_backoff < 1.0 {
            return Err(invalid(
                "provider",
                format!("retry_backoff must be >= 1, got {}", self.provider.retry_backoff),
            ));
        }
        RuleRegistry::parse_indicator_names(&self.scan.indicators)
            .map_err(|e| invalid("scan", e.to_string()))?;
        Ok(())
    }

    /// Register every configured rule, failing on the first invalid one.
    pub fn build_registry(&self) -> Result<RuleRegistry, ConfigError> {
        if self.rules.is_empty() {
            return Ok(RuleRegistry::with_defaults());
        }
        let mut registry = RuleRegistry::new();
        for (id, section) in &self.rules {
            registry.register(section.kind.create(id.as_str()), section.rule_config())?;
        }
        Ok(registry)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.provider.retry_max_attempts,
            Duration::from_millis(self.provider.retry_base_delay_ms),
            self.provider.retry_backoff,
        )
    }

    pub fn scan_request(&self, symbols: BTreeSet<String>) -> ScanRequest {
        ScanRequest {
            symbols,
            min_composite_score: self.scan.min_composite_score,
            max_concurrency: self.scan.max_concurrency,
            indicators: self.scan.indicators.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let file = ScanFile::from_toml("").unwrap();
        assert_eq!(file, ScanFile::default());
        let registry = file.build_registry().unwrap();
        assert_eq!(registry.ids(), vec!["golden_pit", "trend_breakout"]);
        assert_eq!(file.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn full_file_parses() {
        let toml = r#"
            [scan]
            min_composite_score = 70
            max_concurrency = 8
            indicators = ["sma_20", "momentum_10"]

            [provider]
            retry_max_attempts = 5
            retry_base_delay_ms = 100
            retry_backoff = 1.5

            [rules.pit]
            kind = "golden_pit"
            weight = 2.0
            params = { drawdown_threshold = 0.25 }

            [rules.breakout]
            kind = "trend_breakout"
            enabled = false
            thresholds = { min_score = 70 }
        "#;
        let file = ScanFile::from_toml(toml).unwrap();
        assert_eq!(file.scan.min_composite_score, 70.0);
        assert_eq!(file.scan.max_concurrency, 8);
        assert_eq!(file.provider.retry_max_attempts, 5);

        let registry = file.build_registry().unwrap();
        // BTreeMap order: breakout before pit.
        assert_eq!(registry.ids(), vec!["breakout", "pit"]);
        let (rule, config) = registry.get("pit").unwrap();
        assert_eq!(rule.kind(), "golden_pit");
        assert_eq!(config.weight, 2.0);
        assert_eq!(config.param("drawdown_threshold", 0.0), 0.25);
        assert!(!registry.get("breakout").unwrap().1.enabled);

        let request = file.scan_request(BTreeSet::from(["AAA".to_string()]));
        assert_eq!(request.min_composite_score, 70.0);
        assert_eq!(request.indicators, vec!["sma_20", "momentum_10"]);
        assert_eq!(
            file.retry_policy(),
            RetryPolicy::new(5, Duration::from_millis(100), 1.5)
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            ScanFile::from_toml("[scan]\nworkers = 3\n"),
            Err(ConfigFileError::Toml(_))
        ));
        assert!(matches!(
            ScanFile::from_toml("[rules.x]\nkind = \"golden_pit\"\ncolour = 1\n"),
            Err(ConfigFileError::Toml(_))
        ));
        assert!(matches!(
            ScanFile::from_toml("[rules.x]\nkind = \"head_and_shoulders\"\n"),
            Err(ConfigFileError::Toml(_))
        ));
    }

    #[test]
    fn invalid_rule_params_fail_at_registry_build() {
        let file = ScanFile::from_toml(
            "[rules.pit]\nkind = \"golden_pit\"\nparams = { drawdown_threshold = 1.5 }\n",
        )
        .unwrap();
        assert!(matches!(
            file.build_registry(),
            Err(ConfigError::InvalidConfig { .. })
        ));

        let file =
            ScanFile::from_toml("[rules.pit]\nkind = \"golden_pit\"\nweight = -1.0\n").unwrap();
        assert!(file.build_registry().is_err());
    }

    #[test]
    fn invalid_scan_and_provider_settings() {
        for toml in [
            "[scan]\nmax_concurrency = 0\n",
            "[provider]\nretry_max_attempts = 0\n",
            "[provider]\nretry_backoff = 0.5\n",
            "[provider]\nretry_base_delay_ms = 3600000\n",
            "[scan]\nindicators = [\"rsi_14\"]\n",
        ] {
            assert!(
                matches!(ScanFile::from_toml(toml), Err(ConfigFileError::Invalid { .. })),
                "{toml}"
            );
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ScanFile::from_file(Path::new("/nonexistent/scan.toml")).unwrap_err();
        assert!(matches!(err, ConfigFileError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/scan.toml"));
    }
}
