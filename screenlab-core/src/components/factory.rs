//! Factory system — converts rule kind tags into runtime trait objects and
//! resolves the deduplicated indicator set a group of rules needs.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, RuleConfig};

use super::indicator::Indicator;
use super::rule::{GoldenPit, Rule, TrendBreakout};

/// Built-in rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    GoldenPit,
    TrendBreakout,
}

impl RuleKind {
    pub const ALL: [RuleKind; 2] = [RuleKind::GoldenPit, RuleKind::TrendBreakout];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::GoldenPit => "golden_pit",
            RuleKind::TrendBreakout => "trend_breakout",
        }
    }

    /// Instantiate this kind under the given identifier.
    pub fn create(&self, name: impl Into<String>) -> Box<dyn Rule> {
        match self {
            RuleKind::GoldenPit => Box::new(GoldenPit::new(name)),
            RuleKind::TrendBreakout => Box::new(TrendBreakout::new(name)),
        }
    }

    /// The kind's configuration with every default spelled out.
    pub fn default_config(&self) -> RuleConfig {
        self.create(self.as_str()).schema().defaults()
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownRuleKind(s.to_string()))
    }
}

/// Create a rule from its kind tag.
pub fn create_rule(kind: &str, name: impl Into<String>) -> Result<Box<dyn Rule>, ConfigError> {
    Ok(kind.parse::<RuleKind>()?.create(name))
}

/// Union of the indicators the given rules need, deduplicated by name.
///
/// `extra` are caller-requested indicators appended after the rules' own.
pub fn required_indicators<'a>(
    rules: impl IntoIterator<Item = (&'a dyn Rule, &'a RuleConfig)>,
    extra: Vec<Box<dyn Indicator>>,
) -> Vec<Box<dyn Indicator>> {
    let mut seen = HashSet::new();
    let mut indicators: Vec<Box<dyn Indicator>> = Vec::new();

    let mut add = |ind: Box<dyn Indicator>| {
        let key = ind.name().to_string();
        if seen.insert(key) {
            indicators.push(ind);
        }
    };

    for (rule, config) in rules {
        for ind in rule.required_indicators(config) {
            add(ind);
        }
    }
    for ind in extra {
        add(ind);
    }

    indicators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::Sma;

    #[test]
    fn kinds_round_trip_through_strings() {
        for kind in RuleKind::ALL {
            assert_eq!(kind.as_str().parse::<RuleKind>().unwrap(), kind);
        }
        assert_eq!(
            "golden_pits".parse::<RuleKind>(),
            Err(ConfigError::UnknownRuleKind("golden_pits".into()))
        );
    }

    #[test]
    fn create_rule_uses_given_name() {
        let rule = create_rule("trend_breakout", "breakout_strict").unwrap();
        assert_eq!(rule.name(), "breakout_strict");
        assert_eq!(rule.kind(), "trend_breakout");
    }

    #[test]
    fn default_configs_validate() {
        for kind in RuleKind::ALL {
            let config = kind.default_config();
            assert!(kind.create("x").validate(&config).is_ok(), "{kind}");
        }
        assert_eq!(
            RuleKind::TrendBreakout.default_config().threshold("min_score", 0.0),
            65.0
        );
    }

    #[test]
    fn indicator_union_is_deduplicated() {
        let pit = GoldenPit::default();
        let breakout = TrendBreakout::default();
        let config = RuleConfig::default();
        let rules: Vec<(&dyn Rule, &RuleConfig)> = vec![(&pit, &config), (&breakout, &config)];
        let extra: Vec<Box<dyn Indicator>> = vec![Box::new(Sma::new(10)), Box::new(Sma::new(20))];

        let union = required_indicators(rules, extra);
        let names: Vec<&str> = union.iter().map(|i| i.name()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.contains(&"sma_10"));
        assert!(names.contains(&"sma_20"));
        assert!(names.contains(&"prior_drawdown_60"));
        assert!(names.contains(&"prior_high_240"));
        // volume_ratio_5 is shared by both rules
        assert_eq!(names.iter().filter(|n| **n == "volume_ratio_5").count(), 1);
    }
}
