//! Component traits — indicators and rules.
//!
//! Indicators turn a bar series into aligned numeric series. Rules read the
//! series and the indicators and emit a verdict. The factory maps rule kind
//! tags to implementations.

pub mod factory;
pub mod indicator;
pub mod rule;

pub use factory::{create_rule, required_indicators, RuleKind};
pub use indicator::{Indicator, IndicatorValues};
pub use rule::{Condition, Outcome, Rule, Verdict};
