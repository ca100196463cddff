//! Canonical indicator names → indicator instances.
//!
//! | name                         | indicator                            |
//! |------------------------------|--------------------------------------|
//! | `sma_N`                      | [`Sma`]                              |
//! | `volume_ratio_N`             | [`VolumeRatio`]                      |
//! | `amplitude`                  | [`Amplitude`]                        |
//! | `daily_return`               | [`DailyReturn`]                      |
//! | `momentum_N`                 | [`Momentum`]                         |
//! | `rolling_high_N`             | [`RollingHigh::inclusive`]           |
//! | `prior_high_N`               | [`RollingHigh::prior`]               |
//! | `drawdown_N`                 | [`Drawdown::new`]                    |
//! | `prior_drawdown_N`           | [`Drawdown::from_prior_high`]        |
//! | `bullish_alignment[_P1_P2..]`| [`BullishAlignment`]                 |

use super::{
    Amplitude, BullishAlignment, DailyReturn, Drawdown, IndicatorError, Momentum, RollingHigh,
    Sma, VolumeRatio,
};
use crate::components::indicator::Indicator;

/// Build an indicator from its canonical name.
pub fn parse_indicator(name: &str) -> Result<Box<dyn Indicator>, IndicatorError> {
    let unknown = || IndicatorError::UnknownIndicator(name.to_string());

    match name {
        "amplitude" => return Ok(Box::new(Amplitude)),
        "daily_return" => return Ok(Box::new(DailyReturn)),
        "bullish_alignment" => return Ok(Box::new(BullishAlignment::default())),
        _ => {}
    }

    if let Some(rest) = name.strip_prefix("bullish_alignment_") {
        let periods = rest
            .split('_')
            .map(parse_period)
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(unknown)?;
        if !periods.windows(2).all(|w| w[0] < w[1]) {
            return Err(unknown());
        }
        return Ok(Box::new(BullishAlignment::new(&periods)));
    }

    // Longest prefixes first: "prior_drawdown_" before "drawdown_".
    let windowed: [(&str, fn(usize) -> Box<dyn Indicator>); 8] = [
        ("prior_drawdown_", |n| Box::new(Drawdown::from_prior_high(n))),
        ("volume_ratio_", |n| Box::new(VolumeRatio::new(n))),
        ("rolling_high_", |n| Box::new(RollingHigh::inclusive(n))),
        ("prior_high_", |n| Box::new(RollingHigh::prior(n))),
        ("drawdown_", |n| Box::new(Drawdown::new(n))),
        ("momentum_", |n| Box::new(Momentum::new(n))),
        ("sma_", |n| Box::new(Sma::new(n))),
        ("ma_", |n| Box::new(Sma::new(n))),
    ];

    for (prefix, build) in windowed {
        if let Some(rest) = name.strip_prefix(prefix) {
            let period = parse_period(rest).ok_or_else(unknown)?;
            return Ok(build(period));
        }
    }

    Err(unknown())
}

fn parse_period(s: &str) -> Option<usize> {
    s.parse::<usize>().ok().filter(|&n| n >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_windowed_names() {
        assert_eq!(parse_indicator("sma_20").unwrap().name(), "sma_20");
        assert_eq!(parse_indicator("volume_ratio_5").unwrap().name(), "volume_ratio_5");
        assert_eq!(parse_indicator("prior_high_240").unwrap().lookback(), 240);
        assert_eq!(parse_indicator("rolling_high_240").unwrap().lookback(), 239);
        assert_eq!(
            parse_indicator("prior_drawdown_60").unwrap().name(),
            "prior_drawdown_60"
        );
        assert_eq!(parse_indicator("drawdown_60").unwrap().name(), "drawdown_60");
        assert_eq!(parse_indicator("momentum_10").unwrap().name(), "momentum_10");
    }

    #[test]
    fn ma_is_an_alias_for_sma() {
        assert_eq!(parse_indicator("ma_10").unwrap().name(), "sma_10");
    }

    #[test]
    fn parses_fixed_names() {
        assert_eq!(parse_indicator("amplitude").unwrap().name(), "amplitude");
        assert_eq!(parse_indicator("daily_return").unwrap().name(), "daily_return");
        assert_eq!(
            parse_indicator("bullish_alignment").unwrap().lookback(),
            59
        );
        assert_eq!(
            parse_indicator("bullish_alignment_3_8").unwrap().name(),
            "bullish_alignment_3_8"
        );
    }

    #[test]
    fn rejects_unknown_or_malformed() {
        for bad in ["rsi_14", "sma_", "sma_0", "sma_x", "bullish_alignment_8_3", ""] {
            assert!(
                matches!(parse_indicator(bad), Err(IndicatorError::UnknownIndicator(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }
}
