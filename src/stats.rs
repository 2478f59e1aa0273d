use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{PriceBar, Symbol};

/// Currency text with two decimals, e.g. `$472.65`.
pub fn format_currency(value: f64) -> String {
    format!("${value:.2}")
}

/// Headline figures for the most recent bar of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestStatistics {
    pub ticker: Symbol,
    pub as_of: Option<NaiveDate>,
    pub open: Option<String>,
    pub close: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub bars: usize,
}

impl LatestStatistics {
    pub fn from_bars(ticker: Symbol, bars: &[PriceBar]) -> Self {
        let latest = bars.last();
        Self {
            ticker,
            as_of: latest.and_then(PriceBar::date),
            open: latest.map(|b| format_currency(b.open)),
            close: latest.map(|b| format_currency(b.close)),
            high: latest.map(|b| format_currency(b.high)),
            low: latest.map(|b| format_currency(b.low)),
            bars: bars.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fixture::bars_from_closes;

    #[test]
    fn currency_rounds_to_cents() {
        assert_eq!(format_currency(4.0), "$4.00");
        assert_eq!(format_currency(472.654), "$472.65");
        assert_eq!(format_currency(0.125_1), "$0.13");
    }

    #[test]
    fn latest_statistics_use_last_bar() {
        let bars = bars_from_closes(&[10.0, 20.0, 30.0]);
        let stats = LatestStatistics::from_bars(Symbol::parse("SPY").unwrap(), &bars);
        assert_eq!(stats.close.as_deref(), Some("$30.00"));
        assert_eq!(stats.high.as_deref(), Some("$31.00"));
        assert_eq!(stats.low.as_deref(), Some("$29.00"));
        assert_eq!(stats.as_of, NaiveDate::from_ymd_opt(2024, 1, 3));
        assert_eq!(stats.bars, 3);
    }

    #[test]
    fn empty_sequence_has_no_figures() {
        let stats = LatestStatistics::from_bars(Symbol::parse("NOPE").unwrap(), &[]);
        assert_eq!(stats.bars, 0);
        assert!(stats.close.is_none());
        assert!(stats.as_of.is_none());
    }
}
