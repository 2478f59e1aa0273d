use std::fmt;

use chrono::{DateTime, Days, NaiveDate, Utc};
use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::SymbolError;

/// A validated, upper-cased ticker symbol (e.g. `"SPY"`, `"BRK.B"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Trim and upper-case `raw`, rejecting empty input and characters
    /// that never appear in a ticker.
    pub fn parse(raw: &str) -> Result<Self, Report<SymbolError>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!(SymbolError::Empty);
        }
        if let Some(found) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':')))
        {
            bail!(SymbolError::InvalidCharacter { found });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bar resolution understood by the aggregates endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timespan {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl Timespan {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Upper bound on the bars one calendar day yields at this resolution.
    pub fn max_bars_per_day(self) -> u32 {
        match self {
            Self::Minute => 24 * 60,
            Self::Hour => 24,
            Self::Day | Self::Week | Self::Month => 1,
        }
    }

    /// Longest trailing window (see [`DateRange::trailing`]) whose bars
    /// are guaranteed to fit in a single response of `limit` bars.
    pub fn max_lookback_days(self, limit: u32) -> u32 {
        // `trailing(end, days)` covers `days + 1` calendar dates.
        (limit / self.max_bars_per_day()).saturating_sub(1)
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// The range ending on `end` and starting `days` days before it.
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        let from = end
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { from, to: end }
    }

    /// `YYYY-MM-DD` form of the start date.
    pub fn from_param(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    /// `YYYY-MM-DD` form of the end date.
    pub fn to_param(&self) -> String {
        self.to.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.from_param(), self.to_param())
    }
}

/// Parameters of one aggregate-bars request.
#[derive(Debug, Clone)]
pub struct AggregateQuery {
    pub ticker: Symbol,
    pub multiplier: u32,
    pub timespan: Timespan,
    pub range: DateRange,
    pub adjusted: bool,
    pub limit: u32,
}

/// One trading period's OHLC summary.
///
/// Prices are passed through from the provider without validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    /// Start of the period, epoch milliseconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub vwap: Option<f64>,
    pub transactions: Option<u64>,
}

impl PriceBar {
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.opened_at().map(|dt| dt.date_naive())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviousClose {
    pub ticker: Symbol,
    pub bar: PriceBar,
}

/// Reference data describing a listed instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerDetails {
    pub ticker: String,
    pub name: String,
    pub market: String,
    pub locale: String,
    pub primary_exchange: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_is_trimmed_and_uppercased() {
        let symbol = Symbol::parse("  spy ").unwrap();
        assert_eq!(symbol.as_str(), "SPY");
        assert_eq!(Symbol::parse("brk.b").unwrap().as_str(), "BRK.B");
    }

    #[test]
    fn symbol_rejects_empty_input() {
        assert!(Symbol::parse("").is_err());
        assert!(Symbol::parse("   ").is_err());
    }

    #[test]
    fn symbol_rejects_path_characters() {
        assert!(Symbol::parse("SPY/../x").is_err());
        assert!(Symbol::parse("S P Y").is_err());
    }

    #[test]
    fn trailing_range_spans_requested_days() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let range = DateRange::trailing(end, 730);
        assert_eq!(range.to_param(), "2024-03-01");
        assert_eq!(range.from_param(), "2022-03-02");
        assert_eq!((range.to - range.from).num_days(), 730);
    }

    #[test]
    fn timespan_serializes_lowercase() {
        let json = serde_json::to_string(&Timespan::Day).unwrap();
        assert_eq!(json, "\"day\"");
        assert_eq!(Timespan::Minute.to_string(), "minute");
    }

    #[test]
    fn lookback_cap_keeps_window_within_limit() {
        assert_eq!(Timespan::Minute.max_lookback_days(5000), 2);
        assert_eq!(Timespan::Hour.max_lookback_days(5000), 207);
        assert_eq!(Timespan::Day.max_lookback_days(5000), 4999);
        assert_eq!(Timespan::Minute.max_lookback_days(1000), 0);

        for timespan in [Timespan::Minute, Timespan::Hour, Timespan::Day] {
            let days = timespan.max_lookback_days(5000);
            assert!((days + 1) * timespan.max_bars_per_day() <= 5000);
        }
    }

    #[test]
    fn price_bar_date_from_epoch_millis() {
        let bar = PriceBar {
            timestamp: 1_704_067_200_000,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 0.0,
            vwap: None,
            transactions: None,
        };
        assert_eq!(bar.date(), NaiveDate::from_ymd_opt(2024, 1, 1));
    }
}
