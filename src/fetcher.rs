use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use error_stack::Report;
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::model::{AggregateQuery, DateRange, PriceBar, Symbol, Timespan};
use crate::provider::MarketData;

/// Number of leading bars echoed to the debug log after a fetch.
const PREVIEW_BARS: usize = 5;

/// Retrieves trailing windows of split/dividend-adjusted bars.
#[derive(Clone)]
pub struct AggregateFetcher {
    provider: Arc<dyn MarketData>,
    result_limit: u32,
}

impl AggregateFetcher {
    pub fn new(provider: Arc<dyn MarketData>, result_limit: u32) -> Self {
        Self {
            provider,
            result_limit,
        }
    }

    pub fn provider(&self) -> &dyn MarketData {
        self.provider.as_ref()
    }

    /// Longest lookback `fetch_bars` can serve at `timespan` without the
    /// provider truncating the window at the result cap.
    pub fn max_lookback_days(&self, timespan: Timespan) -> u32 {
        timespan.max_lookback_days(self.result_limit)
    }

    /// Daily bars for `ticker` over the `lookback_days` ending today (UTC).
    pub async fn fetch(
        &self,
        ticker: &Symbol,
        lookback_days: u32,
    ) -> Result<Vec<PriceBar>, Report<ProviderError>> {
        self.fetch_until(ticker, lookback_days, Utc::now().date_naive())
            .await
    }

    /// Daily bars for `ticker` over the `lookback_days` ending on `end`.
    ///
    /// An empty vector means the provider has no data for the ticker.
    pub async fn fetch_until(
        &self,
        ticker: &Symbol,
        lookback_days: u32,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, Report<ProviderError>> {
        self.fetch_bars(ticker, Timespan::Day, lookback_days, end)
            .await
    }

    /// Bars of any resolution for `ticker` over the `lookback_days` ending
    /// on `end`, e.g. minute bars for the last day.
    pub async fn fetch_bars(
        &self,
        ticker: &Symbol,
        timespan: Timespan,
        lookback_days: u32,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, Report<ProviderError>> {
        let query = AggregateQuery {
            ticker: ticker.clone(),
            multiplier: 1,
            timespan,
            range: DateRange::trailing(end, lookback_days.max(1)),
            adjusted: true,
            limit: self.result_limit,
        };

        info!(
            provider = self.provider.name(),
            ticker = %ticker,
            timespan = %timespan,
            range = %query.range,
            "fetching historical aggregates"
        );

        let bars = self.provider.fetch_aggregates(&query).await?;

        if bars.is_empty() {
            info!(
                ticker = %ticker,
                "no historical data found; the ticker may be invalid or delisted"
            );
            return Ok(bars);
        }

        info!(ticker = %ticker, fetched = bars.len(), "historical aggregates fetched");
        for bar in bars.iter().take(PREVIEW_BARS) {
            debug!(date = ?bar.date(), close = bar.close, "bar");
        }

        Ok(bars)
    }
}
