use std::collections::HashMap;
use std::sync::Mutex;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::{ProviderError, ProviderMessage};
use crate::model::{AggregateQuery, PreviousClose, PriceBar, Symbol, TickerDetails};
use crate::provider::MarketData;

/// In-memory provider serving canned bars, recording every query it sees.
#[derive(Default)]
pub struct FixtureProvider {
    bars: HashMap<String, Vec<PriceBar>>,
    details: HashMap<String, TickerDetails>,
    failure: Option<FixtureFailure>,
    queries: Mutex<Vec<AggregateQuery>>,
}

#[derive(Debug, Clone, Copy)]
pub enum FixtureFailure {
    Authentication,
    RateLimit,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.bars.insert(ticker.to_owned(), bars);
        self
    }

    pub fn with_details(mut self, details: TickerDetails) -> Self {
        self.details.insert(details.ticker.clone(), details);
        self
    }

    pub fn failing(mut self, failure: FixtureFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn queries(&self) -> Vec<AggregateQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), Report<ProviderError>> {
        match self.failure {
            None => Ok(()),
            Some(FixtureFailure::Authentication) => Err(Report::new(
                ProviderError::Authentication {
                    provider: "fixture".into(),
                },
            )
            .attach(ProviderMessage("Unknown API Key".into()))),
            Some(FixtureFailure::RateLimit) => Err(Report::new(ProviderError::RateLimit {
                provider: "fixture".into(),
            })),
        }
    }
}

impl MarketData for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    fn fetch_aggregates(
        &self,
        query: &AggregateQuery,
    ) -> BoxFuture<'_, Result<Vec<PriceBar>, Report<ProviderError>>> {
        self.queries.lock().unwrap().push(query.clone());
        let result = self.check_failure().map(|()| {
            self.bars
                .get(query.ticker.as_str())
                .cloned()
                .unwrap_or_default()
        });
        Box::pin(async move { result })
    }

    fn previous_close(
        &self,
        ticker: &Symbol,
    ) -> BoxFuture<'_, Result<Option<PreviousClose>, Report<ProviderError>>> {
        let result = self.check_failure().map(|()| {
            self.bars
                .get(ticker.as_str())
                .and_then(|bars| bars.last())
                .map(|bar| PreviousClose {
                    ticker: ticker.clone(),
                    bar: bar.clone(),
                })
        });
        Box::pin(async move { result })
    }

    fn ticker_details(
        &self,
        ticker: &Symbol,
    ) -> BoxFuture<'_, Result<Option<TickerDetails>, Report<ProviderError>>> {
        let result = self
            .check_failure()
            .map(|()| self.details.get(ticker.as_str()).cloned());
        Box::pin(async move { result })
    }
}

/// Daily bars one day apart with the given closes; open/high/low track the close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    const DAY_MS: i64 = 86_400_000;
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar {
            timestamp: 1_704_067_200_000 + i as i64 * DAY_MS,
            open: c,
            high: c + 1.0,
            low: c - 1.0,
            close: c,
            volume: 1_000.0,
            vwap: Some(c),
            transactions: Some(10),
        })
        .collect()
}
