#[cfg(test)]
pub mod fixture;
pub mod polygon;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::ProviderError;
use crate::model::{AggregateQuery, PreviousClose, PriceBar, Symbol, TickerDetails};

/// Abstraction over an external market-data provider.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn MarketData`).
pub trait MarketData: Send + Sync {
    /// Short provider name used in logs and error contexts.
    fn name(&self) -> &str;

    /// Fetch aggregate bars for `query`, oldest first when the query asks
    /// for ascending order.
    ///
    /// An unknown or delisted ticker yields an empty vector, not an error.
    fn fetch_aggregates(
        &self,
        query: &AggregateQuery,
    ) -> BoxFuture<'_, Result<Vec<PriceBar>, Report<ProviderError>>>;

    /// Fetch the most recent completed daily bar.
    fn previous_close(
        &self,
        ticker: &Symbol,
    ) -> BoxFuture<'_, Result<Option<PreviousClose>, Report<ProviderError>>>;

    /// Fetch reference details for a ticker; `None` when the provider
    /// does not know it.
    fn ticker_details(
        &self,
        ticker: &Symbol,
    ) -> BoxFuture<'_, Result<Option<TickerDetails>, Report<ProviderError>>>;
}
