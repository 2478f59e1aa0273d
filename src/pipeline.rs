use error_stack::{Report, ResultExt};
use tracing::info;

use crate::error::PipelineError;
use crate::fetcher::AggregateFetcher;
use crate::indicator::{IndicatorResult, compute_sma};
use crate::model::{PriceBar, Symbol};

/// Bars for one ticker together with the SMA computed over them.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub ticker: Symbol,
    pub period: usize,
    pub bars: Vec<PriceBar>,
    pub sma: IndicatorResult,
}

/// Fetch `lookback_days` of daily bars for `ticker` and compute their
/// `period`-bar SMA.
pub async fn analyze(
    fetcher: &AggregateFetcher,
    ticker: &Symbol,
    lookback_days: u32,
    period: usize,
) -> Result<Analysis, Report<PipelineError>> {
    let bars = fetcher
        .fetch(ticker, lookback_days)
        .await
        .change_context_lazy(|| PipelineError::Fetch {
            ticker: ticker.to_string(),
        })?;

    let sma = compute_sma(&bars, period).change_context_lazy(|| PipelineError::Indicator {
        ticker: ticker.to_string(),
    })?;

    match sma {
        IndicatorResult::Computed { value, period } => {
            info!(ticker = %ticker, period, sma = value, "SMA computed");
        }
        IndicatorResult::InsufficientData {
            required,
            available,
        } => {
            info!(ticker = %ticker, required, available, "not enough data to calculate SMA");
        }
    }

    Ok(Analysis {
        ticker: ticker.clone(),
        period,
        bars,
        sma,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ProviderError;
    use crate::provider::fixture::{FixtureFailure, FixtureProvider, bars_from_closes};

    #[tokio::test]
    async fn computes_sma_over_fetched_bars() {
        let provider = FixtureProvider::new()
            .with_bars("SPY", bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        let fetcher = AggregateFetcher::new(Arc::new(provider), 5000);

        let analysis = analyze(&fetcher, &Symbol::parse("SPY").unwrap(), 730, 3)
            .await
            .unwrap();

        assert_eq!(analysis.bars.len(), 5);
        assert_eq!(analysis.sma.value(), Some(4.0));
        assert_eq!(analysis.period, 3);
    }

    #[tokio::test]
    async fn too_few_bars_is_not_an_error() {
        let provider = FixtureProvider::new().with_bars("SPY", bars_from_closes(&[1.0, 2.0]));
        let fetcher = AggregateFetcher::new(Arc::new(provider), 5000);

        let analysis = analyze(&fetcher, &Symbol::parse("SPY").unwrap(), 730, 3)
            .await
            .unwrap();

        assert_eq!(
            analysis.sma,
            IndicatorResult::InsufficientData {
                required: 3,
                available: 2
            }
        );
    }

    #[tokio::test]
    async fn provider_failure_keeps_provider_context() {
        let provider = FixtureProvider::new().failing(FixtureFailure::Authentication);
        let fetcher = AggregateFetcher::new(Arc::new(provider), 5000);

        let report = analyze(&fetcher, &Symbol::parse("SPY").unwrap(), 730, 45)
            .await
            .unwrap_err();

        assert!(matches!(
            report.current_context(),
            PipelineError::Fetch { .. }
        ));
        assert!(matches!(
            report.downcast_ref::<ProviderError>(),
            Some(ProviderError::Authentication { .. })
        ));
    }

    #[tokio::test]
    async fn zero_period_is_indicator_error() {
        let provider = FixtureProvider::new().with_bars("SPY", bars_from_closes(&[1.0]));
        let fetcher = AggregateFetcher::new(Arc::new(provider), 5000);

        let report = analyze(&fetcher, &Symbol::parse("SPY").unwrap(), 730, 0)
            .await
            .unwrap_err();

        assert!(matches!(
            report.current_context(),
            PipelineError::Indicator { .. }
        ));
    }
}
