use error_stack::{Report, bail};
use tracing::debug;

use crate::error::IndicatorError;
use crate::indicator::{IndicatorResult, close_prices};
use crate::model::PriceBar;

/// Simple Moving Average.
#[derive(Debug, Clone, Copy)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }

    /// Mean of the last `period` prices, or `None` when fewer are given.
    pub fn latest_price(&self, prices: &[f64]) -> Option<f64> {
        let start = prices.len().checked_sub(self.period)?;
        Some(prices[start..].iter().sum::<f64>() / self.period as f64)
    }

    /// SMA over the closes of the most recent `period` bars.
    pub fn latest(&self, bars: &[PriceBar]) -> IndicatorResult {
        match self.latest_price(&close_prices(bars)) {
            Some(value) => IndicatorResult::Computed {
                value,
                period: self.period,
            },
            None => {
                debug!(
                    required = self.period,
                    available = bars.len(),
                    "not enough data to calculate SMA"
                );
                IndicatorResult::InsufficientData {
                    required: self.period,
                    available: bars.len(),
                }
            }
        }
    }
}
