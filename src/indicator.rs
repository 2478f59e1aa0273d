pub mod ma;

use error_stack::Report;
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicator::ma::Sma;
use crate::model::PriceBar;

/// Outcome of computing an indicator over a bar sequence.
///
/// Too little history is an expected outcome, kept distinct from the
/// `Err` side which only carries invalid parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndicatorResult {
    Computed { value: f64, period: usize },
    InsufficientData { required: usize, available: usize },
}

impl IndicatorResult {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Computed { value, .. } => Some(*value),
            Self::InsufficientData { .. } => None,
        }
    }
}

/// Extract close prices from a slice of bars, preserving order.
pub fn close_prices(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Simple moving average of the last `period` closes in `bars`.
pub fn compute_sma(
    bars: &[PriceBar],
    period: usize,
) -> Result<IndicatorResult, Report<IndicatorError>> {
    Ok(Sma::new(period)?.latest(bars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fixture::bars_from_closes;

    #[test]
    fn five_closes_period_three() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let result = compute_sma(&bars, 3).unwrap();
        assert_eq!(
            result,
            IndicatorResult::Computed {
                value: 4.0,
                period: 3
            }
        );
    }

    #[test]
    fn two_closes_period_three_is_insufficient() {
        let bars = bars_from_closes(&[1.0, 2.0]);
        let result = compute_sma(&bars, 3).unwrap();
        assert_eq!(
            result,
            IndicatorResult::InsufficientData {
                required: 3,
                available: 2
            }
        );
        assert_eq!(result.value(), None);
    }

    #[test]
    fn empty_sequence_is_insufficient() {
        let result = compute_sma(&[], 1).unwrap();
        assert!(matches!(result, IndicatorResult::InsufficientData { .. }));
    }

    #[test]
    fn zero_period_is_error() {
        let bars = bars_from_closes(&[1.0]);
        assert!(compute_sma(&bars, 0).is_err());
    }

    #[test]
    fn shorter_than_period_never_numeric() {
        for period in 1..12 {
            for len in 0..period {
                let closes: Vec<f64> = (0..len).map(|i| i as f64 * 1.5).collect();
                let bars = bars_from_closes(&closes);
                let result = compute_sma(&bars, period).unwrap();
                assert_eq!(result.value(), None, "len {len} period {period}");
            }
        }
    }

    #[test]
    fn matches_mean_of_last_period_closes() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0).collect();
        let bars = bars_from_closes(&closes);
        for period in 1..=closes.len() {
            let tail = &closes[closes.len() - period..];
            let expected = tail.iter().sum::<f64>() / period as f64;
            let value = compute_sma(&bars, period).unwrap().value().unwrap();
            assert!((value - expected).abs() < 1e-9, "period {period}");
        }
    }

    #[test]
    fn input_is_not_mutated() {
        let bars = bars_from_closes(&[5.0, 3.0, 9.0, 1.0]);
        let before = bars.clone();
        let ptr = bars.as_ptr();
        compute_sma(&bars, 2).unwrap();
        assert_eq!(bars, before);
        assert_eq!(bars.as_ptr(), ptr);
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let json = serde_json::to_value(IndicatorResult::InsufficientData {
            required: 45,
            available: 3,
        })
        .unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["required"], 45);
    }
}
