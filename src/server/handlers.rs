use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use chrono::Utc;
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::error::ApiError;
use crate::error::PipelineError;
use crate::indicator::IndicatorResult;
use crate::model::{PreviousClose, PriceBar, Symbol, TickerDetails, Timespan};
use crate::pipeline::analyze;
use crate::stats::{LatestStatistics, format_currency};

const SERVICE_NAME: &str = "AI Trade Insights";

#[derive(Debug, Deserialize)]
pub struct PlaygroundRequest {
    /// Missing is treated like blank and rejected by `parse_ticker`.
    #[serde(default)]
    pub ticker: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaygroundResponse {
    /// `None` when there are fewer bars than `period`.
    pub sma: Option<String>,
    pub ticker: Symbol,
    pub period: usize,
    /// Raw outcome, including `required`/`available` counts when short.
    pub indicator: IndicatorResult,
    pub aggs: Vec<PriceBar>,
}

#[derive(Debug, Deserialize)]
pub struct AggregatesParams {
    pub timespan: Option<Timespan>,
    pub days: Option<u32>,
}

fn parse_ticker(raw: &str) -> Result<Symbol, ApiError> {
    Symbol::parse(raw).map_err(|e| ApiError::bad_request(e.current_context().to_string()))
}

async fn failed(state: &AppState, route: &str, report: Report<PipelineError>) -> ApiError {
    ApiError::from_failure(state.errors.as_ref(), route, &report).await
}

pub async fn root() -> Json<Value> {
    info!("root pinged");
    Json(json!({ "message": SERVICE_NAME }))
}

pub async fn health() -> Json<Value> {
    info!("health check pinged");
    Json(json!({ "message": "pong" }))
}

/// `GET /v1/api/playground`: SMA of the configured ticker plus its bars.
pub async fn playground(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PlaygroundResponse>, ApiError> {
    let params = &state.playground;
    let analysis = match analyze(
        &state.fetcher,
        &params.ticker,
        params.lookback_days,
        params.period,
    )
    .await
    {
        Ok(analysis) => analysis,
        Err(report) => return Err(failed(&state, "GET /v1/api/playground", report).await),
    };

    Ok(Json(PlaygroundResponse {
        sma: analysis.sma.value().map(format_currency),
        ticker: analysis.ticker,
        period: analysis.period,
        indicator: analysis.sma,
        aggs: analysis.bars,
    }))
}

/// `POST /v1/api/playground`: raw daily bars for the requested ticker.
pub async fn playground_bars(
    State(state): State<Arc<AppState>>,
    request: Result<Json<PlaygroundRequest>, JsonRejection>,
) -> Result<Json<Vec<PriceBar>>, ApiError> {
    let Json(request) = request?;
    let ticker = parse_ticker(request.ticker.as_deref().unwrap_or_default())?;

    let fetched = state
        .fetcher
        .fetch(&ticker, state.playground.lookback_days)
        .await
        .change_context_lazy(|| PipelineError::Fetch {
            ticker: ticker.to_string(),
        });

    match fetched {
        Ok(bars) => Ok(Json(bars)),
        Err(report) => Err(failed(&state, "POST /v1/api/playground", report).await),
    }
}

/// `GET /v1/api/tickers/{ticker}/aggregates?timespan=minute&days=1`
///
/// Defaults to daily bars over the playground lookback window. `days`
/// is capped per timespan so one provider response covers the window.
pub async fn aggregates(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    params: Result<Query<AggregatesParams>, QueryRejection>,
) -> Result<Json<Vec<PriceBar>>, ApiError> {
    let Query(params) = params?;
    let ticker = parse_ticker(&ticker)?;
    let timespan = params.timespan.unwrap_or(Timespan::Day);
    let days = params.days.unwrap_or(state.playground.lookback_days);
    if days == 0 {
        return Err(ApiError::bad_request("days must be > 0"));
    }
    let max_days = state.fetcher.max_lookback_days(timespan);
    if days > max_days {
        return Err(ApiError::bad_request(format!(
            "days must be <= {max_days} for {timespan} bars"
        )));
    }

    let fetched = state
        .fetcher
        .fetch_bars(&ticker, timespan, days, Utc::now().date_naive())
        .await
        .change_context_lazy(|| PipelineError::Fetch {
            ticker: ticker.to_string(),
        });

    match fetched {
        Ok(bars) => Ok(Json(bars)),
        Err(report) => {
            Err(failed(&state, "GET /v1/api/tickers/{ticker}/aggregates", report).await)
        }
    }
}

/// `GET /v1/api/tickers/{ticker}/statistics`: latest-bar figures.
pub async fn statistics(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<Json<LatestStatistics>, ApiError> {
    let ticker = parse_ticker(&ticker)?;

    let fetched = state
        .fetcher
        .fetch(&ticker, state.playground.lookback_days)
        .await
        .change_context_lazy(|| PipelineError::Fetch {
            ticker: ticker.to_string(),
        });

    match fetched {
        Ok(bars) => Ok(Json(LatestStatistics::from_bars(ticker, &bars))),
        Err(report) => {
            Err(failed(&state, "GET /v1/api/tickers/{ticker}/statistics", report).await)
        }
    }
}

/// `GET /v1/api/tickers/{ticker}/previous-close`
pub async fn previous_close(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<Json<PreviousClose>, ApiError> {
    let ticker = parse_ticker(&ticker)?;

    let looked_up = state
        .fetcher
        .provider()
        .previous_close(&ticker)
        .await
        .change_context_lazy(|| PipelineError::Lookup {
            ticker: ticker.to_string(),
        });
    let previous = match looked_up {
        Ok(previous) => previous,
        Err(report) => {
            let route = "GET /v1/api/tickers/{ticker}/previous-close";
            return Err(failed(&state, route, report).await);
        }
    };

    previous
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no previous close for {ticker}")))
}

/// `GET /v1/api/tickers/{ticker}`
pub async fn ticker_details(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<Json<TickerDetails>, ApiError> {
    let ticker = parse_ticker(&ticker)?;

    let looked_up = state
        .fetcher
        .provider()
        .ticker_details(&ticker)
        .await
        .change_context_lazy(|| PipelineError::Lookup {
            ticker: ticker.to_string(),
        });
    let details = match looked_up {
        Ok(details) => details,
        Err(report) => return Err(failed(&state, "GET /v1/api/tickers/{ticker}", report).await),
    };

    details
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("unknown ticker {ticker}")))
}
