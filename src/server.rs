mod error;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use error_stack::Report;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::PlaygroundConfig;
use crate::error::SymbolError;
use crate::fetcher::AggregateFetcher;
use crate::logging::ErrorLog;
use crate::model::Symbol;

/// Everything a request handler needs, built once in `main`.
pub struct AppState {
    pub fetcher: AggregateFetcher,
    pub errors: Arc<dyn ErrorLog>,
    pub playground: Playground,
}

/// Fixed parameters of the playground routes.
#[derive(Debug, Clone)]
pub struct Playground {
    pub ticker: Symbol,
    pub period: usize,
    pub lookback_days: u32,
}

impl Playground {
    pub fn from_config(config: &PlaygroundConfig) -> Result<Self, Report<SymbolError>> {
        Ok(Self {
            ticker: Symbol::parse(&config.ticker)?,
            period: config.period,
            lookback_days: config.lookback_days,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/v1/api/playground",
            get(handlers::playground).post(handlers::playground_bars),
        )
        .route("/v1/api/tickers/{ticker}", get(handlers::ticker_details))
        .route(
            "/v1/api/tickers/{ticker}/previous-close",
            get(handlers::previous_close),
        )
        .route(
            "/v1/api/tickers/{ticker}/aggregates",
            get(handlers::aggregates),
        )
        .route(
            "/v1/api/tickers/{ticker}/statistics",
            get(handlers::statistics),
        )
        .layer(middleware::from_fn(request_span))
        .with_state(Arc::new(state))
}

/// Run each request inside a span tagged with a fresh request id.
async fn request_span(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    );
    async move {
        let response = next.run(request).await;
        tracing::debug!(status = response.status().as_u16(), "request finished");
        response
    }
    .instrument(span)
    .await
}
