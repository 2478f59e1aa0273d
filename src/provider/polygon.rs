use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderMessage};
use crate::model::{AggregateQuery, PreviousClose, PriceBar, Symbol, TickerDetails};
use crate::provider::MarketData;

const PROVIDER: &str = "polygon";

pub struct PolygonClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    rate_limit_wait: Duration,
}

impl PolygonClient {
    pub fn new(api_key: String, config: &ProviderConfig) -> Result<Self, Report<ProviderError>> {
        let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            Report::new(ProviderError::Configuration {
                provider: PROVIDER.into(),
            })
            .attach("requests_per_minute must be > 0")
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .change_context(ProviderError::Configuration {
                provider: PROVIDER.into(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
            rate_limit_wait: Duration::from_secs(config.rate_limit_wait_secs),
        })
    }

    /// Take one request from the client-side quota, waiting at most
    /// `rate_limit_wait` for it to refill.
    async fn acquire_permit(&self) -> Result<(), Report<ProviderError>> {
        let exhausted = || {
            Report::new(ProviderError::RateLimit {
                provider: PROVIDER.into(),
            })
            .attach(format!(
                "client-side quota still exhausted after {:?}",
                self.rate_limit_wait
            ))
        };

        if self.rate_limit_wait.is_zero() {
            return self.rate_limiter.check().map_err(|_| exhausted());
        }
        tokio::time::timeout(self.rate_limit_wait, self.rate_limiter.until_ready())
            .await
            .map_err(|_| exhausted())
    }

    /// GET `path` and decode the JSON body; `Ok(None)` on HTTP 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, Report<ProviderError>> {
        self.acquire_permit().await?;

        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "polygon request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(params)
            .send()
            .await
            .change_context(ProviderError::Connection {
                provider: PROVIDER.into(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Report::new(classify_status(status))
                .attach(format!("HTTP status: {status}"))
                .attach(ProviderMessage(error_message(&body, status))));
        }

        let parsed = response
            .json::<T>()
            .await
            .change_context(ProviderError::ResponseParse {
                provider: PROVIDER.into(),
            })?;

        Ok(Some(parsed))
    }
}

impl MarketData for PolygonClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn fetch_aggregates(
        &self,
        query: &AggregateQuery,
    ) -> BoxFuture<'_, Result<Vec<PriceBar>, Report<ProviderError>>> {
        let query = query.clone();
        Box::pin(async move {
            let path = format!(
                "/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
                query.ticker,
                query.multiplier,
                query.timespan,
                query.range.from_param(),
                query.range.to_param(),
            );
            let params = [
                ("adjusted", query.adjusted.to_string()),
                ("sort", "asc".to_owned()),
                ("limit", query.limit.to_string()),
            ];

            let Some(body) = self.get_json::<PolygonAggsResponse>(&path, &params).await? else {
                return Ok(Vec::new());
            };
            body.ensure_ok()?;
            if body.next_url.is_some() {
                warn!(
                    ticker = %query.ticker,
                    timespan = %query.timespan,
                    range = %query.range,
                    limit = query.limit,
                    "polygon truncated the aggregate window; later bars were not returned"
                );
            }

            let bars: Vec<PriceBar> = body
                .results
                .unwrap_or_default()
                .into_iter()
                .map(PolygonAgg::into_bar)
                .collect();

            info!(
                ticker = %query.ticker,
                timespan = %query.timespan,
                range = %query.range,
                fetched = bars.len(),
                "polygon aggregate fetch complete"
            );

            Ok(bars)
        })
    }

    fn previous_close(
        &self,
        ticker: &Symbol,
    ) -> BoxFuture<'_, Result<Option<PreviousClose>, Report<ProviderError>>> {
        let ticker = ticker.clone();
        Box::pin(async move {
            let path = format!("/v2/aggs/ticker/{ticker}/prev");
            let params = [("adjusted", "true".to_owned())];

            let Some(body) = self.get_json::<PolygonAggsResponse>(&path, &params).await? else {
                return Ok(None);
            };
            body.ensure_ok()?;

            Ok(body
                .results
                .unwrap_or_default()
                .into_iter()
                .next()
                .map(|agg| PreviousClose {
                    ticker,
                    bar: agg.into_bar(),
                }))
        })
    }

    fn ticker_details(
        &self,
        ticker: &Symbol,
    ) -> BoxFuture<'_, Result<Option<TickerDetails>, Report<ProviderError>>> {
        let ticker = ticker.clone();
        Box::pin(async move {
            let path = format!("/v3/reference/tickers/{ticker}");

            let body = self
                .get_json::<PolygonTickerDetailsResponse>(&path, &[])
                .await?;

            Ok(body.and_then(|b| b.results).map(PolygonTickerDetails::into_details))
        })
    }
}

fn classify_status(status: StatusCode) -> ProviderError {
    let provider = PROVIDER.to_owned();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Authentication { provider }
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimit { provider },
        _ => ProviderError::Request { provider },
    }
}

/// Pull the provider's own message out of an error body, falling back to
/// the status text.
fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<PolygonErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_owned()
        })
}

// ── REST response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PolygonErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// `{ "ticker": "...", "status": "OK", "resultsCount": n, "results": [...] }`
///
/// `results` is omitted entirely when the ticker has no data in range.
#[derive(Debug, Deserialize)]
struct PolygonAggsResponse {
    status: Option<String>,
    error: Option<String>,
    results: Option<Vec<PolygonAgg>>,
    /// Present when more bars exist past `limit`.
    next_url: Option<String>,
}

impl PolygonAggsResponse {
    fn ensure_ok(&self) -> Result<(), Report<ProviderError>> {
        if self.status.as_deref() == Some("ERROR") {
            return Err(Report::new(ProviderError::Request {
                provider: PROVIDER.into(),
            })
            .attach(ProviderMessage(
                self.error.clone().unwrap_or_else(|| "status ERROR".into()),
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PolygonAgg {
    #[serde(rename = "t")]
    timestamp: i64,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v", default)]
    volume: f64,
    #[serde(rename = "vw")]
    vwap: Option<f64>,
    #[serde(rename = "n")]
    transactions: Option<u64>,
}

impl PolygonAgg {
    fn into_bar(self) -> PriceBar {
        PriceBar {
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            vwap: self.vwap,
            transactions: self.transactions,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PolygonTickerDetailsResponse {
    results: Option<PolygonTickerDetails>,
}

#[derive(Debug, Deserialize)]
struct PolygonTickerDetails {
    ticker: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    market: String,
    #[serde(default)]
    locale: String,
    primary_exchange: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    active: bool,
}

impl PolygonTickerDetails {
    fn into_details(self) -> TickerDetails {
        TickerDetails {
            ticker: self.ticker,
            name: self.name,
            market: self.market,
            locale: self.locale,
            primary_exchange: self.primary_exchange,
            kind: self.kind,
            active: self.active,
        }
    }
}
