use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use url::Url;

use super::{build_http_client, ApiRateLimiter, PriceHistoryProvider};
use crate::error::ApiError;
use crate::models::{Config, DividendEvent, PriceBar, PriceHistory};
use crate::utils::unix_timestamp;

const PROVIDER: &str = "Yahoo Finance";

// `chart` endpoint schema
#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
    #[serde(default)]
    events: ChartEvents,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: HashMap<String, DividendPayload>,
}

#[derive(Debug, Deserialize)]
struct DividendPayload {
    amount: f64,
    date: i64,
}

fn local_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp + gmtoffset, 0).map(|dt| dt.date_naive())
}

impl ChartResult {
    /// Adjusted closes when the series lines up with the timestamps, raw closes otherwise
    fn closes(&self) -> Option<&[Option<f64>]> {
        let adjusted = self
            .indicators
            .adjclose
            .first()
            .map(|a| a.adjclose.as_slice())
            .filter(|a| a.len() == self.timestamp.len());
        adjusted.or_else(|| self.indicators.quote.first().map(|q| q.close.as_slice()))
    }

    fn into_history(self, start: NaiveDate, end: NaiveDate) -> PriceHistory {
        let in_window = |date: &NaiveDate| *date >= start && *date < end;
        let offset = self.meta.gmtoffset;

        let bars: Vec<PriceBar> = match self.closes() {
            Some(closes) => self
                .timestamp
                .iter()
                .zip(closes.iter())
                .filter_map(|(ts, close)| {
                    let close = (*close).filter(|c| c.is_finite())?;
                    let date = local_date(*ts, offset)?;
                    in_window(&date).then_some(PriceBar { date, close })
                })
                .collect(),
            None => Vec::new(),
        };

        let mut dividends: Vec<DividendEvent> = self
            .events
            .dividends
            .values()
            .filter_map(|d| {
                let date = local_date(d.date, offset)?;
                in_window(&date).then_some(DividendEvent { date, amount: d.amount })
            })
            .collect();
        dividends.sort_by_key(|d| d.date);

        PriceHistory { bars, dividends }
    }
}

/// Yahoo Finance chart API client
pub struct YahooChartClient {
    client: Client,
    base_url: String,
    rate_limiter: ApiRateLimiter,
}

impl YahooChartClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.yahoo_base_url.clone(),
            rate_limiter: ApiRateLimiter::new(config.rate_limit_per_minute),
        })
    }

    fn chart_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        url.query_pairs_mut()
            .append_pair("period1", &unix_timestamp(start).to_string())
            .append_pair("period2", &unix_timestamp(end).to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "div");
        Ok(url)
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooChartClient {
    async fn daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, ApiError> {
        let url = self.chart_url(ticker, start, end)?;
        debug!("Fetching price history from Yahoo Finance: {}", url);

        self.rate_limiter.wait().await;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let envelope: ChartEnvelope = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Status { provider: PROVIDER, status });
            }
            Err(source) => return Err(ApiError::Decode { provider: PROVIDER, source }),
        };

        if let Some(error) = envelope.chart.error {
            let message = match error.description {
                Some(description) => format!("{}: {}", error.code, description),
                None => error.code,
            };
            return Err(ApiError::Provider { provider: PROVIDER, message });
        }
        if !status.is_success() {
            return Err(ApiError::Status { provider: PROVIDER, status });
        }

        let result = envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ApiError::NoData { ticker: ticker.to_string() })?;

        let history = result.into_history(start, end);
        if history.bars.is_empty() {
            warn!("Yahoo Finance returned no closes for {} between {} and {}", ticker, start, end);
            return Err(ApiError::NoData { ticker: ticker.to_string() });
        }

        info!(
            "Fetched {} daily closes and {} dividends for {}",
            history.bars.len(),
            history.dividends.len(),
            ticker
        );
        Ok(history)
    }
}
