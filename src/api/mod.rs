use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::ApiError;
use crate::models::{Config, PriceHistory, StatementReport};

pub mod alpha_vantage_client;
pub mod yahoo_client;
pub use alpha_vantage_client::AlphaVantageClient;
pub use yahoo_client::YahooChartClient;

/// Simple rate limiter for API requests.
///
/// Spaces consecutive requests at least `60s / requests_per_minute` apart.
/// A limit of 0 disables pacing.
pub struct ApiRateLimiter {
    delay: Option<Duration>,
    last_request: Mutex<Option<Instant>>,
}

impl ApiRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let delay = (requests_per_minute > 0)
            .then(|| Duration::from_millis(60_000 / requests_per_minute as u64));

        Self {
            delay,
            last_request: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let Some(delay) = self.delay else {
            return;
        };

        let pause = {
            let mut last = match self.last_request.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let now = Instant::now();
            let pause = last
                .map(|prev| delay.saturating_sub(now.duration_since(prev)))
                .unwrap_or_default();
            *last = Some(now + pause);
            pause
        };

        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}

/// Shared reqwest client with the configured timeout and user agent
pub fn build_http_client(config: &Config) -> Result<Client, ApiError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(config.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Annual fundamental statements for a ticker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn income_statement(&self, ticker: &str) -> Result<Vec<StatementReport>, ApiError>;
    async fn balance_sheet(&self, ticker: &str) -> Result<Vec<StatementReport>, ApiError>;
    async fn cash_flow(&self, ticker: &str) -> Result<Vec<StatementReport>, ApiError>;
    async fn earnings(&self, ticker: &str) -> Result<Vec<StatementReport>, ApiError>;
}

/// Daily closes and dividends; `start` inclusive, `end` exclusive
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    async fn daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, ApiError>;
}
