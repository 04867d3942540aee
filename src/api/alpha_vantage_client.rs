use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, info};
use url::Url;

use super::{build_http_client, ApiRateLimiter, FundamentalsProvider};
use crate::error::ApiError;
use crate::models::{Config, StatementReport};
use crate::utils::redact_api_key;

const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage fundamental data endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFunction {
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    Earnings,
}

impl StatementFunction {
    pub fn as_query(&self) -> &'static str {
        match self {
            StatementFunction::IncomeStatement => "INCOME_STATEMENT",
            StatementFunction::BalanceSheet => "BALANCE_SHEET",
            StatementFunction::CashFlow => "CASH_FLOW",
            StatementFunction::Earnings => "EARNINGS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatementFunction::IncomeStatement => "income statement",
            StatementFunction::BalanceSheet => "balance sheet",
            StatementFunction::CashFlow => "cash flow",
            StatementFunction::Earnings => "earnings",
        }
    }
}

/// Annual statement payload. Statements use `annualReports`, earnings use `annualEarnings`.
/// Errors and rate-limit notices come back with HTTP 200 under one of the message keys.
#[derive(Debug, Deserialize)]
struct AnnualResponse {
    #[serde(rename = "annualReports", alias = "annualEarnings", default)]
    annual_reports: Option<Vec<StatementReport>>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
}

impl AnnualResponse {
    fn provider_message(&self) -> Option<&str> {
        self.error_message
            .as_deref()
            .or(self.note.as_deref())
            .or(self.information.as_deref())
    }
}

/// Alpha Vantage API client
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: ApiRateLimiter,
}

impl AlphaVantageClient {
    pub fn new(api_key: impl Into<String>, config: &Config) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_http_client(config)?,
            api_key: api_key.into(),
            base_url: config.alpha_vantage_base_url.clone(),
            rate_limiter: ApiRateLimiter::new(config.rate_limit_per_minute),
        })
    }

    fn request_url(&self, function: StatementFunction, ticker: &str) -> Result<Url, ApiError> {
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("function", function.as_query()),
                ("symbol", ticker),
                ("apikey", self.api_key.as_str()),
            ],
        )?;
        Ok(url)
    }

    /// Fetch the annual reports of one statement for a ticker
    pub async fn fetch_annual_reports(
        &self,
        function: StatementFunction,
        ticker: &str,
    ) -> Result<Vec<StatementReport>, ApiError> {
        let url = self.request_url(function, ticker)?;
        debug!("Fetching {} from Alpha Vantage: {}", function.label(), redact_api_key(url.as_str()));

        self.rate_limiter.wait().await;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let parsed: AnnualResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Status { provider: PROVIDER, status });
            }
            Err(source) => return Err(ApiError::Decode { provider: PROVIDER, source }),
        };

        if let Some(message) = parsed.provider_message() {
            return Err(ApiError::Provider {
                provider: PROVIDER,
                message: message.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status { provider: PROVIDER, status });
        }

        let reports = match parsed.annual_reports {
            Some(reports) if !reports.is_empty() => reports,
            _ => return Err(ApiError::NoData { ticker: ticker.to_string() }),
        };

        let columns: BTreeSet<&str> = reports.iter().flat_map(|r| r.field_names()).collect();
        debug!("Available columns in {} for {}: {:?}", function.label(), ticker, columns);
        info!("Fetched {} annual {} reports for {}", reports.len(), function.label(), ticker);

        Ok(reports)
    }
}

#[async_trait]
impl FundamentalsProvider for AlphaVantageClient {
    async fn income_statement(&self, ticker: &str) -> Result<Vec<StatementReport>, ApiError> {
        self.fetch_annual_reports(StatementFunction::IncomeStatement, ticker).await
    }

    async fn balance_sheet(&self, ticker: &str) -> Result<Vec<StatementReport>, ApiError> {
        self.fetch_annual_reports(StatementFunction::BalanceSheet, ticker).await
    }

    async fn cash_flow(&self, ticker: &str) -> Result<Vec<StatementReport>, ApiError> {
        self.fetch_annual_reports(StatementFunction::CashFlow, ticker).await
    }

    async fn earnings(&self, ticker: &str) -> Result<Vec<StatementReport>, ApiError> {
        self.fetch_annual_reports(StatementFunction::Earnings, ticker).await
    }
}
