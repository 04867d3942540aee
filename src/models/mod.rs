use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::ConfigError;

/// One annual report of an Alpha Vantage statement.
///
/// Only `fiscalDateEnding` is typed; every other field is kept as delivered so
/// that a missing column reads as an empty value instead of a decode failure.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementReport {
    #[serde(rename = "fiscalDateEnding")]
    pub fiscal_date_ending: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl StatementReport {
    pub fn fiscal_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.fiscal_date_ending.trim(), "%Y-%m-%d").ok()
    }

    /// Numeric value of a field; absent, `"None"` or otherwise non-numeric values coerce to 0.
    pub fn numeric(&self, field: &str) -> f64 {
        self.fields.get(field).and_then(coerce_number).unwrap_or(0.0)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// The four annual statements used by the fundamentals report.
#[derive(Debug, Clone, Default)]
pub struct FundamentalStatements {
    pub income: Vec<StatementReport>,
    pub balance: Vec<StatementReport>,
    pub cash_flow: Vec<StatementReport>,
    pub earnings: Vec<StatementReport>,
}

/// A trading day close in the exchange's local calendar
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DividendEvent {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Daily closes and dividends for one ticker over a requested window
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    pub bars: Vec<PriceBar>,
    pub dividends: Vec<DividendEvent>,
}

/// A named metric row; one value per table column
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// Metrics down the side, periods across the top.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricTable {
    pub columns: Vec<String>,
    pub rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn row(&self, label: &str) -> Option<&MetricRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn row_labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }

    /// Value of a metric in a given column, `None` when either is missing or the cell is empty
    pub fn value(&self, label: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.row(label)?.values.get(col).copied().flatten()
    }
}

impl fmt::Display for MetricTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self
            .rows
            .iter()
            .map(|r| r.label.len())
            .max()
            .unwrap_or(0);

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| {
                r.values
                    .iter()
                    .map(|v| match v {
                        Some(v) => format!("{:.2}", v),
                        None => "NaN".to_string(),
                    })
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i).map(String::len))
                    .chain(std::iter::once(c.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:<label_width$}", "")?;
        for (column, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>width$}", column, width = *width)?;
        }
        writeln!(f)?;

        for (row, row_cells) in self.rows.iter().zip(&cells) {
            write!(f, "{:<label_width$}", row.label)?;
            for (cell, width) in row_cells.iter().zip(&widths) {
                write!(f, "  {:>width$}", cell, width = *width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Which report a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Fundamentals,
    YearlyPrices,
}

impl ReportKind {
    pub fn default_tickers(&self) -> &'static [&'static str] {
        match self {
            ReportKind::Fundamentals => &["JPM", "NVDA", "UBER", "XOM", "HII", "OR", "EL", "LMT"],
            ReportKind::YearlyPrices => &[
                "JPM", "NVDA", "TSLA", "CRM", "JNJ", "KO", "LPX", "MCO", "T", "V", "VZ", "WMT",
            ],
        }
    }

    pub fn default_output(&self) -> &'static str {
        match self {
            ReportKind::Fundamentals => "stocks_financial_data.xlsx",
            ReportKind::YearlyPrices => "stocks_yearly_data_horizontal.xlsx",
        }
    }

    pub fn default_start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(2012, 1, 1).unwrap_or_default()
    }
}

/// What to fetch and where to write it
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    /// Exclusive upper bound of the requested window
    pub end_date: NaiveDate,
    pub output_path: PathBuf,
}

impl ReportSettings {
    pub fn defaults(kind: ReportKind) -> Self {
        Self {
            tickers: kind.default_tickers().iter().map(|t| t.to_string()).collect(),
            start_date: kind.default_start_date(),
            end_date: Utc::now().date_naive(),
            output_path: PathBuf::from(kind.default_output()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::NoTickers);
        }
        if self.start_date >= self.end_date {
            return Err(ConfigError::InvalidRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub alpha_vantage_api_key: Option<String>,
    pub alpha_vantage_base_url: String,
    pub yahoo_base_url: String,
    pub user_agent: String,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alpha_vantage_api_key: None,
            alpha_vantage_base_url: "https://www.alphavantage.co/query".to_string(),
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            user_agent: "Mozilla/5.0 (compatible; stock-sheets/0.1)".to_string(),
            rate_limit_per_minute: 0,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if it exists
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Config {
            alpha_vantage_api_key: non_empty("ALPHA_VANTAGE_API_KEY"),
            alpha_vantage_base_url: non_empty("ALPHA_VANTAGE_BASE_URL")
                .unwrap_or(defaults.alpha_vantage_base_url),
            yahoo_base_url: non_empty("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            user_agent: non_empty("USER_AGENT").unwrap_or(defaults.user_agent),
            rate_limit_per_minute: parse_var(
                "RATE_LIMIT_PER_MINUTE",
                non_empty("RATE_LIMIT_PER_MINUTE"),
                defaults.rate_limit_per_minute,
            )?,
            request_timeout_secs: parse_var(
                "REQUEST_TIMEOUT_SECS",
                non_empty("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout_secs,
            )?,
        })
    }

    pub fn require_alpha_vantage_key(&self) -> Result<&str, ConfigError> {
        self.alpha_vantage_api_key
            .as_deref()
            .ok_or(ConfigError::MissingVar("ALPHA_VANTAGE_API_KEY"))
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: v }),
        None => Ok(default),
    }
}
