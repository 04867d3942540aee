//! Error types shared by the API clients, the workbook writer and the report pipelines.

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to a market-data provider.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (DNS, connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status without a provider error payload
    #[error("Unexpected HTTP status {status} from {provider}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
    },

    /// The provider answered with an error message (invalid symbol, rate limit notice, ...)
    #[error("{provider} returned an error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// The response parsed but carried no usable rows
    #[error("No data returned for {ticker}")]
    NoData { ticker: String },

    /// The body could not be decoded
    #[error("Failed to decode {provider} response: {source}")]
    Decode {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Data-level failures only affect one ticker; the report moves on to the next one.
    /// Transport and status failures abort the whole run.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ApiError::Provider { .. } | ApiError::NoData { .. } | ApiError::Decode { .. }
        )
    }
}

/// Failures preparing or writing the output workbook.
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("{}: {source}. Please close the file if it's open and try again.", .path.display())]
    OutputLocked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid sheet name '{0}'")]
    InvalidSheetName(String),

    #[error("Sheet '{0}' already exists in the workbook")]
    DuplicateSheet(String),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Failures loading configuration from the environment or command line.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable required")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid date '{0}': expected YYYY-MM-DD or YYYYMMDD")]
    InvalidDate(String),

    #[error("Start date ({start}) must be earlier than end date ({end})")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("No ticker symbols configured")]
    NoTickers,
}

/// Failures that abort a report run.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Workbook(#[from] WorkbookError),
}
