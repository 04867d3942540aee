use chrono::{NaiveDate, NaiveTime};

use crate::error::ConfigError;

/// Parse a date given as `YYYY-MM-DD` or `YYYYMMDD`
pub fn parse_date(date_str: &str) -> Result<NaiveDate, ConfigError> {
    let trimmed = date_str.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y%m%d") {
            return Ok(date);
        }
    }
    Err(ConfigError::InvalidDate(date_str.to_string()))
}

/// Trim, upper-case and de-duplicate ticker symbols, keeping first-seen order.
pub fn normalize_tickers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tickers: Vec<String> = Vec::new();
    for symbol in raw {
        let symbol = symbol.as_ref().trim().to_uppercase();
        if !symbol.is_empty() && !tickers.contains(&symbol) {
            tickers.push(symbol);
        }
    }
    tickers
}

/// Midnight UTC of a date as a unix timestamp
pub fn unix_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::default()).and_utc().timestamp()
}

/// Hide the API key before a request URL goes into the logs
pub fn redact_api_key(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| {
                    let v = if k == "apikey" { "***".to_string() } else { v.into_owned() };
                    (k.into_owned(), v)
                })
                .collect();
            if pairs.is_empty() {
                return parsed.to_string();
            }
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}
