//! Yahoo Finance chart client against a mock server

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use stock_sheets::api::{PriceHistoryProvider, YahooChartClient};
use stock_sheets::models::{DividendEvent, PriceBar};
use stock_sheets::ApiError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{config_for, date, fixtures};

#[test_log::test(tokio::test)]
async fn test_daily_history_uses_adjusted_local_closes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/KO"))
        .and(query_param("interval", "1d"))
        .and(query_param("events", "div"))
        .and(query_param("period1", "1325376000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::chart("KO")))
        .expect(1)
        .mount(&server)
        .await;

    let client = YahooChartClient::new(&config_for(&server)).unwrap();
    let history = client
        .daily_history("KO", date(2012, 1, 1), date(2024, 7, 11))
        .await
        .unwrap();

    assert_eq!(
        history.bars,
        vec![
            PriceBar { date: date(2022, 1, 3), close: 55.0 },
            PriceBar { date: date(2022, 7, 4), close: 58.0 },
            PriceBar { date: date(2023, 1, 3), close: 57.5 },
            PriceBar { date: date(2023, 12, 29), close: 59.0 },
        ]
    );
    assert_eq!(
        history.dividends,
        vec![
            DividendEvent { date: date(2022, 3, 15), amount: 0.44 },
            DividendEvent { date: date(2023, 3, 13), amount: 0.46 },
        ]
    );
}

#[test_log::test(tokio::test)]
async fn test_unknown_symbol_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/DELISTED"))
        .respond_with(ResponseTemplate::new(404).set_body_json(fixtures::chart_not_found()))
        .mount(&server)
        .await;

    let client = YahooChartClient::new(&config_for(&server)).unwrap();
    let err = client
        .daily_history("DELISTED", date(2012, 1, 1), date(2024, 7, 11))
        .await
        .unwrap_err();

    assert_matches!(&err, ApiError::Provider { message, .. } if message.starts_with("Not Found"));
    assert!(err.is_skippable());
}

#[test_log::test(tokio::test)]
async fn test_empty_result_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/EMPTY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::chart_empty()))
        .mount(&server)
        .await;

    let client = YahooChartClient::new(&config_for(&server)).unwrap();
    let err = client
        .daily_history("EMPTY", date(2012, 1, 1), date(2024, 7, 11))
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::NoData { .. });
}

#[test_log::test(tokio::test)]
async fn test_gateway_error_without_body_is_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = YahooChartClient::new(&config_for(&server)).unwrap();
    let err = client
        .daily_history("KO", date(2012, 1, 1), date(2024, 7, 11))
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Status { .. });
}
