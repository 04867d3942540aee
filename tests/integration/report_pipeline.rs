//! End-to-end report runs: real clients, mock providers, real workbook on disk

use calamine::Data;
use pretty_assertions::assert_eq;
use stock_sheets::api::{AlphaVantageClient, PriceHistoryProvider, YahooChartClient};
use stock_sheets::report::{fetch_statements, run_fundamentals_report, run_price_report};
use stock_sheets::transform::{
    fundamentals_table, yearly_price_table, FUNDAMENTAL_METRICS, YEARLY_PRICE_METRICS,
};
use stock_sheets::{ApiError, ReportError, WorkbookError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{config_for, fixtures, logging::log_test_step, settings, xlsx};

async fn mount_fundamentals(server: &MockServer, symbol: &str) {
    let payloads = [
        ("INCOME_STATEMENT", fixtures::income_statement(symbol)),
        ("BALANCE_SHEET", fixtures::balance_sheet(symbol)),
        ("CASH_FLOW", fixtures::cash_flow(symbol)),
        ("EARNINGS", fixtures::earnings(symbol)),
    ];
    for (function, body) in payloads {
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", function))
            .and(query_param("symbol", symbol))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }
}

async fn mount_invalid_symbol(server: &MockServer, symbol: &str) {
    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("symbol", symbol))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::invalid_symbol()))
        .mount(server)
        .await;
}

#[test_log::test(tokio::test)]
async fn test_fundamentals_report_writes_one_sheet_per_good_ticker() {
    log_test_step("Fundamentals report with one failing ticker");
    let server = MockServer::start().await;
    mount_fundamentals(&server, "XOM").await;
    mount_invalid_symbol(&server, "NOPE").await;
    mount_fundamentals(&server, "LMT").await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("stocks_financial_data.xlsx");
    let settings = settings(&["XOM", "NOPE", "LMT"], &output);
    let client = AlphaVantageClient::new("test_key", &config_for(&server)).unwrap();

    let summary = run_fundamentals_report(&client, &settings).await.unwrap();

    assert_eq!(summary.written, vec!["XOM".to_string(), "LMT".to_string()]);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].ticker, "NOPE");
    assert!(!summary.placeholder_added);
    assert_eq!(xlsx::sheet_names(&output), vec!["XOM", "LMT"]);

    let sheet = xlsx::sheet(&output, "XOM");
    assert_eq!(xlsx::cell(&sheet, 0, 1), Some(Data::Float(2022.0)));
    assert_eq!(xlsx::cell(&sheet, 0, 2), Some(Data::Float(2023.0)));
    assert_eq!(xlsx::cell(&sheet, 1, 0), Some(Data::String("Revenue".to_string())));
    assert_eq!(xlsx::cell(&sheet, 1, 2), Some(Data::Float(344_582.0)));
}

#[test_log::test(tokio::test)]
async fn test_fundamentals_table_for_complete_ticker() {
    let server = MockServer::start().await;
    mount_fundamentals(&server, "XOM").await;

    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&["XOM"], &dir.path().join("out.xlsx"));
    let client = AlphaVantageClient::new("test_key", &config_for(&server)).unwrap();

    let statements = fetch_statements(&client, "XOM").await.unwrap();
    let table = fundamentals_table(&statements, settings.start_date, settings.end_date);

    assert_eq!(table.row_labels(), FUNDAMENTAL_METRICS.to_vec());
    assert_eq!(table.columns, vec!["2022", "2023"]);
    assert_eq!(table.value("Revenue", "2023"), Some(344_582.0));
    assert_eq!(table.value("Net Income", "2022"), Some(55_740.0));
    assert_eq!(table.value("EPS", "2022"), Some(14.06));
    assert_eq!(table.value("Shareholder Equity", "2023"), Some(204_802.0));
    assert_eq!(table.value("Dividends per Share", "2022"), Some(0.0));
    let dps = table.value("Dividends per Share", "2023").unwrap();
    assert!((dps - 14_941.0 / 3_979.0).abs() < 1e-9);
}

#[test_log::test(tokio::test)]
async fn test_every_ticker_failing_still_yields_one_sheet() {
    let server = MockServer::start().await;
    mount_invalid_symbol(&server, "AAA").await;
    mount_invalid_symbol(&server, "BBB").await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("stocks_financial_data.xlsx");
    let client = AlphaVantageClient::new("test_key", &config_for(&server)).unwrap();

    let summary = run_fundamentals_report(&client, &settings(&["AAA", "BBB"], &output))
        .await
        .unwrap();

    assert!(summary.written.is_empty());
    assert_eq!(summary.skipped.len(), 2);
    assert!(summary.placeholder_added);
    assert_eq!(xlsx::sheet_names(&output), vec!["Sheet1"]);
}

#[test_log::test(tokio::test)]
async fn test_price_report_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/KO"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::chart("KO")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/GONE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(fixtures::chart_not_found()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("stocks_yearly_data_horizontal.xlsx");
    let settings = settings(&["GONE", "KO"], &output);
    let client = YahooChartClient::new(&config_for(&server)).unwrap();

    let summary = run_price_report(&client, &settings).await.unwrap();
    assert_eq!(summary.written, vec!["KO".to_string()]);
    assert_eq!(summary.skipped[0].ticker, "GONE");
    assert_eq!(xlsx::sheet_names(&output), vec!["KO"]);

    let sheet = xlsx::sheet(&output, "KO");
    assert_eq!(xlsx::cell(&sheet, 0, 0), None);
    assert_eq!(xlsx::cell(&sheet, 0, 1), Some(Data::Float(2022.0)));
    assert_eq!(xlsx::cell(&sheet, 0, 2), Some(Data::Float(2023.0)));
    assert_eq!(xlsx::cell(&sheet, 1, 0), Some(Data::String("Min Price".to_string())));
    assert_eq!(xlsx::cell(&sheet, 1, 1), Some(Data::Float(55.0)));
    assert_eq!(xlsx::cell(&sheet, 2, 2), Some(Data::Float(59.0)));
    assert_eq!(xlsx::cell(&sheet, 3, 0), Some(Data::String("Dividends".to_string())));
    assert_eq!(xlsx::cell(&sheet, 3, 1), Some(Data::Float(0.44)));
    assert_eq!(xlsx::cell(&sheet, 3, 2), Some(Data::Float(0.46)));

    let history = client
        .daily_history("KO", settings.start_date, settings.end_date)
        .await
        .unwrap();
    let table = yearly_price_table(&history);
    assert_eq!(table.row_labels(), YEARLY_PRICE_METRICS.to_vec());
    assert_eq!(table.columns, vec!["2022", "2023"]);
    assert_eq!(table.value("Min Price", "2022"), Some(55.0));
    assert_eq!(table.value("Max Price", "2022"), Some(58.0));
    assert_eq!(table.value("Min Price", "2023"), Some(57.5));
    assert_eq!(table.value("Max Price", "2023"), Some(59.0));
    assert_eq!(table.value("Dividends", "2023"), Some(0.46));
}

#[test_log::test(tokio::test)]
async fn test_server_failure_aborts_and_keeps_previous_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("stocks_yearly_data_horizontal.xlsx");
    std::fs::write(&output, b"previous run").unwrap();
    let client = YahooChartClient::new(&config_for(&server)).unwrap();

    let result = run_price_report(&client, &settings(&["KO"], &output)).await;
    assert!(matches!(result, Err(ReportError::Api(ApiError::Status { .. }))));
    assert_eq!(std::fs::read(&output).unwrap(), b"previous run");
}

#[test_log::test(tokio::test)]
async fn test_unwritable_output_fails_before_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::chart("KO")))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = YahooChartClient::new(&config_for(&server)).unwrap();

    // The output path is a directory, which cannot be opened for writing
    let result = run_price_report(&client, &settings(&["KO"], dir.path())).await;
    assert!(matches!(
        result,
        Err(ReportError::Workbook(WorkbookError::OutputLocked { .. }))
    ));
}
