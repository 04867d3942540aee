//! The two report pipelines: fetch one ticker at a time, reshape, append a sheet.
//!
//! Data-level failures skip the ticker and the loop continues; transport and
//! workbook failures end the run.

use std::future::Future;
use std::path::Path;
use tracing::{error, info, warn};

use crate::api::{FundamentalsProvider, PriceHistoryProvider};
use crate::error::{ApiError, ReportError, WorkbookError};
use crate::models::{FundamentalStatements, MetricTable, ReportSettings};
use crate::transform::{fundamentals_table, yearly_price_table};
use crate::workbook::{ensure_output_writable, ReportWorkbook};

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: String,
}

/// Outcome of a report run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSummary {
    /// Sheet names written, in ticker order
    pub written: Vec<String>,
    pub skipped: Vec<SkippedTicker>,
    pub placeholder_added: bool,
}

impl ReportSummary {
    fn skip(&mut self, ticker: &str, reason: String) {
        warn!("Error for {}: {}", ticker, reason);
        println!("Error for {}: {}", ticker, reason);
        self.skipped.push(SkippedTicker {
            ticker: ticker.to_string(),
            reason,
        });
    }
}

/// Fetch the four annual statements for a ticker.
///
/// A ticker without an earnings history still gets a sheet; its EPS falls back
/// to the income statement.
pub async fn fetch_statements<P>(provider: &P, ticker: &str) -> Result<FundamentalStatements, ApiError>
where
    P: FundamentalsProvider + ?Sized,
{
    let income = provider.income_statement(ticker).await?;
    let balance = provider.balance_sheet(ticker).await?;
    let cash_flow = provider.cash_flow(ticker).await?;
    let earnings = match provider.earnings(ticker).await {
        Ok(earnings) => earnings,
        Err(ApiError::NoData { .. }) => {
            warn!("No earnings history for {}; EPS taken from the income statement", ticker);
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    Ok(FundamentalStatements {
        income,
        balance,
        cash_flow,
        earnings,
    })
}

async fn write_ticker_sheets<F, Fut>(
    tickers: &[String],
    workbook: &mut ReportWorkbook,
    title: &str,
    mut build: F,
) -> Result<ReportSummary, ReportError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<MetricTable, ApiError>>,
{
    let mut summary = ReportSummary::default();

    for ticker in tickers {
        info!("Processing {}", ticker);

        let table = match build(ticker.clone()).await {
            Ok(table) => table,
            Err(e) if e.is_skippable() => {
                summary.skip(ticker, e.to_string());
                continue;
            }
            Err(e) => {
                error!("Aborting report at {}: {}", ticker, e);
                return Err(e.into());
            }
        };

        match workbook.add_table_sheet(ticker, &table) {
            Ok(sheet_name) => {
                println!("\n{} {}:\n{}", title, ticker, table);
                summary.written.push(sheet_name);
            }
            Err(e @ (WorkbookError::InvalidSheetName(_) | WorkbookError::DuplicateSheet(_))) => {
                summary.skip(ticker, e.to_string());
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        "{} of {} tickers written, {} skipped",
        summary.written.len(),
        tickers.len(),
        summary.skipped.len()
    );
    Ok(summary)
}

/// Append one fundamentals sheet per ticker to `workbook`
pub async fn write_fundamentals_sheets<P>(
    provider: &P,
    settings: &ReportSettings,
    workbook: &mut ReportWorkbook,
) -> Result<ReportSummary, ReportError>
where
    P: FundamentalsProvider + ?Sized,
{
    let (start, end) = (settings.start_date, settings.end_date);
    write_ticker_sheets(&settings.tickers, workbook, "Financial Data for", |ticker| async move {
        let statements = fetch_statements(provider, &ticker).await?;
        let table = fundamentals_table(&statements, start, end);
        // Reports exist but none fall inside the requested window
        if table.columns.is_empty() {
            return Err(ApiError::NoData { ticker });
        }
        Ok(table)
    })
    .await
}

/// Append one yearly price sheet per ticker to `workbook`
pub async fn write_price_sheets<P>(
    provider: &P,
    settings: &ReportSettings,
    workbook: &mut ReportWorkbook,
) -> Result<ReportSummary, ReportError>
where
    P: PriceHistoryProvider + ?Sized,
{
    let (start, end) = (settings.start_date, settings.end_date);
    write_ticker_sheets(&settings.tickers, workbook, "Data for", |ticker| async move {
        let history = provider.daily_history(&ticker, start, end).await?;
        Ok::<_, ApiError>(yearly_price_table(&history))
    })
    .await
}

fn finish(
    workbook: &mut ReportWorkbook,
    summary: &mut ReportSummary,
    output: &Path,
) -> Result<(), ReportError> {
    summary.placeholder_added = workbook.ensure_visible_sheet()?;
    workbook.save(output)?;
    println!("\nAll data has been written to '{}'", output.display());
    Ok(())
}

/// Pre-flight check, fundamentals sheets, placeholder, save.
pub async fn run_fundamentals_report<P>(
    provider: &P,
    settings: &ReportSettings,
) -> Result<ReportSummary, ReportError>
where
    P: FundamentalsProvider + ?Sized,
{
    ensure_output_writable(&settings.output_path)?;
    let mut workbook = ReportWorkbook::new();
    let mut summary = write_fundamentals_sheets(provider, settings, &mut workbook).await?;
    finish(&mut workbook, &mut summary, &settings.output_path)?;
    Ok(summary)
}

/// Pre-flight check, yearly price sheets, placeholder, save.
pub async fn run_price_report<P>(
    provider: &P,
    settings: &ReportSettings,
) -> Result<ReportSummary, ReportError>
where
    P: PriceHistoryProvider + ?Sized,
{
    ensure_output_writable(&settings.output_path)?;
    let mut workbook = ReportWorkbook::new();
    let mut summary = write_price_sheets(provider, settings, &mut workbook).await?;
    finish(&mut workbook, &mut summary, &settings.output_path)?;
    Ok(summary)
}
