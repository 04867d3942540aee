use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stock_sheets::api::{AlphaVantageClient, YahooChartClient};
use stock_sheets::models::{Config, ReportKind, ReportSettings};
use stock_sheets::report::{run_fundamentals_report, run_price_report, ReportSummary};
use stock_sheets::utils::{normalize_tickers, parse_date};
use stock_sheets::{ConfigError, ReportError, WorkbookError};

/// Write per-ticker financial tables into Excel workbooks
#[derive(Parser, Debug)]
#[command(name = "stock-sheets")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Annual revenue, net income, EPS, equity, dividends per share and shares outstanding
    /// from Alpha Vantage, one sheet per ticker
    Fundamentals(ReportArgs),

    /// Yearly min/max close and dividends from Yahoo Finance, one sheet per ticker
    Prices(ReportArgs),
}

#[derive(Args, Debug, Default)]
struct ReportArgs {
    /// Comma-separated ticker symbols (defaults to the built-in list for the report)
    #[arg(long, short = 't', value_delimiter = ',')]
    tickers: Vec<String>,

    /// First date to include (YYYY-MM-DD or YYYYMMDD, default 2012-01-01)
    #[arg(long, short = 's')]
    start_date: Option<String>,

    /// Date to stop before (YYYY-MM-DD or YYYYMMDD, default today)
    #[arg(long, short = 'e')]
    end_date: Option<String>,

    /// Output workbook; overwritten on every run
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Requests per minute sent to the provider (0 = no pacing)
    #[arg(long)]
    rate_limit: Option<u32>,
}

impl ReportArgs {
    fn into_settings(self, kind: ReportKind) -> Result<ReportSettings, ConfigError> {
        let mut settings = ReportSettings::defaults(kind);

        let tickers = normalize_tickers(&self.tickers);
        if !tickers.is_empty() {
            settings.tickers = tickers;
        }
        if let Some(start) = self.start_date.as_deref() {
            settings.start_date = parse_date(start)?;
        }
        if let Some(end) = self.end_date.as_deref() {
            settings.end_date = parse_date(end)?;
        }
        if let Some(output) = self.output {
            settings.output_path = output;
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stock_sheets=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;
    Ok(())
}

fn exit_with(message: &str, err: &dyn std::fmt::Display) -> ! {
    error!("{}: {}", message, err);
    eprintln!("❌ {}: {}", message, err);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => exit_with("Configuration Error", &e),
    };

    let (kind, args) = match cli.command {
        Commands::Fundamentals(args) => (ReportKind::Fundamentals, args),
        Commands::Prices(args) => (ReportKind::YearlyPrices, args),
    };
    if let Some(rate_limit) = args.rate_limit {
        config.rate_limit_per_minute = rate_limit;
    }
    let settings = match args.into_settings(kind) {
        Ok(settings) => settings,
        Err(e) => exit_with("Configuration Error", &e),
    };

    info!(
        "Writing {:?} report for {} tickers ({} to {}) to {}",
        kind,
        settings.tickers.len(),
        settings.start_date,
        settings.end_date,
        settings.output_path.display()
    );

    let outcome = match kind {
        ReportKind::Fundamentals => {
            let api_key = match config.require_alpha_vantage_key() {
                Ok(key) => key.to_string(),
                Err(e) => {
                    eprintln!("Set it in the environment or a .env file to fetch fundamentals.");
                    exit_with("Configuration Error", &e)
                }
            };
            let client = AlphaVantageClient::new(api_key, &config)?;
            run_fundamentals_report(&client, &settings).await
        }
        ReportKind::YearlyPrices => {
            let client = YahooChartClient::new(&config)?;
            run_price_report(&client, &settings).await
        }
    };

    match outcome {
        Ok(summary) => {
            log_summary(&summary);
            Ok(())
        }
        Err(ReportError::Workbook(e @ WorkbookError::OutputLocked { .. })) => {
            exit_with("Error", &e)
        }
        Err(e) => Err(e.into()),
    }
}

fn log_summary(summary: &ReportSummary) {
    info!(
        "Report finished: {} sheet(s) written, {} ticker(s) skipped{}",
        summary.written.len(),
        summary.skipped.len(),
        if summary.placeholder_added { ", placeholder sheet added" } else { "" }
    );
    for skipped in &summary.skipped {
        info!("Skipped {}: {}", skipped.ticker, skipped.reason);
    }
}
