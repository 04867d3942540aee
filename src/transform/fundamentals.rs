use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

use crate::models::{FundamentalStatements, MetricRow, MetricTable, StatementReport};

pub const REVENUE: &str = "Revenue";
pub const NET_INCOME: &str = "Net Income";
pub const EPS: &str = "EPS";
pub const SHAREHOLDER_EQUITY: &str = "Shareholder Equity";
pub const DIVIDENDS_PER_SHARE: &str = "Dividends per Share";
pub const SHARES_OUTSTANDING: &str = "Shares Outstanding";

/// Row order of the fundamentals sheet
pub const FUNDAMENTAL_METRICS: [&str; 6] = [
    REVENUE,
    NET_INCOME,
    EPS,
    SHAREHOLDER_EQUITY,
    DIVIDENDS_PER_SHARE,
    SHARES_OUTSTANDING,
];

const MILLIONS: f64 = 1e6;

/// Index annual reports by fiscal year end, keeping those in `[start, end)`.
fn index_by_fiscal_date<'a>(
    reports: &'a [StatementReport],
    start: NaiveDate,
    end: NaiveDate,
    statement: &str,
) -> BTreeMap<NaiveDate, &'a StatementReport> {
    let mut indexed = BTreeMap::new();
    for report in reports {
        match report.fiscal_date() {
            Some(date) if date >= start && date < end => {
                indexed.entry(date).or_insert(report);
            }
            Some(_) => {}
            None => warn!(
                "Dropping {} report with unparseable fiscal date '{}'",
                statement, report.fiscal_date_ending
            ),
        }
    }
    indexed
}

fn field(index: &BTreeMap<NaiveDate, &StatementReport>, date: &NaiveDate, name: &str) -> f64 {
    index.get(date).map(|r| r.numeric(name)).unwrap_or(0.0)
}

/// Column headers: the fiscal year, or the full date when two fiscal year ends share a year.
fn column_labels(dates: &[NaiveDate]) -> Vec<String> {
    let mut per_year: HashMap<i32, usize> = HashMap::new();
    for date in dates {
        *per_year.entry(date.year()).or_default() += 1;
    }
    dates
        .iter()
        .map(|date| {
            if per_year.get(&date.year()).copied().unwrap_or(0) > 1 {
                date.format("%Y-%m-%d").to_string()
            } else {
                date.year().to_string()
            }
        })
        .collect()
}

/// Build the fundamentals table for one ticker.
///
/// Columns are the union of fiscal year ends found in the income statement,
/// balance sheet and cash flow statement, ascending. A metric whose source
/// report or field is missing for a period reads as 0. Revenue, net income and
/// shareholder equity are expressed in millions.
pub fn fundamentals_table(
    statements: &FundamentalStatements,
    start: NaiveDate,
    end: NaiveDate,
) -> MetricTable {
    let income = index_by_fiscal_date(&statements.income, start, end, "income statement");
    let balance = index_by_fiscal_date(&statements.balance, start, end, "balance sheet");
    let cash_flow = index_by_fiscal_date(&statements.cash_flow, start, end, "cash flow");
    let earnings = index_by_fiscal_date(&statements.earnings, start, end, "earnings");

    let dates: Vec<NaiveDate> = income
        .keys()
        .chain(balance.keys())
        .chain(cash_flow.keys())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut rows: Vec<MetricRow> = FUNDAMENTAL_METRICS
        .iter()
        .map(|label| MetricRow {
            label: label.to_string(),
            values: Vec::with_capacity(dates.len()),
        })
        .collect();

    for date in &dates {
        let revenue = field(&income, date, "totalRevenue") / MILLIONS;
        let net_income = field(&income, date, "netIncome") / MILLIONS;
        let eps = match earnings.get(date) {
            Some(report) => report.numeric("reportedEPS"),
            None => field(&income, date, "reportedEPS"),
        };
        let equity = field(&balance, date, "totalShareholderEquity") / MILLIONS;
        let shares = field(&balance, date, "commonStockSharesOutstanding");
        let dividend_payout = field(&cash_flow, date, "dividendPayout");
        let dividends_per_share = if shares > 0.0 { dividend_payout / shares } else { 0.0 };

        let values = [revenue, net_income, eps, equity, dividends_per_share, shares];
        for (row, value) in rows.iter_mut().zip(values) {
            row.values.push(Some(value));
        }
    }

    MetricTable {
        columns: column_labels(&dates),
        rows,
    }
}
