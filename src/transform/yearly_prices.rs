use chrono::Datelike;
use std::collections::BTreeMap;

use crate::models::{MetricRow, MetricTable, PriceHistory};

pub const MIN_PRICE: &str = "Min Price";
pub const MAX_PRICE: &str = "Max Price";
pub const DIVIDENDS: &str = "Dividends";

/// Row order of the yearly price sheet: min on top, max below, dividends last
pub const YEARLY_PRICE_METRICS: [&str; 3] = [MIN_PRICE, MAX_PRICE, DIVIDENDS];

/// Collapse daily closes into one column per calendar year.
///
/// Dividends are summed per year; a year without any dividend gets an empty cell.
/// Years that only appear in the dividend events get no column.
pub fn yearly_price_table(history: &PriceHistory) -> MetricTable {
    let mut ranges: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for bar in &history.bars {
        ranges
            .entry(bar.date.year())
            .and_modify(|(low, high)| {
                *low = low.min(bar.close);
                *high = high.max(bar.close);
            })
            .or_insert((bar.close, bar.close));
    }

    let mut dividends: BTreeMap<i32, f64> = BTreeMap::new();
    for event in &history.dividends {
        *dividends.entry(event.date.year()).or_default() += event.amount;
    }

    let columns = ranges.keys().map(|year| year.to_string()).collect();
    let min_prices = ranges.values().map(|(low, _)| Some(*low)).collect();
    let max_prices = ranges.values().map(|(_, high)| Some(*high)).collect();
    let yearly_dividends = ranges
        .keys()
        .map(|year| dividends.get(year).copied())
        .collect();

    MetricTable {
        columns,
        rows: vec![
            MetricRow { label: MIN_PRICE.to_string(), values: min_prices },
            MetricRow { label: MAX_PRICE.to_string(), values: max_prices },
            MetricRow { label: DIVIDENDS.to_string(), values: yearly_dividends },
        ],
    }
}
