//! Derived market summary and trending views
//!
//! Nothing in this module is persisted. A summary is recomputed from the
//! latest stored prices on every request.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::PriceBar;

/// Format used for `MarketSummary::last_update`
pub const LAST_UPDATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Number of entries in the overall trending list
const TRENDING_LIMIT: usize = 5;
/// Number of entries in each of the gainers and losers lists
const MOVERS_LIMIT: usize = 3;

/// Per-symbol line of the market summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSummary {
    pub symbol: String,
    /// Latest stored price
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Absolute change against the previous close
    #[serde(with = "rust_decimal::serde::float")]
    pub change: Decimal,
    /// Percentage change against the previous close (e.g. 1.5 for +1.5%)
    #[serde(with = "rust_decimal::serde::float")]
    pub change_percent: Decimal,
    /// When the latest price was observed
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of every tracked symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub total_stocks: usize,
    pub last_update: String,
    pub stocks: Vec<StockSummary>,
}

impl MarketSummary {
    /// Build a summary stamped with the current time
    pub fn new(stocks: Vec<StockSummary>) -> Self {
        Self::at(stocks, Utc::now())
    }

    /// Build a summary stamped with `now`
    pub fn at(stocks: Vec<StockSummary>, now: DateTime<Utc>) -> Self {
        Self {
            total_stocks: stocks.len(),
            last_update: now.format(LAST_UPDATE_FORMAT).to_string(),
            stocks,
        }
    }
}

/// Biggest movers of a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingStocks {
    /// Top movers by absolute percentage change
    pub trending: Vec<StockSummary>,
    /// Largest positive movers
    pub gainers: Vec<StockSummary>,
    /// Largest negative movers
    pub losers: Vec<StockSummary>,
}

impl TrendingStocks {
    /// Rank stocks by absolute `change_percent`, descending
    ///
    /// All three lists are sliced from the same ranking, so gainers and
    /// losers are also ordered by magnitude. Unchanged stocks are in neither.
    pub fn from_stocks(mut stocks: Vec<StockSummary>) -> Self {
        stocks.sort_by(|a, b| b.change_percent.abs().cmp(&a.change_percent.abs()));

        let gainers = stocks
            .iter()
            .filter(|s| s.change_percent > Decimal::ZERO)
            .take(MOVERS_LIMIT)
            .cloned()
            .collect();
        let losers = stocks
            .iter()
            .filter(|s| s.change_percent < Decimal::ZERO)
            .take(MOVERS_LIMIT)
            .cloned()
            .collect();
        stocks.truncate(TRENDING_LIMIT);

        Self {
            trending: stocks,
            gainers,
            losers,
        }
    }
}

/// Change of `current` against the second-to-last close in `history`
///
/// Returns `(change, change_percent)`. Both are zero when fewer than two bars
/// are available or the previous close is zero.
pub fn day_change(current: Decimal, history: &[PriceBar]) -> (Decimal, Decimal) {
    if history.len() < 2 {
        return (Decimal::ZERO, Decimal::ZERO);
    }

    let prev_close = history[history.len() - 2].close;
    if prev_close.is_zero() {
        return (Decimal::ZERO, Decimal::ZERO);
    }

    let change = current - prev_close;
    let percent = change
        .checked_div(prev_close)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO);
    (change, percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn stock(symbol: &str, change_percent: Decimal) -> StockSummary {
        StockSummary {
            symbol: symbol.to_string(),
            price: dec!(100),
            change: change_percent,
            change_percent,
            timestamp: Utc::now(),
        }
    }

    fn bar(offset_days: i64, close: Decimal) -> PriceBar {
        PriceBar {
            timestamp: Utc::now() - Duration::days(offset_days),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        }
    }

    fn percents(stocks: &[StockSummary]) -> Vec<Decimal> {
        stocks.iter().map(|s| s.change_percent).collect()
    }

    #[test]
    fn test_trending_orders_by_absolute_change() {
        let stocks = vec![
            stock("A", dec!(5)),
            stock("B", dec!(-3)),
            stock("C", dec!(1)),
            stock("D", dec!(-8)),
            stock("E", dec!(2)),
        ];

        let trending = TrendingStocks::from_stocks(stocks);

        assert_eq!(
            percents(&trending.trending),
            vec![dec!(-8), dec!(5), dec!(-3), dec!(2), dec!(1)]
        );
        assert_eq!(percents(&trending.gainers), vec![dec!(5), dec!(2), dec!(1)]);
        assert_eq!(percents(&trending.losers), vec![dec!(-8), dec!(-3)]);
    }

    #[test]
    fn test_trending_caps_lists() {
        let stocks = (1..=8)
            .map(|i| stock(&format!("S{}", i), Decimal::from(i)))
            .collect();

        let trending = TrendingStocks::from_stocks(stocks);

        assert_eq!(trending.trending.len(), 5);
        assert_eq!(percents(&trending.gainers), vec![dec!(8), dec!(7), dec!(6)]);
        assert!(trending.losers.is_empty());
    }

    #[test]
    fn test_trending_excludes_flat_from_movers() {
        let trending = TrendingStocks::from_stocks(vec![stock("FLAT", Decimal::ZERO)]);

        assert_eq!(trending.trending.len(), 1);
        assert!(trending.gainers.is_empty());
        assert!(trending.losers.is_empty());
    }

    #[test]
    fn test_day_change_needs_two_bars() {
        assert_eq!(day_change(dec!(110), &[]), (Decimal::ZERO, Decimal::ZERO));
        assert_eq!(
            day_change(dec!(110), &[bar(0, dec!(100))]),
            (Decimal::ZERO, Decimal::ZERO)
        );
    }

    #[test]
    fn test_day_change_uses_previous_close() {
        let history = vec![bar(1, dec!(100)), bar(0, dec!(104))];

        let (change, percent) = day_change(dec!(110), &history);

        assert_eq!(change, dec!(10));
        assert_eq!(percent, dec!(10));
    }

    #[test]
    fn test_day_change_zero_previous_close() {
        let history = vec![bar(1, Decimal::ZERO), bar(0, dec!(1))];
        assert_eq!(
            day_change(dec!(1), &history),
            (Decimal::ZERO, Decimal::ZERO)
        );
    }

    #[test]
    fn test_summary_counts_and_formats() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 9).unwrap();
        let summary = MarketSummary::at(vec![stock("AAPL", dec!(1.5))], now);

        assert_eq!(summary.total_stocks, 1);
        assert_eq!(summary.last_update, "2024-03-05 14:30:09");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["stocks"][0]["change_percent"], serde_json::json!(1.5));
    }
}
