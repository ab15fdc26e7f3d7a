//! Daily price bar representation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of OHLC data. Series are ascending by date with no gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// True when every bar's date is strictly after the previous one.
pub fn is_ascending(bars: &[PriceBar]) -> bool {
    bars.windows(2).all(|w| w[0].date < w[1].date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: 1_000,
        }
    }

    #[test]
    fn ascending_series() {
        assert!(is_ascending(&[bar(1), bar(2), bar(5)]));
    }

    #[test]
    fn duplicate_date_is_not_ascending() {
        assert!(!is_ascending(&[bar(1), bar(2), bar(2)]));
    }

    #[test]
    fn out_of_order_is_not_ascending() {
        assert!(!is_ascending(&[bar(3), bar(2)]));
    }

    #[test]
    fn empty_and_single_are_ascending() {
        assert!(is_ascending(&[]));
        assert!(is_ascending(&[bar(1)]));
    }
}
