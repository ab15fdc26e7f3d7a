//! CSV file price history adapter.
//!
//! One file per instrument, `<dir>/<instrument>.csv`, with a
//! `date,open,high,low,close,volume` header.

use crate::domain::error::SignalwatchError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::price_port::PriceHistoryPort;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument_id))
    }

    /// Instruments with a CSV file in the base directory, sorted.
    pub fn list_instruments(&self) -> Result<Vec<String>, SignalwatchError> {
        let mut instruments = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                instruments.push(stem.to_string());
            }
        }
        instruments.sort();
        Ok(instruments)
    }
}

impl PriceHistoryPort for CsvAdapter {
    fn get_price_series(&self, instrument_id: &str) -> Result<Vec<PriceBar>, SignalwatchError> {
        let path = self.csv_path(instrument_id);
        let unavailable = |reason: String| SignalwatchError::ProviderUnavailable {
            instrument: instrument_id.to_string(),
            reason,
        };

        let content = fs::read_to_string(&path)
            .map_err(|e| unavailable(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = rdr
            .deserialize::<PriceBar>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| unavailable(format!("CSV parse error in {}: {}", path.display(), e)))?;

        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("600519.csv"), csv_content).unwrap();
        fs::write(path.join("000001.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "not a price file").unwrap();

        (dir, path)
    }

    #[test]
    fn reads_bars_in_ascending_order() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.get_price_series("600519").unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
        assert_eq!(bars[2].close, 115.0);
    }

    #[test]
    fn header_only_file_is_empty_series() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(adapter.get_price_series("000001").unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_provider_unavailable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let err = adapter.get_price_series("999999").unwrap_err();
        assert!(matches!(
            err,
            SignalwatchError::ProviderUnavailable { instrument, .. } if instrument == "999999"
        ));
    }

    #[test]
    fn malformed_row_is_provider_unavailable() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-01-15,abc,1,1,1,1\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.get_price_series("BAD"),
            Err(SignalwatchError::ProviderUnavailable { .. })
        ));
    }

    #[test]
    fn list_instruments_finds_csv_files() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_instruments().unwrap(), vec!["000001", "600519"]);
    }
}
