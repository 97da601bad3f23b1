//! CSV directory provider.
//!
//! Reads `{dir}/{SYMBOL}.csv`. The first column whose header is `date` (any
//! case) is the index; every other column is passed through as-is so header
//! normalization happens in one place, the fetch stage.

use super::provider::{DataError, DataProvider, DataSource, ProviderFrame};
use chrono::NaiveDate;
use std::path::PathBuf;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"];

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn symbol_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Timestamps like "2024-01-02 00:00:00+05:30" keep only the date part.
    let head = raw.trim().split(|c: char| c == ' ' || c == 'T').next().unwrap_or("");
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(head, fmt).ok())
}

fn parse_cell(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("null") {
        return None;
    }
    raw.parse::<f64>().ok()
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ProviderFrame, DataError> {
        let path = self.symbol_path(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&path)?;

        let headers = reader.headers()?.clone();
        let date_pos = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("date"))
            .ok_or_else(|| DataError::MissingColumn {
                symbol: symbol.to_string(),
                column: "date".into(),
            })?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_pos)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut frame = ProviderFrame::new(symbol, DataSource::CsvImport, columns);

        for record in reader.records() {
            let record = record?;
            let Some(date) = record.get(date_pos).and_then(parse_date) else {
                tracing::debug!(symbol, "skipping row with unparseable date");
                continue;
            };
            if date < start || date > end {
                continue;
            }
            let cells = record
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != date_pos)
                .map(|(_, v)| parse_cell(v))
                .collect();
            frame.push_row(date, cells);
        }

        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn reads_rows_in_range_with_original_headers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("TCS.csv"),
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-01,10,11,9,10.5,100\n\
             2024-01-02,10.5,12,10,11,\n\
             2024-01-05,11,12,10,11.5,300\n",
        )
        .unwrap();

        let provider = CsvProvider::new(dir.path());
        let frame = provider.fetch("TCS", day(1), day(3)).unwrap();

        assert_eq!(frame.columns, vec!["Open", "High", "Low", "Close", "Volume"]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.rows[0][3], Some(10.5));
        assert_eq!(frame.rows[1][4], None);
        assert_eq!(frame.source, DataSource::CsvImport);
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvProvider::new(dir.path());
        let result = provider.fetch("NOPE", day(1), day(2));
        assert!(matches!(result, Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn missing_date_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("X.csv"), "Open,Close\n1,2\n").unwrap();
        let provider = CsvProvider::new(dir.path());
        let result = provider.fetch("X", day(1), day(2));
        assert!(matches!(result, Err(DataError::MissingColumn { .. })));
    }

    #[test]
    fn date_parsing_accepts_timestamps() {
        assert_eq!(parse_date("2024-01-02 00:00:00+05:30"), Some(day(2)));
        assert_eq!(parse_date("02-01-2024"), Some(day(2)));
        assert_eq!(parse_date("garbage"), None);
    }

    #[test]
    fn blank_and_nan_cells_are_null() {
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("NaN"), None);
        assert_eq!(parse_cell("12.5"), Some(12.5));
    }
}
