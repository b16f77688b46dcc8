//! User settings for bokfor
//!
//! Company details, the financial year and the verification series used for
//! new verifications.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::error::LedgerError;

/// User settings for bokfor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Name of the legal entity the ledger belongs to
    #[serde(default)]
    pub company_name: String,

    /// Financial year as "MMDD - MMDD", e.g. "0101 - 1231" or "0701 - 0630"
    #[serde(default = "default_financial_year")]
    pub financial_year: String,

    /// Year offset relative to the current year (-1 = last financial year)
    #[serde(default)]
    pub year_offset: i32,

    /// Series letter for new verifications
    #[serde(default = "default_series")]
    pub series: char,

    /// Currency symbol shown after amounts
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Date format preference (strftime format)
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_financial_year() -> String {
    "0101 - 1231".to_string()
}

fn default_series() -> char {
    'A'
}

fn default_currency() -> String {
    "kr".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            company_name: String::new(),
            financial_year: default_financial_year(),
            year_offset: 0,
            series: default_series(),
            currency_symbol: default_currency(),
            date_format: default_date_format(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &LedgerPaths) -> Result<Self, LedgerError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| LedgerError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                LedgerError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &LedgerPaths) -> Result<(), LedgerError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| LedgerError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| LedgerError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// First and last day (inclusive) of the financial year containing
    /// `today`'s year shifted by `year_offset`
    ///
    /// A year whose start month is after its end month ends in the following
    /// calendar year.
    pub fn financial_year_range(
        &self,
        today: NaiveDate,
    ) -> Result<(NaiveDate, NaiveDate), LedgerError> {
        let invalid = || {
            LedgerError::Config(format!(
                "Invalid financial year '{}', expected \"MMDD - MMDD\"",
                self.financial_year
            ))
        };

        let (start, end) = self.financial_year.split_once('-').ok_or_else(invalid)?;
        let (start_month, start_day) = parse_month_day(start.trim()).ok_or_else(invalid)?;
        let (end_month, end_day) = parse_month_day(end.trim()).ok_or_else(invalid)?;

        let year = today.year() + self.year_offset;
        let end_year = if start_month > end_month { year + 1 } else { year };

        let first = NaiveDate::from_ymd_opt(year, start_month, start_day).ok_or_else(invalid)?;
        let last = NaiveDate::from_ymd_opt(end_year, end_month, end_day).ok_or_else(invalid)?;
        Ok((first, last))
    }
}

fn parse_month_day(s: &str) -> Option<(u32, u32)> {
    if s.len() != 4 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((s[..2].parse().ok()?, s[2..].parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.series, 'A');
        assert_eq!(settings.financial_year, "0101 - 1231");
        assert_eq!(settings.currency_symbol, "kr");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.company_name = "Ownbox AB".into();
        settings.series = 'B';

        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.company_name, "Ownbox AB");
        assert_eq!(loaded.series, 'B');
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"company_name":"X"}"#).unwrap();
        assert_eq!(settings.series, 'A');
        assert_eq!(settings.year_offset, 0);
    }

    #[test]
    fn test_calendar_year() {
        let settings = Settings::default();
        let (first, last) = settings.financial_year_range(day(2023, 6, 15)).unwrap();
        assert_eq!(first, day(2023, 1, 1));
        assert_eq!(last, day(2023, 12, 31));
    }

    #[test]
    fn test_split_year_with_offset() {
        let settings = Settings {
            financial_year: "0701 - 0630".into(),
            year_offset: -1,
            ..Settings::default()
        };
        let (first, last) = settings.financial_year_range(day(2023, 2, 1)).unwrap();
        assert_eq!(first, day(2022, 7, 1));
        assert_eq!(last, day(2023, 6, 30));
    }

    #[test]
    fn test_invalid_financial_year() {
        let settings = Settings {
            financial_year: "January".into(),
            ..Settings::default()
        };
        assert!(settings.financial_year_range(day(2023, 1, 1)).is_err());
    }
}
