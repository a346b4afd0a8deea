//! Run configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then command-line overrides.

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TrackerError};
use crate::metrics::DEFAULT_PERIODS_PER_YEAR;
use crate::pricing::RangeSpec;

pub const DEFAULT_TICKERS: [&str; 7] = ["SPY", "QQQ", "TLT", "GLD", "USO", "EFA", "EEM"];
pub const DEFAULT_YEARS: u32 = 3;
pub const DEFAULT_SMA_WINDOW: usize = 30;
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_DATA_DIR: &str = "data";

const CONFIG_FILENAME: &str = "config.toml";
const OFFLINE_ENV: &str = "TRACKER_OFFLINE";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub tickers: Option<Vec<String>>,
    pub years: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub periods_per_year: Option<u32>,
    pub sma_window: Option<usize>,
    pub cache_max_age_hours: Option<i64>,
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub tickers: Option<Vec<String>>,
    pub years: Option<u32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub output_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub no_cache: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub tickers: Vec<String>,
    pub range: RangeSpec,
    pub output_dir: PathBuf,
    pub data_dir: PathBuf,
    pub periods_per_year: u32,
    pub sma_window: usize,
    pub cache_max_age_hours: Option<i64>,
    pub no_cache: bool,
    pub offline: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            range: RangeSpec::Years(DEFAULT_YEARS),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            sma_window: DEFAULT_SMA_WINDOW,
            cache_max_age_hours: None,
            no_cache: false,
            offline: false,
        }
    }
}

impl Settings {
    /// Merge file config and CLI overrides over the defaults, then validate.
    pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Self> {
        let defaults = Settings::default();

        let years = cli.years.or(file.years).unwrap_or(DEFAULT_YEARS);
        let range = match (cli.from, cli.to) {
            (None, None) => RangeSpec::Years(years),
            (from, to) => {
                let to = to.unwrap_or_else(|| chrono::Local::now().date_naive());
                let from = match from {
                    Some(from) => from,
                    None => {
                        let months = years
                            .checked_mul(12)
                            .ok_or_else(|| TrackerError::Config("years out of range".into()))?;
                        to.checked_sub_months(chrono::Months::new(months))
                            .ok_or_else(|| TrackerError::Config("start date out of range".into()))?
                    }
                };
                RangeSpec::Dates { from, to }
            }
        };

        let settings = Settings {
            tickers: cli.tickers.or(file.tickers).unwrap_or(defaults.tickers),
            range,
            output_dir: cli
                .output_dir
                .or(file.output_dir)
                .unwrap_or(defaults.output_dir),
            data_dir: cli.data_dir.or(file.data_dir).unwrap_or(defaults.data_dir),
            periods_per_year: file.periods_per_year.unwrap_or(defaults.periods_per_year),
            sma_window: file.sma_window.unwrap_or(defaults.sma_window),
            cache_max_age_hours: file.cache_max_age_hours,
            no_cache: cli.no_cache,
            offline: offline_from_env(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tickers.iter().all(|t| t.trim().is_empty()) {
            return Err(TrackerError::Config("at least one ticker is required".into()).into());
        }
        match self.range {
            RangeSpec::Years(0) => {
                return Err(TrackerError::Config("years must be at least 1".into()).into())
            }
            RangeSpec::Dates { from, to } if from > to => {
                return Err(TrackerError::Config(format!(
                    "'from' ({}) must be on or before 'to' ({})",
                    from, to
                ))
                .into())
            }
            _ => {}
        }
        if self.periods_per_year == 0 {
            return Err(TrackerError::Config("periods_per_year must be at least 1".into()).into());
        }
        if self.sma_window == 0 {
            return Err(TrackerError::Config("sma_window must be at least 1".into()).into());
        }
        Ok(())
    }
}

fn offline_from_env() -> bool {
    std::env::var(OFFLINE_ENV)
        .map(|v| v != "0" && !v.is_empty())
        .unwrap_or(false)
}

pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("market-tracker").join(CONFIG_FILENAME))
}

/// Read the config file. An explicit path must exist; the default location
/// is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(FileConfig::default()),
        },
    };
    debug!("Loading config from {}", path.display());

    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_file_config(&text).with_context(|| format!("Invalid config file {}", path.display()))
}

pub fn parse_file_config(text: &str) -> Result<FileConfig> {
    toml::from_str(text).map_err(|e| TrackerError::Config(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::resolve(FileConfig::default(), Overrides::default()).unwrap();
        assert_eq!(s.tickers.len(), 7);
        assert_eq!(s.range, RangeSpec::Years(3));
        assert_eq!(s.periods_per_year, 252);
        assert_eq!(s.output_dir, PathBuf::from("outputs"));
        assert_eq!(s.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = parse_file_config(
            r#"
            tickers = ["AAPL", "MSFT"]
            years = 5
            sma_window = 10
            "#,
        )
        .unwrap();
        let cli = Overrides {
            years: Some(2),
            ..Default::default()
        };
        let s = Settings::resolve(file, cli).unwrap();
        assert_eq!(s.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(s.range, RangeSpec::Years(2));
        assert_eq!(s.sma_window, 10);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse_file_config("colour = \"blue\"").unwrap_err();
        assert!(err.to_string().starts_with("config error"));
    }

    #[test]
    fn test_date_range_override() {
        let from = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let cli = Overrides {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        };
        let s = Settings::resolve(FileConfig::default(), cli).unwrap();
        assert_eq!(s.range, RangeSpec::Dates { from, to });
    }

    #[test]
    fn test_to_without_from_uses_years_back() {
        let to = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let cli = Overrides {
            to: Some(to),
            years: Some(2),
            ..Default::default()
        };
        let s = Settings::resolve(FileConfig::default(), cli).unwrap();
        assert_eq!(
            s.range,
            RangeSpec::Dates {
                from: NaiveDate::from_ymd_opt(2022, 6, 30).unwrap(),
                to
            }
        );
    }

    #[test]
    fn test_huge_year_span_with_end_date_is_config_error() {
        let cli = Overrides {
            to: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            years: Some(400_000_000),
            ..Default::default()
        };
        let err = Settings::resolve(FileConfig::default(), cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::Config(_))
        ));
    }

    #[test]
    fn test_validation_errors() {
        let zero_years = Overrides {
            years: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(FileConfig::default(), zero_years).is_err());

        let reversed = Overrides {
            from: Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            ..Default::default()
        };
        assert!(Settings::resolve(FileConfig::default(), reversed).is_err());

        let no_tickers = Overrides {
            tickers: Some(vec![]),
            ..Default::default()
        };
        assert!(Settings::resolve(FileConfig::default(), no_tickers).is_err());
    }
}
