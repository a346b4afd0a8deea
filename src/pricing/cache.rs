use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::RangeSpec;
use crate::error::{Result, TrackerError};
use crate::models::PriceTable;

const FILE_PREFIX: &str = "tracker_prices";
const DATE_HEADER: &str = "Date";
const MAX_TICKER_PART_LEN: usize = 64;

/// Deterministic cache key: sorted tickers plus the requested range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    tickers: Vec<String>,
    range: RangeSpec,
}

impl CacheKey {
    pub fn new(tickers: &[String], range: &RangeSpec) -> Self {
        let mut tickers = tickers.to_vec();
        tickers.sort();
        tickers.dedup();
        Self {
            tickers,
            range: *range,
        }
    }

    /// `tracker_prices_<tickers>_<range>.csv`
    pub fn file_name(&self) -> String {
        let joined = self
            .tickers
            .iter()
            .map(|t| sanitize(t))
            .collect::<Vec<_>>()
            .join("-");
        let ticker_part = if joined.len() > MAX_TICKER_PART_LEN {
            let hash = blake3::hash(self.tickers.join(",").as_bytes());
            hash.to_hex()[..16].to_string()
        } else {
            joined
        };
        let range_part = match self.range {
            RangeSpec::Years(n) => format!("{}y", n),
            RangeSpec::Dates { from, to } => format!("{}_{}", from, to),
        };
        format!("{}_{}_{}.csv", FILE_PREFIX, ticker_part, range_part)
    }
}

fn sanitize(ticker: &str) -> String {
    ticker
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '=' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// CSV-backed store of raw price tables.
#[derive(Debug, Clone)]
pub struct PriceCache {
    dir: PathBuf,
    max_age: Option<Duration>,
}

impl PriceCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            max_age: None,
        }
    }

    /// Treat files older than `hours` as absent. Without this, entries never expire.
    pub fn with_max_age_hours(mut self, hours: Option<i64>) -> Self {
        self.max_age = hours.map(Duration::hours);
        self
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Cached table for `key`, or `None` when absent or expired.
    pub fn load(&self, key: &CacheKey) -> Result<Option<PriceTable>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        if self.is_stale(&path)? {
            debug!("Cache file {} is stale", path.display());
            return Ok(None);
        }

        let table = read_price_csv(&path)
            .with_context(|| format!("Failed to read price cache {}", path.display()))?;
        if table.is_empty() {
            return Ok(None);
        }
        Ok(Some(table))
    }

    pub fn store(&self, key: &CacheKey, table: &PriceTable) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).context("Failed to create price cache directory")?;
        let path = self.path_for(key);
        let tmp_path = path.with_extension("csv.tmp");
        write_price_csv(&tmp_path, table).context("Failed to write price cache")?;
        fs::rename(&tmp_path, &path).context("Failed to finalize price cache file")?;
        debug!("Stored {} price rows in {}", table.len(), path.display());
        Ok(path)
    }

    fn is_stale(&self, path: &Path) -> Result<bool> {
        let Some(max_age) = self.max_age else {
            return Ok(false);
        };
        let modified = fs::metadata(path)?.modified()?;
        let modified: DateTime<Utc> = modified.into();
        Ok(Utc::now().signed_duration_since(modified) > max_age)
    }
}

/// Write `Date,<asset>...` rows; missing prices are empty cells.
pub fn write_price_csv(path: &Path, table: &PriceTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec![DATE_HEADER.to_string()];
    header.extend(table.assets().iter().cloned());
    writer.write_record(&header)?;

    for (date, row) in table.dates().iter().zip(table.rows()) {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(row.iter().map(|v| v.map(|p| p.to_string()).unwrap_or_default()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_price_csv(path: &Path) -> Result<PriceTable> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    if headers.get(0) != Some(DATE_HEADER) {
        return Err(TrackerError::Cache(format!(
            "{}: first column must be '{}'",
            path.display(),
            DATE_HEADER
        ))
        .into());
    }
    let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut dates = Vec::new();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|e| TrackerError::Cache(format!("bad date '{}': {}", raw_date, e)))?;

        let mut row = Vec::with_capacity(assets.len());
        for field in record.iter().skip(1) {
            let field = field.trim();
            if field.is_empty() {
                row.push(None);
            } else {
                let price: f64 = field.parse().map_err(|e| {
                    TrackerError::Cache(format!("bad price '{}' on {}: {}", field, date, e))
                })?;
                row.push(Some(price));
            }
        }
        dates.push(date);
        rows.push(row);
    }

    PriceTable::new(dates, assets, rows)
}
