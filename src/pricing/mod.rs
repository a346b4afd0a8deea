// Pricing module - historical price retrieval with an on-disk CSV cache

pub mod cache;
pub mod yahoo;

use anyhow::Context;
use chrono::NaiveDate;
use itertools::Itertools;
use tracing::{debug, info};

use crate::error::{Result, TrackerError};
use crate::models::PriceTable;
pub use cache::{CacheKey, PriceCache};
pub use yahoo::YahooProvider;

/// Requested history window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// The last `n` years up to today.
    Years(u32),
    /// An explicit inclusive date range.
    Dates { from: NaiveDate, to: NaiveDate },
}

impl std::fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeSpec::Years(n) => write!(f, "{}y", n),
            RangeSpec::Dates { from, to } => write!(f, "{}..{}", from, to),
        }
    }
}

/// Source of historical close prices for a set of tickers.
///
/// Implementations return one column per requested ticker, in request order.
/// A ticker without data yields an all-missing column; if no ticker has any
/// data the implementation should fail with [`TrackerError::EmptyData`] or
/// return an empty table.
pub trait PriceProvider {
    fn fetch(&self, tickers: &[String], range: &RangeSpec) -> Result<PriceTable>;
}

/// Upper-case, trim and de-duplicate tickers, keeping first-seen order.
pub fn normalize_tickers(tickers: &[String]) -> Vec<String> {
    tickers
        .iter()
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .unique()
        .collect()
}

/// Provider fronted by the price cache.
pub struct PriceSource<'a> {
    provider: &'a dyn PriceProvider,
    cache: PriceCache,
    read_cache: bool,
    offline: bool,
}

impl<'a> PriceSource<'a> {
    pub fn new(provider: &'a dyn PriceProvider, cache: PriceCache) -> Self {
        Self {
            provider,
            cache,
            read_cache: true,
            offline: false,
        }
    }

    /// Skip cache lookups; fresh data is still written back.
    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.read_cache = !bypass;
        self
    }

    /// Refuse network access; a cache miss becomes an error.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Load prices for `tickers`, from cache when possible.
    pub fn load(&self, tickers: &[String], range: &RangeSpec) -> Result<PriceTable> {
        let tickers = normalize_tickers(tickers);
        if tickers.is_empty() {
            return Err(TrackerError::Config("no tickers requested".to_string()).into());
        }
        let key = CacheKey::new(&tickers, range);

        if self.read_cache {
            if let Some(table) = self.cache.load(&key)? {
                info!("Using cached prices from {}", self.cache.path_for(&key).display());
                return Ok(table.select(&tickers));
            }
            debug!("Cache miss for {}", key.file_name());
        }

        if self.offline {
            return Err(TrackerError::Pricing(format!(
                "offline mode and no cached prices for {} ({})",
                tickers.join(", "),
                range
            ))
            .into());
        }

        let table = self
            .provider
            .fetch(&tickers, range)
            .context("Failed to fetch historical prices")?;

        if table.is_empty() || !table.has_observations() {
            return Err(TrackerError::EmptyData(format!(
                "no rows returned for {}",
                tickers.join(", ")
            ))
            .into());
        }

        self.cache.store(&key, &table)?;
        Ok(table)
    }
}
