//! Tabular data types flowing through the pipeline
//!
//! A [`PriceTable`] is what the price provider and the cache exchange:
//! ascending unique dates by asset, with gaps allowed. Everything derived
//! from it (returns, cumulative growth, drawdowns) is a gap-free
//! [`SeriesTable`].

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Result, TrackerError};

/// Dates × assets price grid. `rows[i][j]` is the price of `assets[j]`
/// on `dates[i]`; `None` marks a missing observation.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    /// Build a table, checking the shape and date ordering invariants.
    pub fn new(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if dates.len() != rows.len() {
            return Err(TrackerError::InvalidTable(format!(
                "{} dates but {} rows",
                dates.len(),
                rows.len()
            ))
            .into());
        }
        if let Some(idx) = rows.iter().position(|r| r.len() != assets.len()) {
            return Err(TrackerError::InvalidTable(format!(
                "row {} has {} values, expected {}",
                dates[idx],
                rows[idx].len(),
                assets.len()
            ))
            .into());
        }
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(TrackerError::InvalidTable(format!(
                "dates not strictly increasing at {} -> {}",
                w[0], w[1]
            ))
            .into());
        }
        Ok(Self {
            dates,
            assets,
            rows,
        })
    }

    /// An empty table with no assets and no dates.
    pub fn empty() -> Self {
        Self {
            dates: Vec::new(),
            assets: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Outer-join per-asset series on date. Each series may be in any order;
    /// a duplicated date within one series keeps the last value.
    pub fn from_series(series: Vec<(String, Vec<(NaiveDate, f64)>)>) -> Self {
        use std::collections::BTreeMap;

        let assets: Vec<String> = series.iter().map(|(name, _)| name.clone()).collect();
        let mut grid: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        for (col, (_, points)) in series.iter().enumerate() {
            for &(date, price) in points {
                let row = grid
                    .entry(date)
                    .or_insert_with(|| vec![None; assets.len()]);
                row[col] = Some(price);
            }
        }

        let (dates, rows): (Vec<NaiveDate>, Vec<Vec<Option<f64>>>) = grid.into_iter().unzip();
        Self {
            dates,
            assets,
            rows,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True when there is no row or no asset to compute on.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.assets.is_empty()
    }

    /// True when at least one price is present anywhere in the table.
    pub fn has_observations(&self) -> bool {
        self.rows.iter().flatten().any(Option::is_some)
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(move |row| row[idx])
    }

    pub fn column_by_name(&self, asset: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.assets.iter().position(|a| a == asset)?;
        Some(self.column(idx).collect())
    }

    /// Remove gaps: first drop assets with no observation at all, then drop
    /// every date that still has a missing value in any remaining asset.
    pub fn drop_missing(&self) -> PriceTable {
        let keep: Vec<usize> = (0..self.assets.len())
            .filter(|&j| self.column(j).any(|v| v.is_some()))
            .collect();
        for (j, asset) in self.assets.iter().enumerate() {
            if !keep.contains(&j) {
                tracing::warn!("Dropping {}: no price data after alignment", asset);
            }
        }

        let mut dates = Vec::new();
        let mut rows = Vec::new();
        for (date, row) in self.dates.iter().zip(&self.rows) {
            let picked: Vec<Option<f64>> = keep.iter().map(|&j| row[j]).collect();
            if picked.iter().all(Option::is_some) {
                dates.push(*date);
                rows.push(picked);
            }
        }

        let dropped = self.dates.len() - dates.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} rows with missing prices", dropped);
        }

        PriceTable {
            dates,
            assets: keep.iter().map(|&j| self.assets[j].clone()).collect(),
            rows,
        }
    }

    /// Re-index to `assets`, in that order. Names not present are skipped.
    pub fn select(&self, assets: &[String]) -> PriceTable {
        let idx: Vec<usize> = assets
            .iter()
            .filter_map(|a| self.assets.iter().position(|b| b == a))
            .collect();
        PriceTable {
            dates: self.dates.clone(),
            assets: idx.iter().map(|&j| self.assets[j].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| idx.iter().map(|&j| row[j]).collect())
                .collect(),
        }
    }
}

/// Gap-free dates × assets grid of derived values (returns, cumulative
/// growth, drawdowns, moving averages). Undefined entries are `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTable {
    pub dates: Vec<NaiveDate>,
    pub assets: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// Simple per-period returns; one row fewer than the source prices.
pub type ReturnTable = SeriesTable;
/// Running product of `1 + return`.
pub type CumulativeTable = SeriesTable;
/// Decline from the running peak of the cumulative series; always `<= 0`.
pub type DrawdownTable = SeriesTable;

impl SeriesTable {
    pub fn empty(assets: Vec<String>) -> Self {
        Self {
            dates: Vec::new(),
            assets,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[idx]).collect()
    }

    pub fn column_by_name(&self, asset: &str) -> Option<Vec<f64>> {
        let idx = self.assets.iter().position(|a| a == asset)?;
        Some(self.column(idx))
    }
}

/// Pairwise Pearson correlation of asset returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub assets: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.assets.iter().position(|x| x == a)?;
        let j = self.assets.iter().position(|x| x == b)?;
        Some(self.values[i][j])
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Risk/return statistics of one asset. Only assets with every field
/// defined make it into a [`SummaryTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetMetrics {
    pub asset: String,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SummaryTable {
    pub rows: Vec<AssetMetrics>,
}

impl SummaryTable {
    /// Surviving asset names, in table order.
    pub fn assets(&self) -> Vec<String> {
        self.rows.iter().map(|m| m.asset.clone()).collect()
    }

    pub fn get(&self, asset: &str) -> Option<&AssetMetrics> {
        self.rows.iter().find(|m| m.asset == asset)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
