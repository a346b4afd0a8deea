//! The end-to-end run: fetch → align → metrics → charts → files.
//!
//! [`ensure_dirs`] is the explicit setup step and must be called once before
//! [`run`]. Nothing is written to the output directory until prices have been
//! fetched and aligned successfully.

use anyhow::Context;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Result, TrackerError};
use crate::metrics::{
    compute_correlation, compute_drawdown_series, compute_returns, compute_summary, normalize,
    rolling_mean, surviving_prices,
};
use crate::models::{PriceTable, SummaryTable};
use crate::pricing::{normalize_tickers, PriceCache, PriceProvider, PriceSource};
use crate::reports::{self, ReportData, SUMMARY_FILENAME};

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: SummaryTable,
    /// Requested tickers missing from the summary (no data or undefined metrics).
    pub excluded: Vec<String>,
    /// Number of aligned price rows the metrics were computed on.
    pub rows_used: usize,
    pub summary_path: PathBuf,
    pub artifacts: Vec<PathBuf>,
}

/// Create the output and data directories.
pub fn ensure_dirs(settings: &Settings) -> Result<()> {
    fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            settings.output_dir.display()
        )
    })?;
    fs::create_dir_all(&settings.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            settings.data_dir.display()
        )
    })?;
    Ok(())
}

/// Align prices and derive every table the report needs.
///
/// Fails with [`TrackerError::EmptyData`] when no complete price row remains.
pub fn analyze(
    prices: &PriceTable,
    periods_per_year: u32,
    sma_window: usize,
) -> Result<ReportData> {
    let aligned = prices.drop_missing();
    if aligned.is_empty() {
        return Err(TrackerError::EmptyData(
            "no complete price rows after dropping missing values".to_string(),
        )
        .into());
    }
    debug!(
        "Aligned {} rows x {} assets",
        aligned.len(),
        aligned.assets().len()
    );

    let summary = compute_summary(&compute_returns(&aligned), periods_per_year);

    // charts only ever see the assets that survived the summary
    let survivors = surviving_prices(&aligned, &summary);
    let returns = compute_returns(&survivors);

    Ok(ReportData {
        normalized: normalize(&survivors),
        drawdowns: compute_drawdown_series(&returns),
        correlation: compute_correlation(&returns),
        sma: rolling_mean(&survivors, sma_window),
        sma_window,
        prices: survivors,
        summary,
    })
}

/// Execute the pipeline with the given provider.
pub fn run(settings: &Settings, provider: &dyn PriceProvider) -> Result<RunOutcome> {
    let cache =
        PriceCache::new(&settings.data_dir).with_max_age_hours(settings.cache_max_age_hours);
    let source = PriceSource::new(provider, cache)
        .bypass_cache(settings.no_cache)
        .offline(settings.offline);

    let prices = source.load(&settings.tickers, &settings.range)?;
    let data = analyze(&prices, settings.periods_per_year, settings.sma_window)?;

    let summary_path = settings.output_dir.join(SUMMARY_FILENAME);
    reports::write_summary_csv(&summary_path, &data.summary)?;
    info!("Saved: {}", summary_path.display());

    let artifacts =
        reports::write_report(&settings.output_dir, &data, &settings.range.to_string())?;

    let kept = data.summary.assets();
    let excluded = normalize_tickers(&settings.tickers)
        .into_iter()
        .filter(|t| !kept.contains(t))
        .collect();

    Ok(RunOutcome {
        rows_used: data.prices.len(),
        summary: data.summary,
        excluded,
        summary_path,
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn test_analyze_filters_prices_to_survivors() {
        let prices = PriceTable::new(
            vec![d(1), d(2), d(3), d(6)],
            vec!["UP".into(), "FLAT".into(), "GONE".into()],
            vec![
                vec![Some(10.0), Some(5.0), None],
                vec![Some(11.0), Some(5.0), None],
                vec![Some(10.5), Some(5.0), None],
                vec![Some(12.0), Some(5.0), None],
            ],
        )
        .unwrap();

        let data = analyze(&prices, 252, 2).unwrap();
        assert_eq!(data.summary.assets(), vec!["UP".to_string()]);
        assert_eq!(data.prices.assets(), &["UP".to_string()]);
        assert_eq!(data.normalized.assets(), &["UP".to_string()]);
        assert_eq!(data.drawdowns.assets, vec!["UP".to_string()]);
        assert_eq!(data.correlation.assets, vec!["UP".to_string()]);
        assert_eq!(data.drawdowns.len(), 3);
    }

    #[test]
    fn test_analyze_all_missing_is_empty_data() {
        let prices = PriceTable::new(
            vec![d(1), d(2)],
            vec!["A".into(), "B".into()],
            vec![vec![Some(1.0), None], vec![None, Some(2.0)]],
        )
        .unwrap();
        let err = analyze(&prices, 252, 30).unwrap_err();
        assert!(crate::error::is_empty_data(&err));
    }
}
