//! Risk/return calculations over price tables.
//!
//! Every function here is a pure transform: it reads an immutable table and
//! builds a new one. Nothing touches the network or the filesystem.
//!
//! Callers must respect one ordering rule: compute the summary first, then
//! narrow the price table to the assets that survived it
//! ([`surviving_prices`]) before deriving the charted series. Assets whose
//! Sharpe ratio is undefined (zero volatility) never reach the charts.

pub mod stats;

use tracing::debug;

use crate::models::{
    AssetMetrics, CorrelationMatrix, CumulativeTable, DrawdownTable, PriceTable, ReturnTable,
    SeriesTable, SummaryTable,
};

/// Trading days per year used to annualize daily statistics.
pub const DEFAULT_PERIODS_PER_YEAR: u32 = 252;

/// Simple returns `p[t] / p[t-1] - 1`, first row dropped.
///
/// Fewer than two price rows yields an empty table (same assets, no rows).
/// A missing or zero price on either side of a step gives `NaN` for that step.
pub fn compute_returns(prices: &PriceTable) -> ReturnTable {
    if prices.len() < 2 {
        return SeriesTable::empty(prices.assets().to_vec());
    }

    let rows = prices
        .rows()
        .windows(2)
        .map(|pair| {
            pair[0]
                .iter()
                .zip(&pair[1])
                .map(|(prev, cur)| match (prev, cur) {
                    (Some(p), Some(c)) if *p != 0.0 => c / p - 1.0,
                    _ => f64::NAN,
                })
                .collect()
        })
        .collect();

    SeriesTable {
        dates: prices.dates()[1..].to_vec(),
        assets: prices.assets().to_vec(),
        rows,
    }
}

/// Per-asset annualized return, volatility, Sharpe ratio and max drawdown.
///
/// Assets with any undefined statistic are left out of the result; in
/// practice that means zero-volatility assets (undefined Sharpe) and assets
/// with fewer than two returns.
pub fn compute_summary(returns: &ReturnTable, periods_per_year: u32) -> SummaryTable {
    let ppy = f64::from(periods_per_year);
    let drawdowns = compute_drawdown_series(returns);

    let mut rows = Vec::with_capacity(returns.assets.len());
    for (j, asset) in returns.assets.iter().enumerate() {
        let col = returns.column(j);
        let annualized_return = stats::mean(&col) * ppy;
        let annualized_volatility = stats::std_dev(&col) * ppy.sqrt();
        let sharpe_ratio = sharpe(annualized_return, annualized_volatility);
        let max_drawdown = min_value(&drawdowns.column(j));

        let metrics = AssetMetrics {
            asset: asset.clone(),
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            max_drawdown,
        };
        if is_defined(&metrics) {
            rows.push(metrics);
        } else {
            debug!("Excluding {} from summary: undefined metric", asset);
        }
    }

    SummaryTable { rows }
}

fn sharpe(annualized_return: f64, annualized_volatility: f64) -> f64 {
    if annualized_volatility == 0.0 {
        f64::NAN
    } else {
        annualized_return / annualized_volatility
    }
}

fn is_defined(m: &AssetMetrics) -> bool {
    m.annualized_return.is_finite()
        && m.annualized_volatility.is_finite()
        && m.sharpe_ratio.is_finite()
        && m.max_drawdown.is_finite()
}

fn min_value(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
        .unwrap_or(f64::NAN)
}

/// The price table narrowed to the assets present in `summary`, in summary order.
pub fn surviving_prices(prices: &PriceTable, summary: &SummaryTable) -> PriceTable {
    prices.select(&summary.assets())
}

/// Rebase each asset to its first observation. The first row is exactly 1.0
/// for every asset whose first price is present and non-zero; other assets
/// become entirely missing.
pub fn normalize(prices: &PriceTable) -> PriceTable {
    let Some(first) = prices.rows().first() else {
        return prices.clone();
    };
    let bases: Vec<Option<f64>> = first
        .iter()
        .map(|v| v.filter(|b| *b != 0.0))
        .collect();

    let rows = prices
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(&bases)
                .map(|(v, base)| match (v, base) {
                    (Some(v), Some(b)) => Some(v / b),
                    _ => None,
                })
                .collect()
        })
        .collect();

    PriceTable::new(prices.dates().to_vec(), prices.assets().to_vec(), rows)
        .unwrap_or_else(|_| PriceTable::empty())
}

/// Running product of `1 + r` per asset.
pub fn compute_cumulative(returns: &ReturnTable) -> CumulativeTable {
    let mut acc = vec![1.0; returns.assets.len()];
    let rows = returns
        .rows
        .iter()
        .map(|row| {
            for (a, r) in acc.iter_mut().zip(row) {
                *a *= 1.0 + r;
            }
            acc.clone()
        })
        .collect();

    SeriesTable {
        dates: returns.dates.clone(),
        assets: returns.assets.clone(),
        rows,
    }
}

/// Full drawdown path: `cumulative / running_max(cumulative) - 1`.
pub fn compute_drawdown_series(returns: &ReturnTable) -> DrawdownTable {
    let cumulative = compute_cumulative(returns);
    let mut peaks = vec![f64::NEG_INFINITY; cumulative.assets.len()];
    let rows = cumulative
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(peaks.iter_mut())
                .map(|(c, peak)| {
                    *peak = peak.max(*c);
                    if c.is_nan() {
                        f64::NAN
                    } else {
                        (c / *peak - 1.0).min(0.0)
                    }
                })
                .collect()
        })
        .collect();

    SeriesTable {
        dates: cumulative.dates,
        assets: cumulative.assets,
        rows,
    }
}

/// Pearson correlation for every asset pair, using the dates on which both
/// returns are defined. The diagonal is 1.0 for assets with non-zero
/// variance and `NaN` otherwise.
pub fn compute_correlation(returns: &ReturnTable) -> CorrelationMatrix {
    let n = returns.assets.len();
    let columns: Vec<Vec<f64>> = (0..n).map(|j| returns.column(j)).collect();
    let mut values = vec![vec![f64::NAN; n]; n];

    for i in 0..n {
        let own: Vec<f64> = columns[i].iter().copied().filter(|v| v.is_finite()).collect();
        let sd = stats::std_dev(&own);
        values[i][i] = if sd.is_finite() && sd > 0.0 { 1.0 } else { f64::NAN };

        for j in (i + 1)..n {
            let (xs, ys): (Vec<f64>, Vec<f64>) = columns[i]
                .iter()
                .zip(&columns[j])
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|(x, y)| (*x, *y))
                .unzip();
            let r = stats::pearson(&xs, &ys);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        assets: returns.assets.clone(),
        values,
    }
}

/// Trailing simple moving average over `window` prices. The first
/// `window - 1` rows, and any window containing a gap, are `NaN`.
pub fn rolling_mean(prices: &PriceTable, window: usize) -> SeriesTable {
    let window = window.max(1);
    let n_assets = prices.assets().len();
    let rows = (0..prices.len())
        .map(|t| {
            (0..n_assets)
                .map(|j| {
                    if t + 1 < window {
                        return f64::NAN;
                    }
                    let slice = &prices.rows()[t + 1 - window..=t];
                    let vals: Option<Vec<f64>> = slice.iter().map(|row| row[j]).collect();
                    vals.map_or(f64::NAN, |v| stats::mean(&v))
                })
                .collect()
        })
        .collect();

    SeriesTable {
        dates: prices.dates().to_vec(),
        assets: prices.assets().to_vec(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const EPS: f64 = 1e-9;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, day).unwrap()
    }

    fn table(assets: &[&str], cols: &[&[f64]]) -> PriceTable {
        let n = cols[0].len();
        let dates = (1..=n as u32).map(d).collect();
        let rows = (0..n)
            .map(|t| cols.iter().map(|c| Some(c[t])).collect())
            .collect();
        PriceTable::new(dates, assets.iter().map(|a| a.to_string()).collect(), rows).unwrap()
    }

    #[test]
    fn test_returns_drop_first_row() {
        let prices = table(&["X"], &[&[100.0, 110.0, 99.0]]);
        let rets = compute_returns(&prices);
        assert_eq!(rets.len(), prices.len() - 1);
        assert_eq!(rets.dates, vec![d(2), d(3)]);
        assert!((rets.rows[0][0] - 0.10).abs() < EPS);
        assert!((rets.rows[1][0] + 0.10).abs() < EPS);
    }

    #[test]
    fn test_returns_of_single_row_is_empty() {
        let prices = table(&["X", "Y"], &[&[100.0], &[5.0]]);
        let rets = compute_returns(&prices);
        assert!(rets.is_empty());
        assert_eq!(rets.assets.len(), 2);
    }

    #[test]
    fn test_summary_of_up_down_scenario() {
        let prices = table(&["X"], &[&[100.0, 110.0, 99.0]]);
        let summary = compute_summary(&compute_returns(&prices), DEFAULT_PERIODS_PER_YEAR);
        let x = summary.get("X").expect("X survives");
        assert!(x.annualized_return.abs() < EPS);
        assert!(x.annualized_volatility > 0.0);
        assert!((x.max_drawdown + 0.10).abs() < EPS);
    }

    #[test]
    fn test_summary_excludes_constant_price() {
        let prices = table(&["FLAT", "X"], &[&[50.0, 50.0, 50.0], &[100.0, 110.0, 99.0]]);
        let summary = compute_summary(&compute_returns(&prices), DEFAULT_PERIODS_PER_YEAR);
        assert_eq!(summary.assets(), vec!["X".to_string()]);
        assert!(summary.get("FLAT").is_none());
    }

    #[test]
    fn test_summary_annualization() {
        let prices = table(&["X"], &[&[100.0, 101.0, 100.0, 102.0, 101.0]]);
        let rets = compute_returns(&prices);
        let col = rets.column(0);
        let summary = compute_summary(&rets, 12);
        let x = &summary.rows[0];
        assert!((x.annualized_return - stats::mean(&col) * 12.0).abs() < EPS);
        assert!((x.annualized_volatility - stats::std_dev(&col) * 12f64.sqrt()).abs() < EPS);
        assert!((x.sharpe_ratio - x.annualized_return / x.annualized_volatility).abs() < EPS);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let prices = table(&["A", "B"], &[&[10.0, 11.0, 10.5, 12.0], &[5.0, 4.0, 4.5, 4.2]]);
        let rets = compute_returns(&prices);
        let first = compute_summary(&rets, DEFAULT_PERIODS_PER_YEAR);
        let second = compute_summary(&rets, DEFAULT_PERIODS_PER_YEAR);
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_first_row_is_one() {
        let prices = table(&["A", "B"], &[&[3.7, 4.0, 2.0], &[0.13, 0.2, 0.3]]);
        let norm = normalize(&prices);
        assert_eq!(norm.rows()[0], vec![Some(1.0), Some(1.0)]);
        assert!((norm.rows()[2][0].unwrap() - 2.0 / 3.7).abs() < EPS);
    }

    #[test]
    fn test_drawdown_series_never_positive() {
        let prices = table(&["A"], &[&[100.0, 120.0, 90.0, 130.0, 80.0, 85.0]]);
        let dd = compute_drawdown_series(&compute_returns(&prices));
        assert!(dd.rows.iter().all(|r| r[0] <= 0.0));
        assert_eq!(dd.rows[0][0], 0.0);
        assert_eq!(dd.rows[2][0], 0.0);
        assert!((dd.rows[1][0] - (90.0 / 120.0 - 1.0)).abs() < EPS);
        assert!((dd.rows[3][0] - (80.0 / 130.0 - 1.0)).abs() < EPS);
    }

    #[test]
    fn test_cumulative_matches_price_ratio() {
        let prices = table(&["A"], &[&[100.0, 110.0, 99.0]]);
        let cum = compute_cumulative(&compute_returns(&prices));
        assert!((cum.rows[0][0] - 1.10).abs() < EPS);
        assert!((cum.rows[1][0] - 0.99).abs() < EPS);
    }

    #[test]
    fn test_correlation_symmetric_with_unit_diagonal() {
        let prices = table(
            &["A", "B", "C"],
            &[
                &[10.0, 11.0, 10.5, 12.0, 11.0],
                &[20.0, 21.0, 19.0, 22.0, 23.0],
                &[5.0, 4.0, 4.5, 4.2, 4.8],
            ],
        );
        let corr = compute_correlation(&compute_returns(&prices));
        for i in 0..3 {
            assert_eq!(corr.values[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(corr.values[i][j], corr.values[j][i]);
                assert!(corr.values[i][j] >= -1.0 && corr.values[i][j] <= 1.0);
            }
        }
    }

    #[test]
    fn test_correlation_of_flat_asset_is_undefined() {
        let prices = table(&["FLAT", "X"], &[&[50.0, 50.0, 50.0, 50.0], &[1.0, 2.0, 1.5, 3.0]]);
        let corr = compute_correlation(&compute_returns(&prices));
        assert!(corr.get("FLAT", "FLAT").unwrap().is_nan());
        assert!(corr.get("FLAT", "X").unwrap().is_nan());
        assert!(corr.get("X", "FLAT").unwrap().is_nan());
        assert_eq!(corr.get("X", "X"), Some(1.0));
    }

    #[test]
    fn test_normalize_without_usable_base_is_all_missing() {
        let prices = PriceTable::new(
            vec![d(1), d(2), d(3)],
            vec!["GAP".into(), "ZERO".into(), "OK".into()],
            vec![
                vec![None, Some(0.0), Some(4.0)],
                vec![Some(2.0), Some(1.0), Some(5.0)],
                vec![Some(3.0), Some(2.0), Some(6.0)],
            ],
        )
        .unwrap();
        let norm = normalize(&prices);
        assert!(norm.column(0).all(|v| v.is_none()));
        assert!(norm.column(1).all(|v| v.is_none()));
        assert_eq!(norm.rows()[0][2], Some(1.0));
        assert_eq!(norm.rows()[2][2], Some(1.5));
    }

    #[test]
    fn test_correlation_of_scaled_series_is_one() {
        let prices = table(&["A", "B"], &[&[1.0, 2.0, 1.5, 3.0], &[2.0, 4.0, 3.0, 6.0]]);
        let corr = compute_correlation(&compute_returns(&prices));
        assert!((corr.get("A", "B").unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_surviving_prices_follow_summary() {
        let prices = table(&["FLAT", "X"], &[&[50.0, 50.0, 50.0], &[100.0, 110.0, 99.0]]);
        let summary = compute_summary(&compute_returns(&prices), DEFAULT_PERIODS_PER_YEAR);
        let kept = surviving_prices(&prices, &summary);
        assert_eq!(kept.assets(), &["X".to_string()]);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_rolling_mean_window() {
        let prices = table(&["A"], &[&[1.0, 2.0, 3.0, 4.0]]);
        let sma = rolling_mean(&prices, 3);
        assert!(sma.rows[0][0].is_nan());
        assert!(sma.rows[1][0].is_nan());
        assert!((sma.rows[2][0] - 2.0).abs() < EPS);
        assert!((sma.rows[3][0] - 3.0).abs() < EPS);
    }
}
