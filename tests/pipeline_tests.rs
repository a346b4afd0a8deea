use anyhow::Result;
use chrono::{Duration, NaiveDate};
use std::cell::Cell;
use std::fs;
use tempfile::TempDir;
use tracker::config::Settings;
use tracker::error::{is_empty_data, TrackerError};
use tracker::models::PriceTable;
use tracker::pipeline::{ensure_dirs, run};
use tracker::pricing::{PriceProvider, RangeSpec};

/// Serves a fixed set of series and counts how often it was asked.
struct StubProvider {
    series: Vec<(String, Vec<(NaiveDate, f64)>)>,
    calls: Cell<usize>,
}

impl StubProvider {
    fn new(series: Vec<(&str, Vec<f64>)>) -> Self {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let series = series
            .into_iter()
            .map(|(name, closes)| {
                let points = closes
                    .into_iter()
                    .enumerate()
                    .map(|(i, p)| (start + Duration::days(i as i64), p))
                    .collect();
                (name.to_string(), points)
            })
            .collect();
        Self {
            series,
            calls: Cell::new(0),
        }
    }
}

impl PriceProvider for StubProvider {
    fn fetch(&self, tickers: &[String], _range: &RangeSpec) -> Result<PriceTable> {
        self.calls.set(self.calls.get() + 1);
        let picked = tickers
            .iter()
            .map(|t| {
                let points = self
                    .series
                    .iter()
                    .find(|(name, _)| name == t)
                    .map(|(_, p)| p.clone())
                    .unwrap_or_default();
                (t.clone(), points)
            })
            .collect();
        Ok(PriceTable::from_series(picked))
    }
}

fn settings(home: &TempDir, tickers: &[&str]) -> Settings {
    Settings {
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        range: RangeSpec::Years(1),
        output_dir: home.path().join("outputs"),
        data_dir: home.path().join("data"),
        sma_window: 3,
        offline: false,
        ..Settings::default()
    }
}

fn wave(start: f64, drift: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| start * (1.0 + drift * i as f64) + if i % 2 == 0 { 0.5 } else { -0.5 })
        .collect()
}

#[test]
fn full_run_writes_every_artifact() {
    let home = TempDir::new().unwrap();
    let provider = StubProvider::new(vec![
        ("SPY", wave(400.0, 0.002, 40)),
        ("TLT", wave(90.0, -0.001, 40)),
    ]);
    let settings = settings(&home, &["spy", "tlt"]);
    ensure_dirs(&settings).unwrap();

    let outcome = run(&settings, &provider).unwrap();
    assert_eq!(outcome.summary.assets(), vec!["SPY".to_string(), "TLT".to_string()]);
    assert!(outcome.excluded.is_empty());
    assert_eq!(outcome.rows_used, 40);

    let out = &settings.output_dir;
    for name in [
        "summary_metrics.csv",
        "normalized_performance.svg",
        "correlation_heatmap.svg",
        "drawdown_chart.svg",
        "risk_return_map.svg",
        "price_trend_spy.svg",
        "price_trend_tlt.svg",
        "report.html",
    ] {
        assert!(out.join(name).exists(), "missing {}", name);
    }

    let html = fs::read_to_string(out.join("report.html")).unwrap();
    assert!(html.contains("<svg"));
    assert!(html.contains("SPY"));

    for m in &outcome.summary.rows {
        assert!(m.max_drawdown <= 0.0);
        assert!(m.annualized_volatility > 0.0);
    }
}

#[test]
fn missing_ticker_and_flat_price_are_excluded() {
    let home = TempDir::new().unwrap();
    let provider = StubProvider::new(vec![
        ("GLD", wave(180.0, 0.001, 20)),
        ("FLAT", vec![10.0; 20]),
    ]);
    let settings = settings(&home, &["GLD", "FLAT", "NOPE"]);
    ensure_dirs(&settings).unwrap();

    let outcome = run(&settings, &provider).unwrap();
    assert_eq!(outcome.summary.assets(), vec!["GLD".to_string()]);
    assert_eq!(outcome.excluded, vec!["FLAT".to_string(), "NOPE".to_string()]);

    let csv = fs::read_to_string(&outcome.summary_path).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(!settings.output_dir.join("price_trend_flat.svg").exists());
    assert!(settings.output_dir.join("price_trend_gld.svg").exists());
}

#[test]
fn empty_provider_fails_before_writing_outputs() {
    let home = TempDir::new().unwrap();
    let provider = StubProvider::new(vec![]);
    let settings = settings(&home, &["ZZZ1", "ZZZ2"]);
    ensure_dirs(&settings).unwrap();

    let err = run(&settings, &provider).unwrap_err();
    assert!(is_empty_data(&err));
    assert_eq!(fs::read_dir(&settings.output_dir).unwrap().count(), 0);
    assert_eq!(fs::read_dir(&settings.data_dir).unwrap().count(), 0);
}

#[test]
fn second_run_is_served_from_cache() {
    let home = TempDir::new().unwrap();
    let provider = StubProvider::new(vec![
        ("EFA", wave(70.0, 0.001, 15)),
        ("EEM", wave(40.0, -0.002, 15)),
    ]);
    let settings = settings(&home, &["EFA", "EEM"]);
    ensure_dirs(&settings).unwrap();

    let first = run(&settings, &provider).unwrap();
    let second = run(&settings, &provider).unwrap();
    assert_eq!(provider.calls.get(), 1);
    assert_eq!(first.summary, second.summary);

    let cache_file = settings.data_dir.join("tracker_prices_EEM-EFA_1y.csv");
    assert!(cache_file.exists());
}

#[test]
fn offline_without_cache_is_a_pricing_error() {
    let home = TempDir::new().unwrap();
    let provider = StubProvider::new(vec![("SPY", wave(400.0, 0.001, 10))]);
    let mut settings = settings(&home, &["SPY"]);
    settings.offline = true;
    ensure_dirs(&settings).unwrap();

    let err = run(&settings, &provider).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TrackerError>(),
        Some(TrackerError::Pricing(_))
    ));
    assert_eq!(provider.calls.get(), 0);
}
