// Reports module - summary CSV, SVG charts and the combined HTML report

pub mod charts;
pub mod html;

use anyhow::Context;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::models::{CorrelationMatrix, DrawdownTable, PriceTable, SeriesTable, SummaryTable};
use crate::utils::format_raw;
pub use html::{build_html_report, ReportMeta, DEFAULT_TITLE};

pub const SUMMARY_FILENAME: &str = "summary_metrics.csv";
pub const REPORT_FILENAME: &str = "report.html";

/// Derived series the charts are drawn from. All tables cover the same
/// surviving assets.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub summary: SummaryTable,
    pub prices: PriceTable,
    pub normalized: PriceTable,
    pub drawdowns: DrawdownTable,
    pub correlation: CorrelationMatrix,
    pub sma: SeriesTable,
    pub sma_window: usize,
}

/// One rendered chart and the file it is saved to.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub file_name: String,
    pub svg: String,
}

/// `summary_metrics.csv` with one row per surviving asset.
pub fn write_summary_csv(path: &Path, summary: &SummaryTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(["asset", "ann_return", "ann_vol", "sharpe", "max_drawdown"])?;
    for m in &summary.rows {
        writer.write_record([
            m.asset.clone(),
            format_raw(m.annualized_return),
            format_raw(m.annualized_volatility),
            format_raw(m.sharpe_ratio),
            format_raw(m.max_drawdown),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn trend_file_name(asset: &str) -> String {
    let stem: String = asset
        .chars()
        .filter(|c| *c != '^')
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("price_trend_{}.svg", stem)
}

/// Render every chart in report order.
pub fn build_charts(data: &ReportData) -> Vec<ChartArtifact> {
    let mut out = vec![
        ChartArtifact {
            file_name: "normalized_performance.svg".to_string(),
            svg: charts::normalized_chart(&data.normalized),
        },
        ChartArtifact {
            file_name: "correlation_heatmap.svg".to_string(),
            svg: charts::correlation_heatmap(&data.correlation),
        },
        ChartArtifact {
            file_name: "drawdown_chart.svg".to_string(),
            svg: charts::drawdown_chart(&data.drawdowns),
        },
        ChartArtifact {
            file_name: "risk_return_map.svg".to_string(),
            svg: charts::risk_return_map(&data.summary),
        },
    ];

    for (j, asset) in data.prices.assets().iter().enumerate() {
        let closes = data
            .prices
            .column(j)
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        let sma = data.sma.column_by_name(asset).unwrap_or_default();
        out.push(ChartArtifact {
            file_name: trend_file_name(asset),
            svg: charts::price_trend_chart(
                asset,
                data.prices.dates(),
                closes,
                sma,
                data.sma_window,
            ),
        });
    }
    out
}

/// Write each chart as an SVG file plus `report.html`. Returns the paths written.
pub fn write_report(out_dir: &Path, data: &ReportData, range: &str) -> Result<Vec<PathBuf>> {
    let charts = build_charts(data);
    let mut written = Vec::with_capacity(charts.len() + 1);

    for chart in &charts {
        let path = out_dir.join(&chart.file_name);
        fs::write(&path, &chart.svg)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    let dates = data.prices.dates();
    let meta = ReportMeta {
        title: DEFAULT_TITLE,
        range: range.to_string(),
        first_date: dates.first().map(|d| d.to_string()),
        last_date: dates.last().map(|d| d.to_string()),
        generated_at: Local::now(),
    };
    let html = build_html_report(&meta, &data.summary, &charts);
    let report_path = out_dir.join(REPORT_FILENAME);
    fs::write(&report_path, html)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    info!("Saved: {}", report_path.display());
    written.push(report_path);

    Ok(written)
}
