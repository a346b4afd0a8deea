//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of metric calculation from presentation.

use colored::Colorize;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};
use tracker::models::SummaryTable;
use tracker::pipeline::RunOutcome;
use tracker::utils::{format_percent, format_ratio};

/// Format a run summary for JSON output
pub fn format_summary_json(outcome: &RunOutcome) -> String {
    #[derive(Serialize)]
    struct JsonRun<'a> {
        assets: &'a SummaryTable,
        excluded: &'a [String],
        rows_used: usize,
        files: Vec<String>,
    }

    let files = std::iter::once(&outcome.summary_path)
        .chain(outcome.artifacts.iter())
        .map(|p| p.display().to_string())
        .collect();

    let json = JsonRun {
        assets: &outcome.summary,
        excluded: &outcome.excluded,
        rows_used: outcome.rows_used,
        files,
    };

    serde_json::to_string_pretty(&json)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

fn signed(value: f64, text: String) -> String {
    if value >= 0.0 {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

/// Format the summary metrics as a terminal table
pub fn format_summary_table(outcome: &RunOutcome) -> String {
    #[derive(Tabled)]
    struct SummaryRow {
        #[tabled(rename = "Asset")]
        asset: String,
        #[tabled(rename = "Ann. Return")]
        ann_return: String,
        #[tabled(rename = "Ann. Vol")]
        ann_vol: String,
        #[tabled(rename = "Sharpe")]
        sharpe: String,
        #[tabled(rename = "Max DD")]
        max_drawdown: String,
    }

    let mut output = format!("\n{} Summary Metrics\n\n", "📊".cyan().bold());

    if outcome.summary.is_empty() {
        output.push_str(&format!(
            "{} No asset had enough price history to compute metrics\n",
            "ℹ".blue().bold()
        ));
    } else {
        let rows: Vec<SummaryRow> = outcome
            .summary
            .rows
            .iter()
            .map(|m| SummaryRow {
                asset: m.asset.clone(),
                ann_return: signed(m.annualized_return, format_percent(m.annualized_return)),
                ann_vol: format_percent(m.annualized_volatility),
                sharpe: signed(m.sharpe_ratio, format_ratio(m.sharpe_ratio)),
                max_drawdown: format_percent(m.max_drawdown).red().to_string(),
            })
            .collect();

        let mut table = Table::new(&rows);
        table.with(Style::modern());
        table.modify(Columns::new(1..), Alignment::right());
        output.push_str(&table.to_string());
        output.push('\n');
    }

    if !outcome.excluded.is_empty() {
        output.push_str(&format!(
            "\n{} Excluded (no data or zero volatility): {}\n",
            "⚠".yellow().bold(),
            outcome.excluded.join(", ")
        ));
    }

    output.push_str(&format!(
        "\n{} {} price rows used\n",
        "ℹ".blue().bold(),
        outcome.rows_used
    ));
    output.push_str(&format!(
        "{} Saved: {}\n",
        "✓".green().bold(),
        outcome.summary_path.display()
    ));
    for path in &outcome.artifacts {
        output.push_str(&format!("{} Saved: {}\n", "✓".green().bold(), path.display()));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tracker::models::AssetMetrics;

    fn outcome() -> RunOutcome {
        RunOutcome {
            summary: SummaryTable {
                rows: vec![AssetMetrics {
                    asset: "QQQ".into(),
                    annualized_return: 0.2,
                    annualized_volatility: 0.25,
                    sharpe_ratio: 0.8,
                    max_drawdown: -0.3,
                }],
            },
            excluded: vec!["FLAT".into()],
            rows_used: 250,
            summary_path: PathBuf::from("outputs/summary_metrics.csv"),
            artifacts: vec![PathBuf::from("outputs/report.html")],
        }
    }

    #[test]
    fn test_summary_table_lists_assets_and_exclusions() {
        colored::control::set_override(false);
        let text = format_summary_table(&outcome());
        assert!(text.contains("QQQ"));
        assert!(text.contains("20.00%"));
        assert!(text.contains("-30.00%"));
        assert!(text.contains("Excluded"));
        assert!(text.contains("FLAT"));
        assert!(text.contains("report.html"));
    }

    #[test]
    fn test_summary_json_is_valid() {
        let json = format_summary_json(&outcome());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["assets"]["rows"][0]["asset"], "QQQ");
        assert_eq!(value["excluded"][0], "FLAT");
        assert_eq!(value["files"].as_array().unwrap().len(), 2);
    }
}
