use chrono::{DateTime, Local};

use super::charts::escape;
use super::ChartArtifact;
use crate::models::SummaryTable;
use crate::utils::{format_percent, format_ratio};

pub const DEFAULT_TITLE: &str = "Financial Data Tracker Report";

const STYLE: &str = "body{font-family:Arial,sans-serif;margin:24px auto;max-width:820px;color:#222}\
h1{margin-bottom:4px}.meta{color:#666;margin-top:0}\
table{border-collapse:collapse;margin:16px 0}th,td{padding:4px 10px;border-bottom:1px solid #ddd;text-align:right}\
th:first-child,td:first-child{text-align:left}.neg{color:#b2182b}.pos{color:#2166ac}\
.chart{margin:24px 0}.chart svg{max-width:100%;height:auto}";

/// Everything the report header says about the run.
pub struct ReportMeta<'a> {
    pub title: &'a str,
    pub range: String,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub generated_at: DateTime<Local>,
}

fn signed_class(value: f64) -> &'static str {
    if value < 0.0 {
        "neg"
    } else {
        "pos"
    }
}

fn summary_table_html(summary: &SummaryTable) -> String {
    if summary.is_empty() {
        return "<p>No asset had enough price history to compute metrics.</p>".to_string();
    }
    let mut html = String::from(
        "<table><thead><tr><th>Asset</th><th>Ann. Return</th><th>Ann. Volatility</th>\
         <th>Sharpe</th><th>Max Drawdown</th></tr></thead><tbody>",
    );
    for m in &summary.rows {
        html.push_str(&format!(
            r#"<tr><td>{asset}</td><td class="{rc}">{ret}</td><td>{vol}</td><td class="{sc}">{sharpe}</td><td class="neg">{dd}</td></tr>"#,
            asset = escape(&m.asset),
            rc = signed_class(m.annualized_return),
            ret = format_percent(m.annualized_return),
            vol = format_percent(m.annualized_volatility),
            sc = signed_class(m.sharpe_ratio),
            sharpe = format_ratio(m.sharpe_ratio),
            dd = format_percent(m.max_drawdown)
        ));
    }
    html.push_str("</tbody></table>");
    html
}

/// Single self-contained HTML page: header, summary table, then every chart inline.
pub fn build_html_report(
    meta: &ReportMeta,
    summary: &SummaryTable,
    charts: &[ChartArtifact],
) -> String {
    let mut parts = Vec::with_capacity(charts.len() + 4);
    parts.push(format!(
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8"><title>{title}</title><style>{style}</style></head><body>"#,
        title = escape(meta.title),
        style = STYLE
    ));
    parts.push(format!("<h1>{}</h1>", escape(meta.title)));

    let span = match (&meta.first_date, &meta.last_date) {
        (Some(first), Some(last)) => format!("{} to {}", first, last),
        _ => "no price history".to_string(),
    };
    parts.push(format!(
        r#"<p class="meta">Auto-generated market tracking report. Requested range: {range}; data: {span}; generated {at}.</p>"#,
        range = escape(&meta.range),
        span = escape(&span),
        at = meta.generated_at.format("%Y-%m-%d %H:%M")
    ));

    parts.push("<h2>Summary Metrics</h2>".to_string());
    parts.push(summary_table_html(summary));

    for chart in charts {
        parts.push(format!(r#"<div class="chart">{}</div>"#, chart.svg));
    }
    parts.push("</body></html>".to_string());
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetMetrics;

    fn meta() -> ReportMeta<'static> {
        ReportMeta {
            title: DEFAULT_TITLE,
            range: "3y".to_string(),
            first_date: Some("2024-01-02".to_string()),
            last_date: Some("2024-12-31".to_string()),
            generated_at: Local::now(),
        }
    }

    #[test]
    fn test_report_embeds_charts_and_table() {
        let summary = SummaryTable {
            rows: vec![AssetMetrics {
                asset: "SPY".into(),
                annualized_return: 0.12,
                annualized_volatility: 0.18,
                sharpe_ratio: 0.6667,
                max_drawdown: -0.2,
            }],
        };
        let charts = vec![ChartArtifact {
            file_name: "a.svg".into(),
            svg: "<svg>marker</svg>".into(),
        }];
        let html = build_html_report(&meta(), &summary, &charts);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<svg>marker</svg>"));
        assert!(html.contains("<td>SPY</td>"));
        assert!(html.contains("12.00%"));
        assert!(html.contains("-20.00%"));
        assert!(html.contains("2024-01-02 to 2024-12-31"));
    }

    #[test]
    fn test_empty_summary_message() {
        let html = build_html_report(&meta(), &SummaryTable::default(), &[]);
        assert!(html.contains("No asset had enough price history"));
    }
}
