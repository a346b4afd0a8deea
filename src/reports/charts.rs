//! SVG chart rendering.
//!
//! Each public function returns a self-contained `<svg>` document that can be
//! written to disk as-is or inlined into the HTML report.

use chrono::NaiveDate;

use crate::models::{CorrelationMatrix, DrawdownTable, PriceTable, SeriesTable, SummaryTable};
use crate::utils::{format_percent, format_ratio};

const WIDTH: f64 = 760.0;
const HEIGHT: f64 = 360.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 36.0;
const MARGIN_BOTTOM: f64 = 40.0;
const Y_TICKS: usize = 5;
const X_TICKS: usize = 6;
const NAN_CELL_COLOR: &str = "#dddddd";
const AXIS_COLOR: &str = "#444444";
const GRID_COLOR: &str = "#e5e5e5";

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

pub fn series_color(idx: usize) -> &'static str {
    PALETTE[idx % PALETTE.len()]
}

/// One labelled line on a chart.
pub struct LineSeries<'a> {
    pub label: &'a str,
    pub values: Vec<f64>,
    pub color: &'a str,
    pub dash: bool,
}

/// Rectangle of the plotting area plus the value range mapped onto it.
struct Frame {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    min_v: f64,
    max_v: f64,
}

impl Frame {
    fn new(width: f64, height: f64, (min_v, max_v): (f64, f64)) -> Self {
        Self {
            left: MARGIN_LEFT,
            right: width - MARGIN_RIGHT,
            top: MARGIN_TOP,
            bottom: height - MARGIN_BOTTOM,
            min_v,
            max_v,
        }
    }

    fn x_index(&self, idx: usize, len: usize) -> f64 {
        if len <= 1 {
            return (self.left + self.right) / 2.0;
        }
        self.left + (self.right - self.left) * idx as f64 / (len - 1) as f64
    }

    fn x_value(&self, v: f64, min_x: f64, max_x: f64) -> f64 {
        self.left + (self.right - self.left) * (v - min_x) / (max_x - min_x)
    }

    fn y(&self, v: f64) -> f64 {
        let norm = (v - self.min_v) / (self.max_v - self.min_v);
        self.bottom - norm * (self.bottom - self.top)
    }
}

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn svg_header(width: f64, height: f64) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}"><style>text{{font-family:Arial,sans-serif;font-size:11px;fill:#444}}.title{{font-size:14px;font-weight:bold;fill:#222}}</style><rect width="100%" height="100%" fill="#ffffff"/>"##,
        w = width,
        h = height
    )
}

fn svg_title(svg: &mut String, width: f64, title: &str) {
    svg.push_str(&format!(
        r#"<text class="title" x="{x:.1}" y="22" text-anchor="middle">{t}</text>"#,
        x = width / 2.0,
        t = escape(title)
    ));
}

/// Placeholder shown when there is nothing to plot.
pub fn empty_chart(title: &str) -> String {
    let mut svg = svg_header(WIDTH, HEIGHT);
    svg_title(&mut svg, WIDTH, title);
    svg.push_str(&format!(
        r#"<text x="{x:.1}" y="{y:.1}" text-anchor="middle">No data to display</text></svg>"#,
        x = WIDTH / 2.0,
        y = HEIGHT / 2.0
    ));
    svg
}

/// Min and max over finite values plus any extra reference values,
/// padded so flat data still gets a visible range.
fn value_extent<'a>(
    values: impl Iterator<Item = &'a f64>,
    extra: &'a [f64],
) -> Option<(f64, f64)> {
    let (min_v, max_v) = values
        .chain(extra.iter())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    if !min_v.is_finite() {
        return None;
    }
    if (max_v - min_v).abs() < f64::EPSILON {
        let pad = if min_v == 0.0 { 1.0 } else { min_v.abs() * 0.05 };
        return Some((min_v - pad, max_v + pad));
    }
    let pad = (max_v - min_v) * 0.05;
    Some((min_v - pad, max_v + pad))
}

fn draw_y_axis(svg: &mut String, frame: &Frame, format_y: fn(f64) -> String) {
    for i in 0..Y_TICKS {
        let v = frame.min_v + (frame.max_v - frame.min_v) * i as f64 / (Y_TICKS - 1) as f64;
        let y = frame.y(v);
        svg.push_str(&format!(
            r#"<line x1="{x1:.1}" y1="{y:.1}" x2="{x2:.1}" y2="{y:.1}" stroke="{c}" stroke-width="1"/>"#,
            x1 = frame.left,
            x2 = frame.right,
            y = y,
            c = GRID_COLOR
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}" text-anchor="end">{label}</text>"#,
            x = frame.left - 6.0,
            y = y + 4.0,
            label = escape(&format_y(v))
        ));
    }
    svg.push_str(&format!(
        r#"<line x1="{x:.1}" y1="{y1:.1}" x2="{x:.1}" y2="{y2:.1}" stroke="{c}" stroke-width="1"/>"#,
        x = frame.left,
        y1 = frame.top,
        y2 = frame.bottom,
        c = AXIS_COLOR
    ));
}

fn draw_time_axis(svg: &mut String, frame: &Frame, dates: &[NaiveDate]) {
    svg.push_str(&format!(
        r#"<line x1="{x1:.1}" y1="{y:.1}" x2="{x2:.1}" y2="{y:.1}" stroke="{c}" stroke-width="1"/>"#,
        x1 = frame.left,
        x2 = frame.right,
        y = frame.bottom,
        c = AXIS_COLOR
    ));
    if dates.is_empty() {
        return;
    }
    let ticks = X_TICKS.min(dates.len());
    let mut last_idx = None;
    for i in 0..ticks {
        let idx = if ticks == 1 {
            0
        } else {
            i * (dates.len() - 1) / (ticks - 1)
        };
        if last_idx == Some(idx) {
            continue;
        }
        last_idx = Some(idx);
        let x = frame.x_index(idx, dates.len());
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}" text-anchor="middle">{label}</text>"#,
            x = x,
            y = frame.bottom + 16.0,
            label = dates[idx].format("%Y-%m-%d")
        ));
    }
}

fn draw_legend(svg: &mut String, frame: &Frame, series: &[LineSeries]) {
    let mut y = frame.top + 12.0;
    let x = frame.left + 10.0;
    for s in series {
        svg.push_str(&format!(
            r#"<line x1="{x1:.1}" y1="{y:.1}" x2="{x2:.1}" y2="{y:.1}" stroke="{c}" stroke-width="2" stroke-dasharray="{dash}"/>"#,
            x1 = x,
            x2 = x + 18.0,
            y = y - 4.0,
            c = s.color,
            dash = if s.dash { "4 3" } else { "0" }
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}">{label}</text>"#,
            x = x + 24.0,
            y = y,
            label = escape(s.label)
        ));
        y += 15.0;
    }
}

/// Runs of consecutive finite values, so gaps break the line.
fn segments(values: &[f64]) -> Vec<Vec<(usize, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (idx, v) in values.iter().enumerate() {
        if v.is_finite() {
            current.push((idx, *v));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Multi-series line chart over a shared date axis, with an optional
/// dashed horizontal reference line.
pub fn line_chart(
    title: &str,
    dates: &[NaiveDate],
    series: &[LineSeries],
    format_y: fn(f64) -> String,
    reference: Option<f64>,
) -> String {
    let extra: Vec<f64> = reference.into_iter().collect();
    let Some(extent) = value_extent(series.iter().flat_map(|s| s.values.iter()), &extra) else {
        return empty_chart(title);
    };
    if dates.is_empty() {
        return empty_chart(title);
    }

    let frame = Frame::new(WIDTH, HEIGHT, extent);
    let mut svg = svg_header(WIDTH, HEIGHT);
    svg_title(&mut svg, WIDTH, title);
    draw_y_axis(&mut svg, &frame, format_y);

    if let Some(r) = reference {
        svg.push_str(&format!(
            r##"<line x1="{x1:.1}" y1="{y:.1}" x2="{x2:.1}" y2="{y:.1}" stroke="#999999" stroke-width="1" stroke-dasharray="4 3"/>"##,
            x1 = frame.left,
            x2 = frame.right,
            y = frame.y(r)
        ));
    }

    for s in series {
        for run in segments(&s.values) {
            let points = run
                .iter()
                .map(|(idx, v)| {
                    format!("{:.2},{:.2}", frame.x_index(*idx, dates.len()), frame.y(*v))
                })
                .collect::<Vec<_>>()
                .join(" ");
            svg.push_str(&format!(
                r#"<polyline fill="none" stroke="{c}" stroke-width="1.6" stroke-dasharray="{dash}" points="{points}"/>"#,
                c = s.color,
                dash = if s.dash { "4 3" } else { "0" },
                points = points
            ));
        }
    }

    draw_time_axis(&mut svg, &frame, dates);
    draw_legend(&mut svg, &frame, series);
    svg.push_str("</svg>");
    svg
}

fn price_series(prices: &PriceTable) -> Vec<LineSeries<'_>> {
    prices
        .assets()
        .iter()
        .enumerate()
        .map(|(j, asset)| LineSeries {
            label: asset,
            values: prices.column(j).map(|v| v.unwrap_or(f64::NAN)).collect(),
            color: series_color(j),
            dash: false,
        })
        .collect()
}

fn table_series(table: &SeriesTable) -> Vec<LineSeries<'_>> {
    table
        .assets
        .iter()
        .enumerate()
        .map(|(j, asset)| LineSeries {
            label: asset,
            values: table.column(j),
            color: series_color(j),
            dash: false,
        })
        .collect()
}

pub fn normalized_chart(normalized: &PriceTable) -> String {
    line_chart(
        "Normalized Performance (Start = 1.0)",
        normalized.dates(),
        &price_series(normalized),
        format_ratio,
        Some(1.0),
    )
}

pub fn drawdown_chart(drawdowns: &DrawdownTable) -> String {
    line_chart(
        "Drawdown (by Asset)",
        &drawdowns.dates,
        &table_series(drawdowns),
        format_percent,
        Some(0.0),
    )
}

/// Close price with its trailing moving average.
pub fn price_trend_chart(
    asset: &str,
    dates: &[NaiveDate],
    closes: Vec<f64>,
    sma: Vec<f64>,
    window: usize,
) -> String {
    let sma_label = format!("{}-Day SMA", window);
    let series = [
        LineSeries {
            label: "Close Price",
            values: closes,
            color: series_color(0),
            dash: false,
        },
        LineSeries {
            label: &sma_label,
            values: sma,
            color: series_color(1),
            dash: true,
        },
    ];
    line_chart(
        &format!("{} Price Trend", asset),
        dates,
        &series,
        format_ratio,
        None,
    )
}

/// Blue (+1) / white (0) / red (-1) diverging scale.
pub fn rdbu_color(value: f64) -> String {
    if !value.is_finite() {
        return NAN_CELL_COLOR.to_string();
    }
    let v = value.clamp(-1.0, 1.0);
    let (target, t) = if v >= 0.0 {
        ((33.0, 102.0, 172.0), v)
    } else {
        ((178.0, 24.0, 43.0), -v)
    };
    let mix = |c: f64| (255.0 + (c - 255.0) * t).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(target.0), mix(target.1), mix(target.2))
}

pub fn correlation_heatmap(corr: &CorrelationMatrix) -> String {
    let title = "Return Correlation Heatmap";
    let n = corr.len();
    if n == 0 {
        return empty_chart(title);
    }

    let label_w = 80.0;
    let cell = ((HEIGHT - MARGIN_TOP - MARGIN_BOTTOM) / n as f64).clamp(18.0, 70.0);
    let grid = cell * n as f64;
    let width = (label_w + grid + 90.0).max(360.0);
    let height = MARGIN_TOP + grid + MARGIN_BOTTOM;

    let mut svg = svg_header(width, height);
    svg_title(&mut svg, width, title);

    for (i, row_asset) in corr.assets.iter().enumerate() {
        let y = MARGIN_TOP + cell * i as f64;
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}" text-anchor="end">{label}</text>"#,
            x = label_w - 6.0,
            y = y + cell / 2.0 + 4.0,
            label = escape(row_asset)
        ));
        for (j, value) in corr.values[i].iter().enumerate() {
            let x = label_w + cell * j as f64;
            svg.push_str(&format!(
                r##"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{w:.1}" fill="{fill}" stroke="#ffffff"/>"##,
                x = x,
                y = y,
                w = cell,
                fill = rdbu_color(*value)
            ));
            if cell >= 28.0 && value.is_finite() {
                let ink = if value.abs() > 0.6 { "#ffffff" } else { "#222222" };
                svg.push_str(&format!(
                    r#"<text x="{x:.1}" y="{y:.1}" text-anchor="middle" style="fill:{ink}">{v:.2}</text>"#,
                    x = x + cell / 2.0,
                    y = y + cell / 2.0 + 4.0,
                    ink = ink,
                    v = value
                ));
            }
        }
    }

    for (j, col_asset) in corr.assets.iter().enumerate() {
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}" text-anchor="middle">{label}</text>"#,
            x = label_w + cell * j as f64 + cell / 2.0,
            y = MARGIN_TOP + grid + 16.0,
            label = escape(col_asset)
        ));
    }

    // colour bar from +1 (top) to -1 (bottom)
    let bar_x = label_w + grid + 24.0;
    let steps = 20;
    let step_h = grid / steps as f64;
    for k in 0..steps {
        let v = 1.0 - 2.0 * (k as f64 + 0.5) / steps as f64;
        svg.push_str(&format!(
            r#"<rect x="{x:.1}" y="{y:.1}" width="14" height="{h:.2}" fill="{fill}"/>"#,
            x = bar_x,
            y = MARGIN_TOP + step_h * k as f64,
            h = step_h + 0.5,
            fill = rdbu_color(v)
        ));
    }
    let bar_labels = [
        ("1", MARGIN_TOP + 8.0),
        ("0", MARGIN_TOP + grid / 2.0 + 4.0),
        ("-1", MARGIN_TOP + grid),
    ];
    for (label, y) in bar_labels {
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}">{label}</text>"#,
            x = bar_x + 20.0,
            y = y,
            label = label
        ));
    }

    svg.push_str("</svg>");
    svg
}

/// Scatter of annualized volatility (x) against annualized return (y);
/// marker area grows with the absolute Sharpe ratio.
pub fn risk_return_map(summary: &SummaryTable) -> String {
    let title = "Risk-Return Map (Size = Sharpe)";
    if summary.is_empty() {
        return empty_chart(title);
    }
    let Some((min_x, max_x)) = value_extent(
        summary.rows.iter().map(|m| &m.annualized_volatility),
        &[0.0],
    ) else {
        return empty_chart(title);
    };
    let Some(y_extent) = value_extent(summary.rows.iter().map(|m| &m.annualized_return), &[0.0])
    else {
        return empty_chart(title);
    };

    let frame = Frame::new(WIDTH, HEIGHT, y_extent);
    let mut svg = svg_header(WIDTH, HEIGHT);
    svg_title(&mut svg, WIDTH, title);
    draw_y_axis(&mut svg, &frame, format_percent);

    svg.push_str(&format!(
        r#"<line x1="{x1:.1}" y1="{y:.1}" x2="{x2:.1}" y2="{y:.1}" stroke="{c}" stroke-width="1"/>"#,
        x1 = frame.left,
        x2 = frame.right,
        y = frame.bottom,
        c = AXIS_COLOR
    ));
    for i in 0..X_TICKS {
        let v = min_x + (max_x - min_x) * i as f64 / (X_TICKS - 1) as f64;
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}" text-anchor="middle">{label}</text>"#,
            x = frame.x_value(v, min_x, max_x),
            y = frame.bottom + 16.0,
            label = escape(&format_percent(v))
        ));
    }
    svg.push_str(&format!(
        r#"<text x="{x:.1}" y="{y:.1}" text-anchor="middle">Annualized volatility</text>"#,
        x = (frame.left + frame.right) / 2.0,
        y = frame.bottom + 32.0
    ));

    let max_sharpe = summary
        .rows
        .iter()
        .map(|m| m.sharpe_ratio.abs())
        .fold(0.0_f64, f64::max);

    for (idx, m) in summary.rows.iter().enumerate() {
        let scale = if max_sharpe > 0.0 {
            m.sharpe_ratio.abs() / max_sharpe
        } else {
            0.0
        };
        let r = 4.0 + 14.0 * scale.sqrt();
        let cx = frame.x_value(m.annualized_volatility, min_x, max_x);
        let cy = frame.y(m.annualized_return);
        svg.push_str(&format!(
            r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r:.1}" fill="{c}" fill-opacity="0.6" stroke="{c}"><title>{label}: Sharpe {s:.2}</title></circle>"#,
            cx = cx,
            cy = cy,
            r = r,
            c = series_color(idx),
            label = escape(&m.asset),
            s = m.sharpe_ratio
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}">{label}</text>"#,
            x = cx + r + 3.0,
            y = cy + 4.0,
            label = escape(&m.asset)
        ));
    }

    svg.push_str("</svg>");
    svg
}
