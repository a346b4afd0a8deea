use anyhow::{anyhow, Context};
use chrono::{Days, NaiveDate};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{PriceProvider, RangeSpec};
use crate::error::{Result, TrackerError};
use crate::models::PriceTable;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; MarketTracker/1.0)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Yahoo Finance chart response
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(rename = "gmtoffset")]
    gmt_offset: Option<i64>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

/// Daily adjusted closes from the Yahoo Finance v8 chart API.
pub struct YahooProvider {
    client: Client,
    base_url: String,
    show_progress: bool,
}

impl YahooProvider {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            show_progress: true,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn chart_url(&self, symbol: &str, range: &RangeSpec) -> Result<String> {
        let window = match range {
            RangeSpec::Years(n) => format!("range={}y", n),
            RangeSpec::Dates { from, to } => {
                let period1 = from
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| anyhow!("Invalid from date"))?
                    .and_utc()
                    .timestamp();
                // period2 is exclusive
                let period2 = to
                    .checked_add_days(Days::new(1))
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .ok_or_else(|| anyhow!("Invalid to date"))?
                    .and_utc()
                    .timestamp();
                format!("period1={}&period2={}", period1, period2)
            }
        };
        Ok(format!(
            "{}/{}?{}&interval=1d&events=div%2Csplits",
            self.base_url, symbol, window
        ))
    }

    /// Fetch one symbol's daily series. Unknown symbols yield an empty series.
    pub fn fetch_history(&self, symbol: &str, range: &RangeSpec) -> Result<Vec<(NaiveDate, f64)>> {
        let url = self.chart_url(symbol, range)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .context("Failed to send request to Yahoo Finance")?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!("Yahoo Finance has no data for {}", symbol);
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(TrackerError::Pricing(format!(
                "Yahoo Finance returned error status {} for {}",
                response.status(),
                symbol
            ))
            .into());
        }

        let data: YahooChartResponse = response
            .json()
            .context("Failed to parse Yahoo Finance response")?;
        parse_chart(symbol, data)
    }
}

/// Flatten a chart payload into `(date, price)` points, preferring adjusted
/// closes. Days without a price are skipped.
fn parse_chart(symbol: &str, data: YahooChartResponse) -> Result<Vec<(NaiveDate, f64)>> {
    if let Some(error) = data.chart.error {
        warn!(
            "Yahoo Finance API error for {}: {} - {}",
            symbol, error.code, error.description
        );
        return Ok(Vec::new());
    }

    let Some(result) = data.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };
    if let Some(currency) = &result.meta.currency {
        debug!("{} quoted in {}", symbol, currency);
    }
    let offset = result.meta.gmt_offset.unwrap_or(0);

    let adjusted = result
        .indicators
        .adjclose
        .and_then(|a| a.into_iter().next())
        .and_then(|a| a.adjclose);
    let closes = match adjusted {
        Some(values) => values,
        None => result
            .indicators
            .quote
            .into_iter()
            .next()
            .and_then(|q| q.close)
            .unwrap_or_default(),
    };

    let mut points = Vec::with_capacity(timestamps.len());
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(timestamp + offset, 0)
            .ok_or_else(|| anyhow!("Invalid timestamp {} for {}", timestamp, symbol))?
            .date_naive();
        if let Some(price) = closes.get(i).copied().flatten() {
            if price.is_finite() && price > 0.0 {
                points.push((date, price));
            }
        }
    }
    Ok(points)
}

impl PriceProvider for YahooProvider {
    fn fetch(&self, tickers: &[String], range: &RangeSpec) -> Result<PriceTable> {
        info!(
            "Fetching {} tickers from Yahoo Finance ({})",
            tickers.len(),
            range
        );

        let bar = if self.show_progress {
            ProgressBar::new(tickers.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
            bar.set_style(style);
        }

        let mut series = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            bar.set_message(ticker.clone());
            let points = self
                .fetch_history(ticker, range)
                .with_context(|| format!("Failed to fetch {}", ticker))?;
            debug!("{}: {} price points", ticker, points.len());
            series.push((ticker.clone(), points));
            bar.inc(1);
        }
        bar.finish_and_clear();

        if series.iter().all(|(_, points)| points.is_empty()) {
            return Err(TrackerError::EmptyData(format!(
                "Yahoo Finance returned no prices for {}",
                tickers.join(", ")
            ))
            .into());
        }

        Ok(PriceTable::from_series(series))
    }
}
