use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracker::config::Overrides;

pub mod formatters;

#[derive(Parser)]
#[command(name = "tracker")]
#[command(
    version,
    about = "Historical market tracker with risk/return metrics and HTML report"
)]
#[command(
    long_about = "Fetch daily price history for a set of tickers, compute annualized return, volatility, Sharpe ratio and maximum drawdown, and write SVG charts plus a combined HTML report."
)]
pub struct Cli {
    /// Tickers to track (ETFs/indices/crypto) [default: SPY QQQ TLT GLD USO EFA EEM]
    #[arg(short, long, num_args = 1.., value_name = "TICKER")]
    pub tickers: Option<Vec<String>>,

    /// Years of history to fetch, ending today [default: 3]
    #[arg(short, long)]
    pub years: Option<u32>,

    /// Start date (YYYY-MM-DD) instead of a year span
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), defaults to today when --from is given
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Directory for the summary CSV, charts and report [default: outputs]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Directory for cached price data [default: data]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Ignore cached prices and fetch fresh data
    #[arg(long)]
    pub no_cache: bool,

    /// Output results in JSON format
    #[arg(long = "json")]
    pub json: bool,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Cli {
    /// Command-line values that take precedence over the config file.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            tickers: self.tickers.clone(),
            years: self.years,
            from: self.from,
            to: self.to,
            output_dir: self.output_dir.clone(),
            data_dir: self.data_dir.clone(),
            no_cache: self.no_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ticker_list_and_years() {
        let cli = Cli::try_parse_from(["tracker", "--tickers", "spy", "gld", "--years", "5"])
            .expect("parse failed");
        let o = cli.overrides();
        assert_eq!(o.tickers, Some(vec!["spy".to_string(), "gld".to_string()]));
        assert_eq!(o.years, Some(5));
        assert!(!o.no_cache);
    }

    #[test]
    fn parses_date_range() {
        let cli = Cli::try_parse_from(["tracker", "--from", "2022-01-01", "--to", "2024-12-31"])
            .expect("parse failed");
        assert_eq!(cli.from, NaiveDate::from_ymd_opt(2022, 1, 1));
        assert_eq!(cli.to, NaiveDate::from_ymd_opt(2024, 12, 31));
    }

    #[test]
    fn rejects_bad_date() {
        assert!(Cli::try_parse_from(["tracker", "--from", "01/02/2022"]).is_err());
    }

    #[test]
    fn defaults_are_left_to_config() {
        let cli = Cli::try_parse_from(["tracker"]).expect("parse failed");
        let o = cli.overrides();
        assert!(o.tickers.is_none());
        assert!(o.years.is_none());
    }
}
