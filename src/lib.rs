//! Market Tracker - historical price analytics and reporting
//!
//! This library fetches daily price history for a set of tickers, computes
//! annualized return, volatility, Sharpe ratio and maximum drawdown per
//! asset, and renders the results as SVG charts and a single HTML report.

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod pricing;
pub mod reports;
pub mod utils;
