mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracker::config::{self, Settings};
use tracker::pipeline;
use tracker::pricing::YahooProvider;

fn main() -> Result<()> {
    // Initialize logging (stderr, so stdout stays parseable with --json)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let file_config = config::load_file_config(cli.config.as_deref())?;
    let settings = Settings::resolve(file_config, cli.overrides())?;
    info!(
        "Tracking {} over {}",
        settings.tickers.join(", "),
        settings.range
    );

    pipeline::ensure_dirs(&settings)?;

    let provider = YahooProvider::new()?.with_progress(!cli.json);
    let outcome = pipeline::run(&settings, &provider)?;

    if cli.json {
        println!("{}", cli::formatters::format_summary_json(&outcome));
    } else {
        print!("{}", cli::formatters::format_summary_table(&outcome));
        if let Some(report) = outcome.artifacts.last() {
            println!("\nDone. Open {} to view the dashboard.", report.display());
        }
    }

    Ok(())
}
