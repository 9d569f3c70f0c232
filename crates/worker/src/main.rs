use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockmon_core::config::{Config, DEFAULT_CONFIG_PATH};
use stockmon_core::domain::change::compute_price_change;
use stockmon_core::ingest::{fetch_watchlist, YahooClient};
use stockmon_core::report::{write_report, Report, ReportRow};
use stockmon_core::schedule::next_run;

const POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "stockmon_worker")]
struct Args {
    /// Generate one report immediately instead of running the scheduler.
    #[arg(long)]
    now: bool,

    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.now {
        return generate_weekly_report(&args.config).await;
    }

    run_scheduler(&args.config).await
}

async fn run_scheduler(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let weekday = config.schedule.weekday()?;
    let time = config.schedule.time_of_day()?;

    tracing::info!(%weekday, %time, "scheduler configured; generating a report weekly");

    loop {
        let target = next_run(&chrono::Local::now(), weekday, time)?;
        tracing::info!(next_run = %target, "scheduler idle (Ctrl+C to stop)");

        // Coarse polling wait; wakes once a minute until the target passes.
        while chrono::Local::now() < target {
            tokio::select! {
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("scheduler stopped");
                    return Ok(());
                }
            }
        }

        // A failed run is logged in full and must not kill the scheduler.
        if let Err(err) = generate_weekly_report(config_path).await {
            tracing::error!(error = ?err, "report generation failed");
        }
    }
}

async fn generate_weekly_report(config_path: &Path) -> Result<()> {
    tracing::info!("starting weekly report generation");

    let config = Config::load(config_path)?;
    if config.watchlist.is_empty() {
        tracing::warn!("watchlist is empty; check the configuration file");
        return Ok(());
    }

    let provider = YahooClient::from_config(&config.provider)?;
    tracing::info!(tickers = config.watchlist.len(), "fetching watchlist data");

    let delay = Duration::from_millis(config.provider.request_delay_ms);
    let snapshots = fetch_watchlist(&provider, &config.watchlist, delay).await;

    let rows: Vec<ReportRow> = snapshots
        .into_iter()
        .map(|snapshot| {
            let change = compute_price_change(&snapshot);
            ReportRow { snapshot, change }
        })
        .collect();

    let report = Report::new(rows);

    if let Some(path) = write_report(&config.report, &report)? {
        tracing::info!(path = %path.display(), "report generated");
    }

    log_run_summary(&report);
    Ok(())
}

fn log_run_summary(report: &Report) {
    for row in &report.rows {
        let snapshot = &row.snapshot;
        if snapshot.is_error() {
            continue;
        }

        let price = snapshot
            .current_price
            .map(|p| format!("{p:.2} {}", snapshot.currency))
            .unwrap_or_else(|| "N/A".to_string());

        match &row.change.week {
            Some(week) => tracing::info!(
                ticker = %snapshot.ticker,
                company = %snapshot.company_name,
                price = %price,
                week_change = %format!("{:+.2}%", week.percentage),
                "report summary"
            ),
            None => tracing::info!(
                ticker = %snapshot.ticker,
                company = %snapshot.company_name,
                price = %price,
                "report summary"
            ),
        }
    }
}
