//! tender-worker: one scrape-and-dispatch run of the eTenders listing.
//!
//! Reads configuration from the environment (and `.env`), walks the listing,
//! sends normalized tenders to the FIFO queue, then prints the run summary
//! as JSON on stdout.
//!
//! Exit status is 1 when a page could not be fetched, or with `--strict`
//! when any batch failed to send.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tender_core::config::{self, Config};
use tender_ingest::{ETendersAdapter, HttpPageFetcher, Pipeline, PipelineLimits};
use tender_queue::{LogProducer, QueueProducer, RetryPolicy, SqsProducer};

// ── CLI ─────────────────────────────────────────────────────────────

/// Scrape open eTenders listings and deliver them to the tender queue.
#[derive(Parser, Debug)]
#[command(name = "tender-worker", version, about)]
struct Cli {
    /// Log messages instead of sending them. QUEUE_URL is not required.
    #[arg(long, env = "TENDER_DRY_RUN")]
    dry_run: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "TENDER_LOG_JSON")]
    log_json: bool,

    /// Exit non-zero when any batch could not be delivered.
    #[arg(long)]
    strict: bool,

    /// Only tenders published on or after this date (YYYY-MM-DD).
    #[arg(long)]
    date_from: Option<NaiveDate>,

    /// Only tenders published on or before this date (YYYY-MM-DD).
    #[arg(long)]
    date_to: Option<NaiveDate>,

    /// Stop after this many pages.
    #[arg(long)]
    max_pages: Option<u32>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if self.date_from.is_some() {
            config.source.date_from = self.date_from;
        }
        if self.date_to.is_some() {
            config.source.date_to = self.date_to;
        }
        if let Some(max_pages) = self.max_pages {
            config.source.max_pages = max_pages;
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    config::load_dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = Config::from_env().context("failed to load configuration")?;
    cli.apply(&mut config);
    config.check_ranges().context("invalid command line override")?;
    config
        .validate(!cli.dry_run)
        .context("configuration is incomplete for a live run")?;
    config.log_summary();

    let producer: Arc<dyn QueueProducer> = if cli.dry_run {
        warn!("Dry run: messages are logged, not sent");
        Arc::new(LogProducer)
    } else {
        Arc::new(
            SqsProducer::new(&config.aws, &config.queue)
                .await
                .context("failed to build SQS client")?,
        )
    };
    let fetcher = HttpPageFetcher::new(&config.source).context("failed to build HTTP client")?;

    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        Arc::new(ETendersAdapter),
        producer,
        PipelineLimits::from_config(&config),
        RetryPolicy::from_config(&config.queue),
    );
    let summary = pipeline.run().await;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !summary.is_success() {
        warn!(outcome = ?summary.outcome, "Run failed");
        return Ok(ExitCode::FAILURE);
    }
    if cli.strict && summary.batches_failed > 0 {
        warn!(failed = summary.batches_failed, "Undelivered batches in strict mode");
        return Ok(ExitCode::FAILURE);
    }
    info!(run_id = %summary.run_id, "tender-worker exited cleanly");
    Ok(ExitCode::SUCCESS)
}
