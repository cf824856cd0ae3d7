//! One pipeline run: fetch → adapt → normalize → partition → dispatch.
//!
//! Pages are walked sequentially until the listing ends, the page cap is
//! hit, a fetch fails, or the fetch budget runs out. Whatever was normalized
//! up to that point is then batched and dispatched under its own deadline,
//! so a late stop never loses records that were already collected.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{timeout, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use tender_core::{normalize, Config, SourceTag, TenderRecord};
use tender_queue::{partition, BatchOutcome, DeliveryReport, Dispatcher, QueueProducer, RetryPolicy};

use crate::adapter::SourceAdapter;
use crate::fetch::PageFetcher;
use crate::pagination::PageCursor;

/// Size and time bounds of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineLimits {
    pub batch_size: usize,
    pub max_pages: u32,
    pub fetch_budget: Duration,
    pub dispatch_budget: Duration,
}

impl PipelineLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.queue.batch_size,
            max_pages: config.source.max_pages,
            fetch_budget: config.run.fetch_budget(),
            dispatch_budget: config.run.dispatch_budget(),
        }
    }
}

/// How the fetch phase ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every page was read (or the page cap was reached).
    Completed,
    /// The fetch budget ran out before pagination finished.
    DeadlineReached,
    /// A page could not be fetched or unwrapped.
    FetchFailed { page: u32, error: String },
}

/// Externally visible result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub source: SourceTag,
    pub group_id: String,
    pub pages_fetched: u32,
    pub fetched: usize,
    pub validated: usize,
    pub dropped_invalid: usize,
    pub batches_sent: usize,
    pub batches_failed: usize,
    pub messages_sent: usize,
    /// Every batch that was not delivered, with its reason.
    pub failed_batches: Vec<BatchOutcome>,
    pub page_cap_reached: bool,
    pub outcome: RunOutcome,
    pub elapsed_ms: u64,
}

impl RunSummary {
    fn new(source: SourceTag, group_id: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source,
            group_id: group_id.to_string(),
            pages_fetched: 0,
            fetched: 0,
            validated: 0,
            dropped_invalid: 0,
            batches_sent: 0,
            batches_failed: 0,
            messages_sent: 0,
            failed_batches: Vec::new(),
            page_cap_reached: false,
            outcome: RunOutcome::Completed,
            elapsed_ms: 0,
        }
    }

    /// False when the run itself failed (fetch error). Failed batches alone
    /// do not fail the run; they are listed in `failed_batches`.
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, RunOutcome::FetchFailed { .. })
    }

    fn record_delivery(&mut self, report: DeliveryReport) {
        self.batches_sent = report.sent();
        self.batches_failed = report.failed();
        self.messages_sent = report.messages_sent();
        self.failed_batches = report.batches.into_iter().filter(|b| !b.is_sent()).collect();
    }
}

/// Wires a fetcher, an adapter and a dispatcher into a single-source run.
pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    adapter: Arc<dyn SourceAdapter>,
    dispatcher: Dispatcher,
    limits: PipelineLimits,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        adapter: Arc<dyn SourceAdapter>,
        producer: Arc<dyn QueueProducer>,
        limits: PipelineLimits,
        policy: RetryPolicy,
    ) -> Self {
        let dispatcher = Dispatcher::new(producer, adapter.group_id(), policy);
        Self {
            fetcher,
            adapter,
            dispatcher,
            limits,
        }
    }

    pub async fn run(&self) -> RunSummary {
        let started = Instant::now();
        let fetch_deadline = started + self.limits.fetch_budget;
        let mut summary = RunSummary::new(self.adapter.source(), self.dispatcher.group_id());

        info!(run_id = %summary.run_id, source = %summary.source, "Starting tender run");

        let records = self.collect(&mut summary, fetch_deadline).await;

        let batches = partition(records, self.limits.batch_size);
        let dispatch_deadline = Instant::now() + self.limits.dispatch_budget;
        let report = self.dispatcher.send_all(batches, dispatch_deadline).await;
        summary.record_delivery(report);
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            run_id = %summary.run_id,
            pages = summary.pages_fetched,
            fetched = summary.fetched,
            validated = summary.validated,
            dropped = summary.dropped_invalid,
            batches_sent = summary.batches_sent,
            batches_failed = summary.batches_failed,
            outcome = ?summary.outcome,
            "Tender run finished"
        );
        summary
    }

    /// Walk pages and normalize items until pagination stops for any reason.
    async fn collect(&self, summary: &mut RunSummary, deadline: Instant) -> Vec<TenderRecord> {
        let mut cursor = PageCursor::new(self.fetcher.page_size(), self.limits.max_pages);
        let mut records = Vec::new();

        while let Some(page) = cursor.next_page() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(page, "Fetch budget spent, not fetching further pages");
                summary.outcome = RunOutcome::DeadlineReached;
                break;
            }

            let offset = cursor.offset();
            let json = match timeout(remaining, self.fetcher.fetch_page(page, offset)).await {
                Ok(Ok(json)) => json,
                Ok(Err(e)) => {
                    error!(page, error = %e, "Failed to fetch page");
                    summary.outcome = RunOutcome::FetchFailed {
                        page,
                        error: e.to_string(),
                    };
                    break;
                }
                Err(_) => {
                    warn!(page, "Fetch budget spent while fetching page");
                    summary.outcome = RunOutcome::DeadlineReached;
                    break;
                }
            };

            let adapted = match self.adapter.adapt_page(&json) {
                Ok(adapted) => adapted,
                Err(e) => {
                    error!(page, error = %e, "Failed to unwrap page");
                    summary.outcome = RunOutcome::FetchFailed {
                        page,
                        error: e.to_string(),
                    };
                    break;
                }
            };

            summary.pages_fetched += 1;
            summary.fetched += adapted.len();
            cursor.advance(&adapted);

            let page_items = adapted.len();
            let before = records.len();
            for item in adapted.items {
                let raw = match item {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(page, error = %e, "Dropping malformed item");
                        summary.dropped_invalid += 1;
                        continue;
                    }
                };
                match normalize(&raw) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!(page, item = %raw.label(), error = %e, "Dropping invalid tender");
                        summary.dropped_invalid += 1;
                    }
                }
            }
            info!(page, items = page_items, valid = records.len() - before, "Page processed");
        }

        summary.validated = records.len();
        summary.page_cap_reached = cursor.hit_page_cap();
        if summary.page_cap_reached {
            warn!(max_pages = self.limits.max_pages, "Page cap reached before the listing ended");
        }
        records
    }
}
