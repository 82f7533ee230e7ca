//! Sequential batch processing with per-item failure isolation.
//!
//! Every input runs through exclusion check, optional extraction, record
//! building and delivery before the next one starts. No error ends a batch;
//! manual sessions stop only on the `quit` sentinel or when the input
//! source runs dry.

pub mod terminal;

use tracing::{debug, error, info, warn};

use crate::delivery::{DeliveryError, DeliveryOutcome, FactSink};
use crate::exclusion::{ExclusionSet, domain_of};
use crate::extractor::PageSource;
use crate::fetcher::FetchError;
use crate::record::{BatchMetadata, FactRecord, RawFactInput, RecordError};

/// Fact text that ends a manual session.
pub const QUIT_SENTINEL: &str = "quit";

/// Characters of scraped text shown in logs.
const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ExcludedDomain(String),
    EmptyFact,
    BlankUrl,
}

#[derive(Debug)]
pub enum ItemOutcome {
    Skipped(SkipReason),
    FetchFailed(FetchError),
    Delivered(DeliveryOutcome),
    DeliveryFailed(DeliveryError),
}

#[derive(Debug)]
pub struct ItemReport {
    /// The URL for scraped pages, the fact text for manual entries.
    pub input: String,
    pub outcome: ItemOutcome,
}

/// Typed mirror of what a batch logged.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    fn push(&mut self, input: impl Into<String>, outcome: ItemOutcome) {
        self.items.push(ItemReport {
            input: input.into(),
            outcome,
        });
    }

    /// Records that reached the endpoint, whatever the status.
    pub fn attempts(&self) -> usize {
        self.items
            .iter()
            .filter(|item| {
                matches!(
                    item.outcome,
                    ItemOutcome::Delivered(_) | ItemOutcome::DeliveryFailed(_)
                )
            })
            .count()
    }

    pub fn delivered(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::Delivered(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                ItemOutcome::FetchFailed(_) | ItemOutcome::DeliveryFailed(_)
            )
        })
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }
}

pub struct BatchRunner<P, S> {
    exclusions: ExclusionSet,
    pages: P,
    sink: S,
}

impl<P: PageSource, S: FactSink> BatchRunner<P, S> {
    pub fn new(exclusions: ExclusionSet, pages: P, sink: S) -> Self {
        Self {
            exclusions,
            pages,
            sink,
        }
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Process operator entries until the `quit` sentinel or the end of
    /// `entries`.
    pub async fn run_manual<I>(&self, entries: I) -> BatchReport
    where
        I: IntoIterator<Item = RawFactInput>,
    {
        let mut report = BatchReport::default();

        for entry in entries {
            let fact = entry.fact.trim();

            if fact.eq_ignore_ascii_case(QUIT_SENTINEL) {
                info!("Quit requested, ending manual session");
                break;
            }

            if let Some(domain) = self.excluded_domain(&entry.url) {
                info!(%domain, "Skipping excluded domain");
                report.push(fact, ItemOutcome::Skipped(SkipReason::ExcludedDomain(domain)));
                continue;
            }

            let record = match FactRecord::build(&entry) {
                Ok(record) => record,
                Err(RecordError::EmptyFact) => {
                    info!("Skipping entry without fact text");
                    report.push(fact, ItemOutcome::Skipped(SkipReason::EmptyFact));
                    continue;
                }
            };

            let outcome = self.deliver(&record).await;
            report.push(fact, outcome);
        }

        self.log_summary(&report);
        report
    }

    /// Scrape every URL and deliver one record per page. `metadata` is
    /// shared by all records of the batch.
    pub async fn run_urls<I>(&self, urls: I, metadata: &BatchMetadata) -> BatchReport
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut report = BatchReport::default();

        for url in urls {
            let url = url.as_ref().trim();

            if url.is_empty() {
                report.push(url, ItemOutcome::Skipped(SkipReason::BlankUrl));
                continue;
            }

            if let Some(domain) = self.excluded_domain(url) {
                info!(%url, %domain, "Skipping excluded domain");
                report.push(url, ItemOutcome::Skipped(SkipReason::ExcludedDomain(domain)));
                continue;
            }

            info!(%url, "Scraping");
            let page = match self.pages.extract(url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(%url, error = %e, "Skipping page that could not be fetched");
                    report.push(url, ItemOutcome::FetchFailed(e));
                    continue;
                }
            };

            debug!(
                %url,
                title = %page.title,
                preview = %preview(&page.text, PREVIEW_CHARS),
                "Scraped text"
            );

            let record = match FactRecord::from_page(&page, metadata) {
                Ok(record) => record,
                Err(RecordError::EmptyFact) => {
                    info!(%url, "Skipping page without visible text");
                    report.push(url, ItemOutcome::Skipped(SkipReason::EmptyFact));
                    continue;
                }
            };

            let outcome = self.deliver(&record).await;
            report.push(url, outcome);
        }

        self.log_summary(&report);
        report
    }

    fn excluded_domain(&self, url: &str) -> Option<String> {
        domain_of(url).filter(|domain| self.exclusions.is_excluded(domain))
    }

    async fn deliver(&self, record: &FactRecord) -> ItemOutcome {
        info!(record_id = %record.id, source_type = %record.source_type, "Sending fact record");

        match self.sink.send(record).await {
            Ok(outcome) if outcome.is_success() => {
                info!(
                    record_id = %record.id,
                    status = %outcome.status,
                    response = %outcome.body,
                    "Fact record delivered"
                );
                ItemOutcome::Delivered(outcome)
            }
            Ok(outcome) => {
                warn!(
                    record_id = %record.id,
                    status = %outcome.status,
                    response = %outcome.body,
                    "Endpoint answered with an error status"
                );
                ItemOutcome::Delivered(outcome)
            }
            Err(e) => {
                error!(record_id = %record.id, error = %e, "Failed to deliver fact record");
                ItemOutcome::DeliveryFailed(e)
            }
        }
    }

    fn log_summary(&self, report: &BatchReport) {
        info!(
            delivered = report.delivered(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Batch finished"
        );
    }
}

/// First `max_chars` characters of `text`, on a char boundary.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
