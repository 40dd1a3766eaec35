//! Run orchestration: one query, page by page, through loader and extractor.
//!
//! Control flow is strictly sequential: one session, one page, one index at
//! a time. The sink is flushed per record, so every terminal failure path
//! leaves everything collected so far on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use super::CrawlError;
use super::extractor::RecordExtractor;
use super::loader::IncrementalScrollLoader;
use super::supervision::SupervisionPolicy;
use crate::domain::job::JobPosting;
use crate::domain::pagination::PaginationPlanner;
use crate::domain::query::SearchQuery;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::parsing::ListingParser;
use crate::infrastructure::session::{BrowsingSession, SessionError, SessionResult};
use crate::infrastructure::sink::{OutputFormat, RecordSink};

/// Continuous progress over a run: processed vs expected record counts.
#[derive(Debug)]
pub struct RunProgress {
    processed: u64,
    expected: u64,
}

impl RunProgress {
    pub fn new(expected: u64) -> Self {
        Self {
            processed: 0,
            expected,
        }
    }

    pub fn record(&mut self, posting: &JobPosting) {
        self.processed += 1;
        info!(
            "Processed {}/{} records: {} at {}",
            self.processed, self.expected, posting.title, posting.company
        );
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub total_results: u64,
    pub pages_visited: u32,
    pub pages_skipped: u32,
    pub records: u64,
    pub output: PathBuf,
}

pub struct CrawlRun<'a> {
    session: &'a dyn BrowsingSession,
    parser: &'a ListingParser,
    config: &'a AppConfig,
    supervisor: &'a dyn SupervisionPolicy,
}

impl<'a> CrawlRun<'a> {
    pub fn new(
        session: &'a dyn BrowsingSession,
        parser: &'a ListingParser,
        config: &'a AppConfig,
        supervisor: &'a dyn SupervisionPolicy,
    ) -> Self {
        Self {
            session,
            parser,
            config,
            supervisor,
        }
    }

    /// Crawl one query: discover the result count, plan the pages, and run
    /// every page through the scroll loader and the record extractor.
    pub async fn execute(
        &self,
        query: &SearchQuery,
        requested_pages: u32,
        out_dir: &Path,
        format: OutputFormat,
    ) -> Result<RunSummary, CrawlError> {
        let profile = &self.config.site;
        let mut sink = RecordSink::create(out_dir, &query.file_stem(), format)?;

        let first_url = query.url_for_page(1, profile.page_size);
        self.navigate_with_retry(first_url.as_str()).await?;
        self.await_structure()
            .await
            .map_err(|_| CrawlError::PageStructure {
                selector: profile.end_of_results.clone(),
            })?;

        let total_results = self.discover_total().await;
        let planner = PaginationPlanner::new(profile.page_size);
        let plan = planner.plan(total_results, requested_pages);
        let expected_total: u64 = plan.iter().map(|s| u64::from(s.expected_items)).sum();

        info!(
            "{} total results; visiting {} pages for up to {} records",
            total_results,
            plan.len(),
            expected_total
        );

        let mut progress = RunProgress::new(expected_total);
        let loader = IncrementalScrollLoader::new(
            self.session,
            self.parser,
            profile,
            &self.config.timing,
            self.supervisor,
            self.config.scraping.retry_ceiling,
        );
        let extractor = RecordExtractor::new(
            self.session,
            self.parser,
            profile,
            &self.config.timing,
            self.supervisor,
            self.config.scraping.retry_ceiling,
        );

        let mut pages_visited = 0;
        let mut pages_skipped = 0;

        for slot in &plan {
            let page_url = query.url_for_page(slot.number, profile.page_size);

            if slot.number > 1 {
                self.navigate_with_retry(page_url.as_str()).await?;
                if self.await_structure().await.is_err() {
                    warn!(
                        "Skipping page {}: listing structure did not appear",
                        slot.number
                    );
                    pages_skipped += 1;
                    continue;
                }
            }

            let listing = loader.load(slot.expected_items).await?;
            let appended = extractor
                .extract_page(&listing, &page_url, &mut sink, &mut progress)
                .await?;

            info!(
                "Page {} done: {} records appended ({} expected)",
                slot.number, appended, slot.expected_items
            );
            pages_visited += 1;

            self.page_pause().await;
        }

        Ok(RunSummary {
            total_results,
            pages_visited,
            pages_skipped,
            records: sink.records_written(),
            output: sink.path().to_path_buf(),
        })
    }

    /// Navigate with fixed backoff on driver-level connectivity failures.
    /// Past the attempt limit the failure is terminal for the run; the sink
    /// already holds every record appended so far.
    async fn navigate_with_retry(&self, url: &str) -> Result<(), CrawlError> {
        let attempts = self.config.scraping.navigation_attempts.max(1);
        let backoff = Duration::from_millis(self.config.timing.navigation_backoff_ms);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.session.navigate(url).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_network() => {
                    warn!("Navigation attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = e.to_string();
                    if attempt < attempts && !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CrawlError::Network {
            attempts,
            message: last_error,
        })
    }

    /// Wait for the end-of-results marker that renders once the listing
    /// skeleton is in place.
    async fn await_structure(&self) -> SessionResult<()> {
        let profile = &self.config.site;
        let timeout = Duration::from_millis(self.config.timing.structure_wait_ms);
        let attempts = self.config.scraping.structure_attempts.max(1);
        let mut last_error = SessionError::wait_timeout(&profile.end_of_results, timeout);

        for attempt in 1..=attempts {
            match self.session.wait_for(&profile.end_of_results, timeout).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "Listing structure wait {}/{} failed: {}",
                        attempt, attempts, e
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Total result count from the caption, falling back to one page's worth
    /// when the caption is absent or carries no number.
    async fn discover_total(&self) -> u64 {
        let profile = &self.config.site;

        match self.session.read_text(&profile.result_count_caption).await {
            Ok(caption) => self
                .parser
                .result_count(&caption)
                .unwrap_or_else(|| u64::from(profile.page_size)),
            Err(e) => {
                warn!("Result-count caption unavailable ({}); assuming one page", e);
                u64::from(profile.page_size)
            }
        }
    }

    async fn page_pause(&self) {
        if self.config.timing.page_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.timing.page_delay_ms)).await;
        }
    }
}
