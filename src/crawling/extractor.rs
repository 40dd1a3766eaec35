//! Per-index record extraction from a satisfied listing.
//!
//! Indices are processed strictly in listing order. An index either
//! completes, with all six fields resolved and the record flushed to the
//! sink, or the operator is asked to intervene. Nothing is skipped silently
//! and nothing partial is ever persisted.

use std::time::Duration;

use tracing::debug;
use url::Url;

use super::CrawlError;
use super::loader::{ReadyListing, scroll_sweep};
use super::run::RunProgress;
use super::supervision::{RetryBudget, SupervisionPolicy, absorb_failure};
use crate::domain::job::{JobPosting, PostingDraft, absolute_link, external_id_from_link};
use crate::domain::listing::is_fully_loaded;
use crate::infrastructure::config::{SiteProfile, TimingConfig};
use crate::infrastructure::parsing::ListingParser;
use crate::infrastructure::session::{BrowsingSession, SessionError, SessionResult};
use crate::infrastructure::sink::RecordSink;

pub struct RecordExtractor<'a> {
    session: &'a dyn BrowsingSession,
    parser: &'a ListingParser,
    profile: &'a SiteProfile,
    timing: &'a TimingConfig,
    supervisor: &'a dyn SupervisionPolicy,
    retry_ceiling: u32,
}

impl<'a> RecordExtractor<'a> {
    pub fn new(
        session: &'a dyn BrowsingSession,
        parser: &'a ListingParser,
        profile: &'a SiteProfile,
        timing: &'a TimingConfig,
        supervisor: &'a dyn SupervisionPolicy,
        retry_ceiling: u32,
    ) -> Self {
        Self {
            session,
            parser,
            profile,
            timing,
            supervisor,
            retry_ceiling,
        }
    }

    /// Extract every index of the satisfied listing into the sink, in order.
    /// Returns the number of records appended.
    pub async fn extract_page(
        &self,
        listing: &ReadyListing,
        page_url: &Url,
        sink: &mut RecordSink,
        progress: &mut RunProgress,
    ) -> Result<u32, CrawlError> {
        let mut appended = 0;

        for index in 0..listing.snapshot.len() {
            self.open_detail(index).await?;
            let description = self.capture_description(index).await?;
            let record = self.resolve_fields(index, page_url, description).await?;

            sink.append(&record)?;
            appended += 1;
            progress.record(&record);

            self.pace().await;
        }

        Ok(appended)
    }

    /// Click the item's detail link, re-locating the live handle fresh on
    /// every attempt so stale references never survive a retry.
    async fn open_detail(&self, index: usize) -> Result<(), CrawlError> {
        let mut budget = RetryBudget::new(self.retry_ceiling);

        loop {
            match self.try_click(index).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    absorb_failure(
                        &mut budget,
                        self.supervisor,
                        "detail open",
                        &format!("index {index}: {e}"),
                    )
                    .await?;
                    self.rescroll().await;
                }
            }
        }
    }

    async fn try_click(&self, index: usize) -> SessionResult<()> {
        match self.session.probe_item(self.profile, index).await? {
            Some(probe) if is_fully_loaded(&probe) => {
                self.session.click_item_link(self.profile, index).await
            }
            _ => Err(SessionError::not_found(&self.profile.item_link)),
        }
    }

    /// Wait for the detail pane and read its text. A wait timeout is a
    /// retryable condition, not a failure of the run.
    async fn capture_description(&self, index: usize) -> Result<String, CrawlError> {
        let mut budget = RetryBudget::new(self.retry_ceiling);
        let timeout = Duration::from_millis(self.timing.detail_wait_ms);

        loop {
            let outcome = match self
                .session
                .wait_for(&self.profile.detail_description, timeout)
                .await
            {
                Ok(()) => self.session.read_text(&self.profile.detail_description).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => {
                    absorb_failure(
                        &mut budget,
                        self.supervisor,
                        "detail description",
                        &format!("index {index}: description pane rendered empty"),
                    )
                    .await?;
                }
                Err(e) => {
                    absorb_failure(
                        &mut budget,
                        self.supervisor,
                        "detail description",
                        &format!("index {index}: {e}"),
                    )
                    .await?;
                }
            }
        }
    }

    /// Re-parse the page source and resolve every listing field from the
    /// fresh snapshot. A missing element retries the whole step; a record is
    /// only built once all fields are present.
    async fn resolve_fields(
        &self,
        index: usize,
        page_url: &Url,
        description: String,
    ) -> Result<JobPosting, CrawlError> {
        let mut budget = RetryBudget::new(self.retry_ceiling);

        loop {
            match self.try_fields(index, page_url, &description).await {
                Ok(Some(record)) => return Ok(record),
                Ok(None) => {
                    absorb_failure(
                        &mut budget,
                        self.supervisor,
                        "field extraction",
                        &format!("index {index}: listing fields incomplete after re-parse"),
                    )
                    .await?;
                    self.rescroll().await;
                }
                Err(e) => {
                    absorb_failure(
                        &mut budget,
                        self.supervisor,
                        "field extraction",
                        &format!("index {index}: {e}"),
                    )
                    .await?;
                    self.rescroll().await;
                }
            }
        }
    }

    async fn try_fields(
        &self,
        index: usize,
        page_url: &Url,
        description: &str,
    ) -> SessionResult<Option<JobPosting>> {
        let source = self.session.page_source().await?;
        let snapshot = self.parser.snapshot(&source);

        // The DOM may have shifted since the listing was satisfied; index
        // alignment must hold in the fresh parse before any field is used.
        let Some(item) = snapshot.item(index) else {
            return Ok(None);
        };

        let link = item
            .link_href
            .as_deref()
            .map(|href| absolute_link(href, page_url));
        let id = item
            .link_href
            .as_deref()
            .and_then(external_id_from_link)
            .or_else(|| item.item_id.clone());

        let draft = PostingDraft {
            title: item.link_text.clone(),
            company: item.company.clone(),
            location: item.location.clone(),
            link,
            id,
            description: Some(description.to_owned()),
        };

        Ok(draft.build())
    }

    /// Scroll sweep plus settle, between attempts. A failure here is
    /// irrelevant on its own; the next attempt will surface anything real.
    async fn rescroll(&self) {
        if let Err(e) = scroll_sweep(self.session, self.profile).await {
            debug!("Rescroll failed: {}", e);
        }
        self.pace().await;
    }

    async fn pace(&self) {
        if self.timing.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.timing.settle_ms)).await;
        }
    }
}
