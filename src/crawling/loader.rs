//! Incremental scroll-and-check loading of one listing page.
//!
//! Listing pages render their items lazily while the result list is scrolled.
//! The loader alternates between a bounded scroll sweep and a completeness
//! check over both representations of the list (live DOM and parsed
//! snapshot), until the page holds the expected number of items and the last
//! item is fully rendered in both. There is no hard cap on attempts: past the
//! retry ceiling the loop blocks on the operator instead of failing, and
//! resumes with a fresh budget.

use std::time::Duration;

use tracing::{debug, info};

use super::CrawlError;
use super::supervision::{RetryBudget, SupervisionPolicy, absorb_failure};
use crate::domain::listing::is_fully_loaded;
use crate::infrastructure::config::{SiteProfile, TimingConfig};
use crate::infrastructure::parsing::{ListingParser, ListingSnapshot};
use crate::infrastructure::session::{BrowsingSession, LiveItemProbe, SessionResult};

const OPERATION: &str = "listing load";

/// One bounded, monotone scroll sweep through the result container.
pub(crate) async fn scroll_sweep(
    session: &dyn BrowsingSession,
    profile: &SiteProfile,
) -> SessionResult<()> {
    let mut offset = profile.scroll_start;
    while offset <= profile.scroll_end {
        session
            .scroll_within(&profile.results_container, offset)
            .await?;
        offset += profile.scroll_step;
    }
    Ok(())
}

/// A listing page that satisfied the completeness check: the snapshot both
/// representations agreed on, plus the live item count at that instant.
#[derive(Debug)]
pub struct ReadyListing {
    pub snapshot: ListingSnapshot,
    pub live_count: usize,
}

/// Outcome of one completeness check.
#[derive(Debug)]
pub enum CheckOutcome {
    Satisfied(ReadyListing),
    Incomplete { live: usize, parsed: usize },
}

/// The satisfaction predicate. Only the last item is checked for
/// completeness; items render top to bottom, so a complete tail implies a
/// complete list. Pure in its inputs: an unchanged page keeps satisfying.
pub fn listing_satisfied(
    expected: u32,
    live_count: usize,
    live_last: Option<&LiveItemProbe>,
    snapshot: &ListingSnapshot,
) -> bool {
    let expected = expected as usize;

    live_count >= expected
        && snapshot.len() >= expected
        && live_last.is_some_and(is_fully_loaded)
        && snapshot.last().is_some_and(is_fully_loaded)
}

enum Phase {
    Scrolling,
    Checking,
}

pub struct IncrementalScrollLoader<'a> {
    session: &'a dyn BrowsingSession,
    parser: &'a ListingParser,
    profile: &'a SiteProfile,
    timing: &'a TimingConfig,
    supervisor: &'a dyn SupervisionPolicy,
    retry_ceiling: u32,
}

impl<'a> IncrementalScrollLoader<'a> {
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

    /// Drive the page until it satisfies `expected` items. Returns the
    /// matched snapshot; errors only when the operator aborts.
    pub async fn load(&self, expected: u32) -> Result<ReadyListing, CrawlError> {
        let mut budget = RetryBudget::new(self.retry_ceiling);
        let mut phase = Phase::Scrolling;

        loop {
            match phase {
                Phase::Scrolling => {
                    if let Err(e) = self.sweep().await {
                        absorb_failure(&mut budget, self.supervisor, OPERATION, &e.to_string())
                            .await?;
                        continue;
                    }
                    self.settle().await;
                    phase = Phase::Checking;
                }
                Phase::Checking => match self.check(expected).await {
                    Ok(CheckOutcome::Satisfied(ready)) => {
                        info!(
                            "Listing satisfied with {} items ({} expected)",
                            ready.snapshot.len(),
                            expected
                        );
                        return Ok(ready);
                    }
                    Ok(CheckOutcome::Incomplete { live, parsed }) => {
                        absorb_failure(
                            &mut budget,
                            self.supervisor,
                            OPERATION,
                            &format!("page holds {live} live / {parsed} parsed of {expected} expected items"),
                        )
                        .await?;
                        phase = Phase::Scrolling;
                    }
                    Err(e) => {
                        absorb_failure(&mut budget, self.supervisor, OPERATION, &e.to_string())
                            .await?;
                        phase = Phase::Scrolling;
                    }
                },
            }
        }
    }

    /// One completeness check over both representations. Read-only: checking
    /// an unchanged, satisfied page reports satisfied again.
    pub async fn check(&self, expected: u32) -> SessionResult<CheckOutcome> {
        let live_count = self.session.count_items(self.profile).await?;
        let source = self.session.page_source().await?;
        let snapshot = self.parser.snapshot(&source);

        // Only probe the live tail once both counts are in range.
        let live_last = if live_count >= expected as usize && live_count > 0 {
            self.session
                .probe_item(self.profile, live_count - 1)
                .await?
        } else {
            None
        };

        if listing_satisfied(expected, live_count, live_last.as_ref(), &snapshot) {
            Ok(CheckOutcome::Satisfied(ReadyListing {
                snapshot,
                live_count,
            }))
        } else {
            debug!(
                "Listing incomplete: {} live / {} parsed of {} expected",
                live_count,
                snapshot.len(),
                expected
            );
            Ok(CheckOutcome::Incomplete {
                live: live_count,
                parsed: snapshot.len(),
            })
        }
    }

    async fn sweep(&self) -> SessionResult<()> {
        scroll_sweep(self.session, self.profile).await
    }

    async fn settle(&self) {
        if self.timing.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.timing.settle_ms)).await;
        }
    }
}
