//! job-harvester: a supervised WebDriver crawler for paginated,
//! lazily-rendered job-listing sites.
//!
//! `domain` holds the records and the pure rules (pagination, query URLs,
//! load completeness). `infrastructure` holds the browsing-session capability
//! and persistence. `crawling` drives the scroll/extract loop with
//! operator-supervised retries.

pub mod crawling;
pub mod domain;
pub mod infrastructure;

pub use crawling::{
    ConsoleSupervisor, CrawlError, CrawlRun, IncrementalScrollLoader, RecordExtractor,
    RunSummary, SupervisionPolicy,
};
pub use domain::{JobPosting, PaginationPlanner, SearchQuery};
pub use infrastructure::{
    AppConfig, BrowsingSession, ListingParser, OutputFormat, RecordSink, SessionError,
    SiteProfile, WebDriverSession,
};
