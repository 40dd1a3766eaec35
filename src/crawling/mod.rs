//! The crawl engine: supervised scroll loading, record extraction and run
//! orchestration over one browsing session.

pub mod extractor;
pub mod loader;
pub mod run;
pub mod supervision;

use thiserror::Error;

use crate::infrastructure::parsing::ParseError;
use crate::infrastructure::session::SessionError;
use crate::infrastructure::sink::SinkError;

#[derive(Error, Debug)]
pub enum CrawlError {
    /// The operator declined to resume at an escalation prompt.
    #[error("operator aborted the run during {operation}")]
    Aborted { operation: String },

    /// The listing structure never appeared; the page cannot be crawled.
    #[error("listing structure did not appear: {selector}")]
    PageStructure { selector: String },

    /// Driver-level connectivity failure that survived its retry budget.
    #[error("navigation failed after {attempts} attempts: {message}")]
    Network { attempts: u32, message: String },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

pub use extractor::RecordExtractor;
pub use loader::{IncrementalScrollLoader, ReadyListing, listing_satisfied};
pub use run::{CrawlRun, RunSummary};
pub use supervision::{
    ConsoleSupervisor, Incident, Intervention, RetryBudget, SupervisionPolicy,
};
