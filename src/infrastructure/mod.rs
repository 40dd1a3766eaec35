//! Infrastructure: configuration, logging, the browsing-session capability
//! and its WebDriver implementation, snapshot parsing, and persistence.

pub mod config;
pub mod logging;
pub mod parsing;
pub mod repository;
pub mod session;
pub mod sink;
pub mod webdriver_session;

pub use config::{AppConfig, ScrapingConfig, SiteProfile, TimingConfig};
pub use parsing::{ListingParser, ListingSnapshot, ParseError, SnapshotItem};
pub use repository::JobRepository;
pub use session::{BrowsingSession, LiveItemProbe, SessionError, SessionResult};
pub use sink::{OutputFormat, RecordSink, SinkError};
pub use webdriver_session::WebDriverSession;
