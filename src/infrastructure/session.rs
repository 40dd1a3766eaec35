//! Browsing-session capability interface.
//!
//! The crawler drives one live, stateful browser session through this trait:
//! navigation, scrolling, bounded waits, clicks and element reads. The
//! production implementation sits on a WebDriver
//! ([`crate::infrastructure::webdriver_session::WebDriverSession`]); tests
//! substitute scripted sessions.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::listing::{FieldSource, ListingField};
use crate::infrastructure::config::SiteProfile;

#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("element not found: {selector}")]
    NotFound { selector: String },

    #[error("timed out after {waited_ms}ms waiting for {selector}")]
    WaitTimeout { selector: String, waited_ms: u64 },

    #[error("stale element reference at list index {index}")]
    Stale { index: usize },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("driver failure: {message}")]
    Driver { message: String },
}

impl SessionError {
    pub fn not_found(selector: &str) -> Self {
        Self::NotFound {
            selector: selector.to_owned(),
        }
    }

    pub fn wait_timeout(selector: &str, waited: Duration) -> Self {
        Self::WaitTimeout {
            selector: selector.to_owned(),
            waited_ms: waited.as_millis() as u64,
        }
    }

    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Transient conditions that the retry/escalation policy absorbs.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::WaitTimeout { .. } | Self::Stale { .. }
        )
    }

    /// Driver-level connectivity failures; retried with fixed backoff and
    /// then terminal for the run.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Navigation { .. })
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Eagerly captured field values of one live list item.
///
/// Captured fresh from the driver on every probe so stale handles never leak
/// past a single attempt; implements [`FieldSource`] for the completeness
/// check.
#[derive(Debug, Clone, Default)]
pub struct LiveItemProbe {
    pub link_text: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub link_href: Option<String>,
    /// Site-assigned id attribute of the item element, when present.
    pub item_id: Option<String>,
}

impl FieldSource for LiveItemProbe {
    fn field_text(&self, field: ListingField) -> Option<String> {
        match field {
            ListingField::Link => self.link_text.clone(),
            ListingField::Company => self.company.clone(),
            ListingField::Location => self.location.clone(),
        }
    }

    fn field_attr(&self, field: ListingField, attr: &str) -> Option<String> {
        match (field, attr) {
            (ListingField::Link, "href") => self.link_href.clone(),
            _ => None,
        }
    }
}

/// Capability interface over the live browser session.
///
/// Implementations are exclusively owned by the crawl loop; all access is
/// strictly sequential.
#[async_trait]
pub trait BrowsingSession: Send + Sync {
    /// Navigate the session to `url`.
    async fn navigate(&self, url: &str) -> SessionResult<()>;

    /// Full markup of the current page.
    async fn page_source(&self) -> SessionResult<String>;

    /// Scroll the container matched by `container` to the vertical `offset`.
    async fn scroll_within(&self, container: &str, offset: u32) -> SessionResult<()>;

    /// Block until `selector` is present, up to `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> SessionResult<()>;

    /// Number of list items currently in the live DOM.
    async fn count_items(&self, profile: &SiteProfile) -> SessionResult<usize>;

    /// Read the fields of the list item at `index` from the live DOM,
    /// re-locating the element fresh. `Ok(None)` when the index is not
    /// currently in the DOM; missing child fields are `None` in the probe.
    async fn probe_item(&self, profile: &SiteProfile, index: usize)
    -> SessionResult<Option<LiveItemProbe>>;

    /// Click the detail link of the list item at `index`.
    async fn click_item_link(&self, profile: &SiteProfile, index: usize) -> SessionResult<()>;

    /// Trimmed text of the first element matched by `selector`.
    async fn read_text(&self, selector: &str) -> SessionResult<String>;
}
