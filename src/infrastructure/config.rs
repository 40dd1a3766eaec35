//! Configuration infrastructure.
//!
//! Two value objects cover the whole crawler:
//! - [`SiteProfile`]: every selector and site constant for one target site,
//!   passed into the session and extractor constructors. One instance per
//!   site; nothing selector-shaped lives in module globals.
//! - [`AppConfig`]: run behavior (timing, retry ceilings, output), loadable
//!   from a JSON file next to the binary.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

/// Selector bundle and site constants for one listing site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Scrollable container holding the result list.
    pub results_container: String,
    /// One listing item.
    pub list_item: String,
    /// Detail link inside an item; its text is the posting title.
    pub item_link: String,
    /// Company name inside an item.
    pub item_company: String,
    /// Location line inside an item.
    pub item_location: String,
    /// Description region of the opened detail pane.
    pub detail_description: String,
    /// Marker that renders once the result list has reached its end.
    pub end_of_results: String,
    /// Caption carrying the total result count.
    pub result_count_caption: String,
    /// Item attribute carrying the site-assigned posting id, if any.
    pub item_id_attr: String,

    /// Results per listing page.
    pub page_size: u32,
    /// Scroll sweep: first offset in pixels.
    pub scroll_start: u32,
    /// Scroll sweep: last offset in pixels.
    pub scroll_end: u32,
    /// Scroll sweep: step between offsets.
    pub scroll_step: u32,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            results_container: ".jobs-search-results-list".to_owned(),
            list_item: "li.jobs-search-results__list-item".to_owned(),
            item_link: "a.job-card-container__link".to_owned(),
            item_company: ".job-card-container__primary-description".to_owned(),
            item_location: "li.job-card-container__metadata-item".to_owned(),
            detail_description: ".jobs-description-content__text".to_owned(),
            end_of_results: ".global-footer-compact".to_owned(),
            result_count_caption: ".jobs-search-results-list__subtitle".to_owned(),
            item_id_attr: "data-occludable-job-id".to_owned(),
            page_size: defaults::PAGE_SIZE,
            scroll_start: defaults::SCROLL_START,
            scroll_end: defaults::SCROLL_END,
            scroll_step: defaults::SCROLL_STEP,
        }
    }
}

/// Wait and pacing configuration. Zeroed wholesale in tests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Settle delay after a scroll sweep, in milliseconds.
    pub settle_ms: u64,
    /// Bounded wait for the detail pane to render.
    pub detail_wait_ms: u64,
    /// Bounded wait for the listing structure after navigation.
    pub structure_wait_ms: u64,
    /// Pause between listing pages.
    pub page_delay_ms: u64,
    /// Fixed backoff between navigation retries.
    pub navigation_backoff_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: defaults::SETTLE_MS,
            detail_wait_ms: defaults::DETAIL_WAIT_MS,
            structure_wait_ms: defaults::STRUCTURE_WAIT_MS,
            page_delay_ms: defaults::PAGE_DELAY_MS,
            navigation_backoff_ms: defaults::NAVIGATION_BACKOFF_MS,
        }
    }
}

impl TimingConfig {
    /// All waits collapsed to zero; used by tests driving scripted sessions.
    pub fn immediate() -> Self {
        Self {
            settle_ms: 0,
            detail_wait_ms: 0,
            structure_wait_ms: 0,
            page_delay_ms: 0,
            navigation_backoff_ms: 0,
        }
    }
}

/// Crawl behavior settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Consecutive failures of one operation kind before the operator is
    /// asked to intervene.
    pub retry_ceiling: u32,
    /// Navigation attempts before a network failure is considered terminal.
    pub navigation_attempts: u32,
    /// Attempts to find the listing structure before the page is skipped.
    pub structure_attempts: u32,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            retry_ceiling: defaults::RETRY_CEILING,
            navigation_attempts: defaults::NAVIGATION_ATTEMPTS,
            structure_attempts: defaults::STRUCTURE_ATTEMPTS,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub site: SiteProfile,
    pub timing: TimingConfig,
    pub scraping: ScrapingConfig,
}

impl AppConfig {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            info!("No config file at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as pretty JSON, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }

        let raw = serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(path, raw)
            .await
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }
}

/// Default values for crawl behavior.
pub mod defaults {
    /// Results per listing page (site convention).
    pub const PAGE_SIZE: u32 = 25;

    /// Scroll sweep bounds and step, in pixels.
    pub const SCROLL_START: u32 = 300;
    pub const SCROLL_END: u32 = 6000;
    pub const SCROLL_STEP: u32 = 100;

    /// Settle delay after scrolling before re-checking the list.
    pub const SETTLE_MS: u64 = 1500;

    /// Bounded wait for the detail pane.
    pub const DETAIL_WAIT_MS: u64 = 10_000;

    /// Bounded wait for the listing structure after navigation.
    pub const STRUCTURE_WAIT_MS: u64 = 30_000;

    /// Pause between listing pages.
    pub const PAGE_DELAY_MS: u64 = 5000;

    /// Fixed backoff between navigation retries.
    pub const NAVIGATION_BACKOFF_MS: u64 = 5000;

    /// Consecutive failures before operator escalation.
    pub const RETRY_CEILING: u32 = 5;

    /// Navigation attempts before giving up the run.
    pub const NAVIGATION_ATTEMPTS: u32 = 3;

    /// Structure-wait attempts before skipping a page.
    pub const STRUCTURE_ATTEMPTS: u32 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_has_positive_scroll_sweep() {
        let profile = SiteProfile::default();
        assert!(profile.scroll_start < profile.scroll_end);
        assert!(profile.scroll_step > 0);
        assert_eq!(profile.page_size, 25);
    }

    #[tokio::test]
    async fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.scraping.retry_ceiling = 7;
        config.save(&path).await.unwrap();

        let loaded = AppConfig::load(&path).await.unwrap();
        assert_eq!(loaded.scraping.retry_ceiling, 7);
    }

    #[tokio::test]
    async fn test_missing_config_falls_back_to_defaults() {
        let loaded = AppConfig::load(Path::new("/nonexistent/config.json"))
            .await
            .unwrap();
        assert_eq!(loaded.scraping.retry_ceiling, defaults::RETRY_CEILING);
    }
}
