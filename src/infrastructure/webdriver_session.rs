//! WebDriver-backed implementation of the browsing-session capability.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use tracing::{debug, info};

use crate::infrastructure::config::SiteProfile;
use crate::infrastructure::session::{
    BrowsingSession, LiveItemProbe, SessionError, SessionResult,
};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One live WebDriver session. Owned exclusively by the crawl loop for the
/// duration of a run.
pub struct WebDriverSession {
    driver: WebDriver,
}

impl WebDriverSession {
    /// Connect to a WebDriver endpoint (e.g. chromedriver on
    /// `http://localhost:9515`) and open a browser window.
    pub async fn connect(server_url: &str, headless: bool) -> SessionResult<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if headless {
            caps.set_headless().map_err(to_driver_error)?;
        }

        let driver = WebDriver::new(server_url, caps)
            .await
            .map_err(|e| SessionError::driver(format!("connect to {server_url}: {e}")))?;

        info!("WebDriver session established at {}", server_url);
        Ok(Self { driver })
    }

    /// End the session and close the browser window.
    pub async fn close(self) -> SessionResult<()> {
        self.driver.quit().await.map_err(to_driver_error)
    }

    async fn item_elements(&self, profile: &SiteProfile) -> SessionResult<Vec<WebElement>> {
        self.driver
            .find_all(By::Css(profile.list_item.as_str()))
            .await
            .map_err(|e| classify(e, &profile.list_item, None))
    }

    /// Child text, with a missing child reported as `None` rather than an
    /// error; the completeness check owns that judgement.
    async fn child_text(
        &self,
        parent: &WebElement,
        selector: &str,
        index: usize,
    ) -> SessionResult<Option<String>> {
        match parent.find(By::Css(selector)).await {
            Ok(el) => match el.text().await {
                Ok(text) => Ok(Some(text)),
                Err(WebDriverError::StaleElementReference(_)) => {
                    Err(SessionError::Stale { index })
                }
                Err(e) => Err(to_driver_error(e)),
            },
            Err(WebDriverError::NoSuchElement(_)) => Ok(None),
            Err(WebDriverError::StaleElementReference(_)) => Err(SessionError::Stale { index }),
            Err(e) => Err(to_driver_error(e)),
        }
    }

    async fn child_attr(
        &self,
        parent: &WebElement,
        selector: &str,
        attr: &str,
        index: usize,
    ) -> SessionResult<Option<String>> {
        match parent.find(By::Css(selector)).await {
            Ok(el) => match el.attr(attr).await {
                Ok(value) => Ok(value),
                Err(WebDriverError::StaleElementReference(_)) => {
                    Err(SessionError::Stale { index })
                }
                Err(e) => Err(to_driver_error(e)),
            },
            Err(WebDriverError::NoSuchElement(_)) => Ok(None),
            Err(WebDriverError::StaleElementReference(_)) => Err(SessionError::Stale { index }),
            Err(e) => Err(to_driver_error(e)),
        }
    }
}

#[async_trait]
impl BrowsingSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        debug!("Navigating to {}", url);
        self.driver
            .goto(url)
            .await
            .map_err(|e| SessionError::Navigation {
                url: url.to_owned(),
                message: e.to_string(),
            })
    }

    async fn page_source(&self) -> SessionResult<String> {
        self.driver.source().await.map_err(to_driver_error)
    }

    async fn scroll_within(&self, container: &str, offset: u32) -> SessionResult<()> {
        let element = self
            .driver
            .find(By::Css(container))
            .await
            .map_err(|e| classify(e, container, None))?;
        let handle = element.to_json().map_err(to_driver_error)?;

        self.driver
            .execute(
                "arguments[0].scrollTo(0, arguments[1]);",
                vec![handle, json!(offset)],
            )
            .await
            .map_err(to_driver_error)?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> SessionResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.driver.find(By::Css(selector)).await {
                Ok(_) => return Ok(()),
                Err(WebDriverError::NoSuchElement(_)) => {}
                Err(e) => return Err(to_driver_error(e)),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(SessionError::wait_timeout(selector, timeout));
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn count_items(&self, profile: &SiteProfile) -> SessionResult<usize> {
        Ok(self.item_elements(profile).await?.len())
    }

    async fn probe_item(
        &self,
        profile: &SiteProfile,
        index: usize,
    ) -> SessionResult<Option<LiveItemProbe>> {
        let items = self.item_elements(profile).await?;
        let Some(item) = items.get(index) else {
            return Ok(None);
        };

        let item_id = match item.attr(&profile.item_id_attr).await {
            Ok(value) => value,
            Err(WebDriverError::StaleElementReference(_)) => {
                return Err(SessionError::Stale { index });
            }
            Err(e) => return Err(to_driver_error(e)),
        };

        Ok(Some(LiveItemProbe {
            link_text: self.child_text(item, &profile.item_link, index).await?,
            company: self.child_text(item, &profile.item_company, index).await?,
            location: self.child_text(item, &profile.item_location, index).await?,
            link_href: self
                .child_attr(item, &profile.item_link, "href", index)
                .await?,
            item_id,
        }))
    }

    async fn click_item_link(&self, profile: &SiteProfile, index: usize) -> SessionResult<()> {
        let items = self.item_elements(profile).await?;
        let item = items
            .get(index)
            .ok_or_else(|| SessionError::not_found(&profile.list_item))?;

        let link = item
            .find(By::Css(profile.item_link.as_str()))
            .await
            .map_err(|e| classify(e, &profile.item_link, Some(index)))?;

        link.click()
            .await
            .map_err(|e| classify(e, &profile.item_link, Some(index)))
    }

    async fn read_text(&self, selector: &str) -> SessionResult<String> {
        let element = self
            .driver
            .find(By::Css(selector))
            .await
            .map_err(|e| classify(e, selector, None))?;
        let text = element.text().await.map_err(to_driver_error)?;
        Ok(text.trim().to_owned())
    }
}

fn classify(error: WebDriverError, selector: &str, index: Option<usize>) -> SessionError {
    match error {
        WebDriverError::NoSuchElement(_) => SessionError::not_found(selector),
        WebDriverError::StaleElementReference(_) => SessionError::Stale {
            index: index.unwrap_or_default(),
        },
        other => to_driver_error(other),
    }
}

fn to_driver_error(error: WebDriverError) -> SessionError {
    SessionError::driver(error.to_string())
}
