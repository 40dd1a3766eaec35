//! Scripted browsing session for integration tests.
//!
//! Simulates a lazily-rendered listing: items enter the DOM as the list is
//! scrolled, probes and re-parses can be scripted to fail a fixed number of
//! times, and the detail pane opens on click.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use job_harvester::domain::query::SearchQuery;
use job_harvester::infrastructure::config::SiteProfile;
use job_harvester::infrastructure::session::{
    BrowsingSession, LiveItemProbe, SessionError, SessionResult,
};

pub const QUERY_URL: &str = "https://jobs.example.com/jobs/search/?keywords=rust%20engineer&geoId=91000000&f_WT=2&location=European%20Union";

pub fn query() -> SearchQuery {
    SearchQuery::parse(QUERY_URL).unwrap()
}

#[derive(Debug, Clone)]
pub struct FakeJob {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
}

impl FakeJob {
    pub fn numbered(n: usize) -> Self {
        Self {
            id: n.to_string(),
            title: format!("Rust Engineer {n}"),
            company: format!("Company {n}"),
            location: "Remote".to_owned(),
        }
    }

    fn html(&self, blank_company: bool) -> String {
        let company = if blank_company { "" } else { &self.company };
        format!(
            r#"<li class="jobs-search-results__list-item" data-occludable-job-id="{id}">
                 <a class="job-card-container__link" href="/jobs/view/{id}/">{title}</a>
                 <span class="job-card-container__primary-description">{company}</span>
                 <ul><li class="job-card-container__metadata-item">{location}</li></ul>
               </li>"#,
            id = self.id,
            title = self.title,
            location = self.location,
        )
    }
}

/// Full listing markup for `jobs`, matching the default site profile.
pub fn listing_html(jobs: &[FakeJob]) -> String {
    let items = jobs.iter().map(|job| job.html(false)).collect::<String>();
    format!("<html><body><ul>{items}</ul></body></html>")
}

#[derive(Debug, Default)]
struct State {
    revealed: usize,
    scroll_calls: u32,
    detail_open: Option<usize>,
    source_calls: u32,
    probe_failures: u32,
    blank_company_reads: u32,
    nav_failures: u32,
    last_url: Option<String>,
}

pub struct ScriptedSession {
    jobs: Vec<FakeJob>,
    profile: SiteProfile,
    /// Scroll calls needed to reveal each additional item.
    reveal_every: u32,
    state: Mutex<State>,
}

impl ScriptedSession {
    pub fn new(jobs: Vec<FakeJob>) -> Self {
        Self {
            jobs,
            profile: SiteProfile::default(),
            reveal_every: 30,
            state: Mutex::new(State::default()),
        }
    }

    /// Start with every item already in the DOM.
    pub fn fully_rendered(jobs: Vec<FakeJob>) -> Self {
        let session = Self::new(jobs);
        session.state.lock().unwrap().revealed = session.jobs.len();
        session
    }

    /// Fail the next `n` live-item probes with a not-found error.
    pub fn with_probe_failures(self, n: u32) -> Self {
        self.state.lock().unwrap().probe_failures = n;
        self
    }

    /// Render every company blank in the next `n` page-source reads.
    pub fn with_blank_company_reads(self, n: u32) -> Self {
        self.state.lock().unwrap().blank_company_reads = n;
        self
    }

    /// Fail the next `n` navigations with a driver-level error.
    pub fn with_nav_failures(self, n: u32) -> Self {
        self.state.lock().unwrap().nav_failures = n;
        self
    }

    pub fn source_calls(&self) -> u32 {
        self.state.lock().unwrap().source_calls
    }

    pub fn last_url(&self) -> Option<String> {
        self.state.lock().unwrap().last_url.clone()
    }

    fn render(&self, state: &State) -> String {
        let blank = state.blank_company_reads > 0;
        let items = self.jobs[..state.revealed]
            .iter()
            .map(|job| job.html(blank))
            .collect::<String>();
        format!("<html><body><ul>{items}</ul></body></html>")
    }
}

#[async_trait]
impl BrowsingSession for ScriptedSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.nav_failures > 0 {
            state.nav_failures -= 1;
            return Err(SessionError::Navigation {
                url: url.to_owned(),
                message: "connection refused".to_owned(),
            });
        }
        state.last_url = Some(url.to_owned());
        state.detail_open = None;
        Ok(())
    }

    async fn page_source(&self) -> SessionResult<String> {
        let mut state = self.state.lock().unwrap();
        state.source_calls += 1;
        let source = self.render(&state);
        if state.blank_company_reads > 0 {
            state.blank_company_reads -= 1;
        }
        Ok(source)
    }

    async fn scroll_within(&self, _container: &str, _offset: u32) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        state.scroll_calls += 1;
        let reachable = (state.scroll_calls / self.reveal_every) as usize;
        state.revealed = reachable.min(self.jobs.len()).max(state.revealed);
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> SessionResult<()> {
        if selector == self.profile.detail_description {
            let state = self.state.lock().unwrap();
            return if state.detail_open.is_some() {
                Ok(())
            } else {
                Err(SessionError::wait_timeout(selector, timeout))
            };
        }
        Ok(())
    }

    async fn count_items(&self, _profile: &SiteProfile) -> SessionResult<usize> {
        Ok(self.state.lock().unwrap().revealed)
    }

    async fn probe_item(
        &self,
        profile: &SiteProfile,
        index: usize,
    ) -> SessionResult<Option<LiveItemProbe>> {
        let mut state = self.state.lock().unwrap();
        if state.probe_failures > 0 {
            state.probe_failures -= 1;
            return Err(SessionError::not_found(&profile.item_link));
        }

        Ok(self.jobs[..state.revealed].get(index).map(|job| LiveItemProbe {
            link_text: Some(job.title.clone()),
            company: Some(job.company.clone()),
            location: Some(job.location.clone()),
            link_href: Some(format!("/jobs/view/{}/", job.id)),
            item_id: Some(job.id.clone()),
        }))
    }

    async fn click_item_link(&self, profile: &SiteProfile, index: usize) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        if index >= state.revealed {
            return Err(SessionError::not_found(&profile.item_link));
        }
        state.detail_open = Some(index);
        Ok(())
    }

    async fn read_text(&self, selector: &str) -> SessionResult<String> {
        let state = self.state.lock().unwrap();

        if selector == self.profile.result_count_caption {
            return Ok(format!("{} results", self.jobs.len()));
        }
        if selector == self.profile.detail_description {
            return match state.detail_open {
                Some(index) => Ok(format!("{} builds reliable systems.", self.jobs[index].title)),
                None => Err(SessionError::not_found(selector)),
            };
        }
        Err(SessionError::not_found(selector))
    }
}
