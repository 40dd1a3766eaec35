//! Search query URLs and the listing-page URL contract.
//!
//! A run is driven by caller-supplied search URLs. The crawler only ever
//! rewrites the `start` offset parameter; everything else on the URL is
//! preserved untouched so site-specific filters keep working.

use std::fmt;

use thiserror::Error;
use url::Url;

/// Parameters every search URL must carry before a browsing session is
/// opened. Checked up front; a miss is a configuration error, not a crawl
/// failure.
pub const REQUIRED_PARAMS: [&str; 4] = ["keywords", "geoId", "f_WT", "location"];

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid search URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("search URL is missing required parameters: {}", missing.join(", "))]
    MissingParams { missing: Vec<String> },
}

/// Workplace-type filter codes used by the `f_WT` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkplaceType {
    OnSite,
    Remote,
    Hybrid,
}

impl WorkplaceType {
    pub fn code(self) -> u8 {
        match self {
            Self::OnSite => 1,
            Self::Remote => 2,
            Self::Hybrid => 3,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(Self::OnSite),
            "2" => Some(Self::Remote),
            "3" => Some(Self::Hybrid),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OnSite => "onsite",
            Self::Remote => "remote",
            Self::Hybrid => "hybrid",
        }
    }

    /// `f_WT` accepts several codes joined with commas.
    pub fn param_value(types: &[WorkplaceType]) -> String {
        types
            .iter()
            .map(|t| t.code().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for WorkplaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Experience-level filter codes used by the `f_E` parameter (comma-joinable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceLevel {
    Internship,
    EntryLevel,
    Associate,
    MidSenior,
    Director,
    Executive,
}

impl ExperienceLevel {
    pub fn code(self) -> u8 {
        match self {
            Self::Internship => 1,
            Self::EntryLevel => 2,
            Self::Associate => 3,
            Self::MidSenior => 4,
            Self::Director => 5,
            Self::Executive => 6,
        }
    }

    pub fn param_value(levels: &[ExperienceLevel]) -> String {
        levels
            .iter()
            .map(|l| l.code().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A validated search URL plus the page-offset rewrite rule.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    url: Url,
}

impl SearchQuery {
    /// Parse a search URL. Requires an absolute http(s) URL with a host;
    /// parameter completeness is checked separately by [`Self::validate`].
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let url = Url::parse(raw).map_err(|e| QueryError::InvalidUrl {
            input: raw.to_owned(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(QueryError::InvalidUrl {
                input: raw.to_owned(),
                reason: "expected an absolute http(s) URL".to_owned(),
            });
        }

        Ok(Self { url })
    }

    /// Check that every required site parameter is present.
    pub fn validate(&self) -> Result<(), QueryError> {
        let missing: Vec<String> = REQUIRED_PARAMS
            .iter()
            .filter(|name| self.param(name).is_none())
            .map(|name| (*name).to_owned())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(QueryError::MissingParams { missing })
        }
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// First value of a query parameter, if present.
    pub fn param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// URL for a 1-based page number: `start = (page - 1) * page_size`.
    pub fn url_for_page(&self, page: u32, page_size: u32) -> Url {
        self.url_with_start((page - 1) * page_size)
    }

    /// Rewrite only the `start` parameter, preserving every other parameter
    /// and never duplicating `start`.
    pub fn url_with_start(&self, start: u32) -> Url {
        let mut url = self.url.clone();
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "start")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (k, v) in &retained {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("start", &start.to_string());
        }

        url
    }

    /// Deterministic output-file stem built from the query parameters:
    /// keywords, location and workplace-type labels joined with underscores,
    /// reduced to filesystem-safe characters.
    pub fn file_stem(&self) -> String {
        let keywords = self.param("keywords").unwrap_or_else(|| "jobs".to_owned());
        let location = self.param("location").unwrap_or_default();

        let workplace = self
            .param("f_WT")
            .map(|raw| {
                raw.split(',')
                    .filter_map(WorkplaceType::from_code)
                    .map(WorkplaceType::label)
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .unwrap_or_default();

        let stem = [keywords, location, workplace]
            .iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("_");

        sanitize_stem(&stem)
    }
}

fn sanitize_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "https://www.example.com/jobs/search/?f_WT=2&geoId=91000000&keywords=hr%20manager&location=European%20Union";

    #[test]
    fn test_parse_rejects_relative_and_nonhttp() {
        assert!(SearchQuery::parse("jobs/search?keywords=x").is_err());
        assert!(SearchQuery::parse("ftp://example.com/jobs").is_err());
    }

    #[test]
    fn test_validate_reports_missing_params() {
        let query = SearchQuery::parse("https://example.com/jobs/search/?keywords=x").unwrap();
        let err = query.validate().unwrap_err();
        match err {
            QueryError::MissingParams { missing } => {
                assert!(missing.contains(&"geoId".to_string()));
                assert!(missing.contains(&"f_WT".to_string()));
                assert!(missing.contains(&"location".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_accepts_complete_url() {
        let query = SearchQuery::parse(FULL).unwrap();
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_start_rewrite_preserves_other_params() {
        let query = SearchQuery::parse(
            "https://example.com/jobs/search/?keywords=X&geoId=Y&extra=Z&start=50",
        )
        .unwrap();

        // Page 4 at 25 per page sits at offset 75.
        let url = query.url_for_page(4, 25);
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("extra".to_string(), "Z".to_string())));
        assert!(pairs.contains(&("start".to_string(), "75".to_string())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "start").count(), 1);
        assert!(pairs.contains(&("keywords".to_string(), "X".to_string())));
    }

    #[test]
    fn test_workplace_param_value_joins_codes() {
        assert_eq!(
            WorkplaceType::param_value(&[WorkplaceType::Remote, WorkplaceType::Hybrid]),
            "2,3"
        );
    }

    #[test]
    fn test_file_stem_is_deterministic_and_safe() {
        let query = SearchQuery::parse(FULL).unwrap();
        assert_eq!(query.file_stem(), "hr_manager_European_Union_remote");
    }
}
