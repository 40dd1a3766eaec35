//! Job posting records extracted from listing pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A fully resolved job posting. Constructed only once every field has been
/// extracted; partially resolved postings never reach the output sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    /// Absolute URL of the detail page.
    pub link: String,
    /// Site-assigned posting id, taken from the detail URL path.
    pub id: String,
    pub description: String,
    #[serde(rename = "capturedAt")]
    pub captured_at: DateTime<Utc>,
}

/// Field set gathered during extraction. Converts into a [`JobPosting`] only
/// when every field is present and non-empty.
#[derive(Debug, Default, Clone)]
pub struct PostingDraft {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub link: Option<String>,
    pub id: Option<String>,
    pub description: Option<String>,
}

impl PostingDraft {
    /// Finalize the draft. Returns `None` while any field is missing or blank.
    pub fn build(self) -> Option<JobPosting> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Some(JobPosting {
            title: non_blank(self.title)?,
            company: non_blank(self.company)?,
            location: non_blank(self.location)?,
            link: non_blank(self.link)?,
            id: non_blank(self.id)?,
            description: non_blank(self.description)?,
            captured_at: Utc::now(),
        })
    }
}

/// Parse the site-assigned posting id out of a detail URL.
///
/// Detail links follow the fixed positional convention `/view/{id}/`; the
/// segment after `view` is the id. Relative links are accepted.
pub fn external_id_from_link(link: &str) -> Option<String> {
    let path = match Url::parse(link) {
        Ok(url) => url.path().to_owned(),
        // Relative link: strip any query/fragment and use the path as-is.
        Err(_) => link
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_owned(),
    };

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    segments
        .by_ref()
        .find(|s| *s == "view")
        .and_then(|_| segments.next())
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

/// Resolve a possibly relative detail link against the page the item was
/// found on.
pub fn absolute_link(href: &str, base: &Url) -> String {
    match Url::parse(href) {
        Ok(url) => url.to_string(),
        Err(_) => base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_id_from_absolute_link() {
        assert_eq!(
            external_id_from_link("https://example.com/jobs/view/3771997716/?refId=abc"),
            Some("3771997716".to_string())
        );
    }

    #[test]
    fn test_external_id_from_relative_link() {
        assert_eq!(
            external_id_from_link("/jobs/view/123456/?tracking=x"),
            Some("123456".to_string())
        );
    }

    #[test]
    fn test_external_id_missing_view_segment() {
        assert_eq!(external_id_from_link("/jobs/search/?start=25"), None);
        assert_eq!(external_id_from_link("/jobs/view/"), None);
    }

    #[test]
    fn test_draft_requires_every_field() {
        let draft = PostingDraft {
            title: Some("Engineer".into()),
            company: Some("Acme".into()),
            location: Some("Berlin".into()),
            link: Some("https://example.com/jobs/view/1/".into()),
            id: Some("1".into()),
            description: None,
        };
        assert!(draft.build().is_none());
    }

    #[test]
    fn test_draft_rejects_blank_fields() {
        let draft = PostingDraft {
            title: Some("Engineer".into()),
            company: Some("   ".into()),
            location: Some("Berlin".into()),
            link: Some("https://example.com/jobs/view/1/".into()),
            id: Some("1".into()),
            description: Some("desc".into()),
        };
        assert!(draft.build().is_none());
    }

    #[test]
    fn test_draft_builds_complete_posting() {
        let draft = PostingDraft {
            title: Some("Engineer".into()),
            company: Some("Acme".into()),
            location: Some("Berlin".into()),
            link: Some("https://example.com/jobs/view/1/".into()),
            id: Some("1".into()),
            description: Some("desc".into()),
        };
        let posting = draft.build().expect("complete draft");
        assert_eq!(posting.company, "Acme");
    }
}
