//! Listing snapshot parsing.
//!
//! A snapshot is an immutable parse of the page source at one instant,
//! projected into plain owned data. No I/O; the live session hands the
//! markup in, this module never sees the driver.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

use crate::domain::listing::{FieldSource, ListingField};
use crate::infrastructure::config::SiteProfile;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// One list item as it appeared in the snapshot. Fields are `None` when the
/// corresponding element was absent or missing its attribute.
#[derive(Debug, Clone, Default)]
pub struct SnapshotItem {
    pub link_text: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub link_href: Option<String>,
    /// Site-assigned id attribute of the item element, when present.
    pub item_id: Option<String>,
}

impl FieldSource for SnapshotItem {
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

/// Ordered sequence of list items parsed from one page source.
#[derive(Debug, Clone, Default)]
pub struct ListingSnapshot {
    items: Vec<SnapshotItem>,
}

impl ListingSnapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&SnapshotItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[SnapshotItem] {
        &self.items
    }

    pub fn last(&self) -> Option<&SnapshotItem> {
        self.items.last()
    }
}

/// Compiled selector set for one site profile. Compile once, snapshot many.
pub struct ListingParser {
    item: Selector,
    link: Selector,
    company: Selector,
    location: Selector,
    item_id_attr: String,
    count_pattern: Regex,
}

impl ListingParser {
    pub fn new(profile: &SiteProfile) -> Result<Self, ParseError> {
        Ok(Self {
            item: compile(&profile.list_item)?,
            link: compile(&profile.item_link)?,
            company: compile(&profile.item_company)?,
            location: compile(&profile.item_location)?,
            item_id_attr: profile.item_id_attr.clone(),
            // Result-count captions render with thousands separators.
            count_pattern: Regex::new(r"[\d,]+").map_err(|e| ParseError::InvalidSelector {
                selector: "[\\d,]+".to_owned(),
                reason: e.to_string(),
            })?,
        })
    }

    /// Parse the page source into an ordered item snapshot. Pure function of
    /// the markup; a malformed document simply yields fewer items.
    pub fn snapshot(&self, page_source: &str) -> ListingSnapshot {
        let document = Html::parse_document(page_source);
        let items = document
            .select(&self.item)
            .map(|el| self.project_item(el))
            .collect::<Vec<_>>();

        debug!("Snapshot holds {} listing items", items.len());
        ListingSnapshot { items }
    }

    /// Total result count out of the caption text, tolerating thousands
    /// separators. `None` when the caption carries no number.
    pub fn result_count(&self, caption: &str) -> Option<u64> {
        self.count_pattern
            .find(caption)
            .and_then(|m| m.as_str().replace(',', "").parse().ok())
    }

    fn project_item(&self, element: ElementRef<'_>) -> SnapshotItem {
        let link = element.select(&self.link).next();

        SnapshotItem {
            link_text: link.map(element_text),
            company: element.select(&self.company).next().map(element_text),
            location: element.select(&self.location).next().map(element_text),
            link_href: link.and_then(|el| el.value().attr("href").map(str::to_owned)),
            item_id: element.value().attr(&self.item_id_attr).map(str::to_owned),
        }
    }
}

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::InvalidSelector {
        selector: selector.to_owned(),
        reason: e.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").trim().to_owned()
}
