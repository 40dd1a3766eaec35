//! Listing-item field access and the load-completeness check.
//!
//! A list item exists in two representations at once: a live handle into the
//! browser's current DOM and a node in an immutable parsed snapshot. Both
//! implement [`FieldSource`] so that one completeness check covers both;
//! keeping two hand-written checks in sync has already produced drift once.

/// The listing-item fields the crawler reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingField {
    /// The detail link; its text doubles as the posting title.
    Link,
    Company,
    Location,
}

/// Minimal read capability over one listing item, independent of whether the
/// item is a live DOM handle or a parsed snapshot node.
///
/// A missing element yields `None`; absence is a rendering state, not an
/// error.
pub trait FieldSource {
    fn field_text(&self, field: ListingField) -> Option<String>;
    fn field_attr(&self, field: ListingField, attr: &str) -> Option<String>;
}

/// An item is fully loaded iff link text, company text, location text and the
/// link href are all present and non-empty after trimming.
///
/// Pure read-only check: calling it twice on an unchanged item returns the
/// same answer.
pub fn is_fully_loaded<S: FieldSource>(item: &S) -> bool {
    let filled = |value: Option<String>| value.is_some_and(|v| !v.trim().is_empty());

    filled(item.field_text(ListingField::Link))
        && filled(item.field_text(ListingField::Company))
        && filled(item.field_text(ListingField::Location))
        && filled(item.field_attr(ListingField::Link, "href"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeItem {
        link_text: Option<String>,
        company: Option<String>,
        location: Option<String>,
        href: Option<String>,
    }

    impl FakeItem {
        fn complete() -> Self {
            Self {
                link_text: Some("Data Engineer".into()),
                company: Some("Acme".into()),
                location: Some("Remote".into()),
                href: Some("/jobs/view/42/".into()),
            }
        }
    }

    impl FieldSource for FakeItem {
        fn field_text(&self, field: ListingField) -> Option<String> {
            match field {
                ListingField::Link => self.link_text.clone(),
                ListingField::Company => self.company.clone(),
                ListingField::Location => self.location.clone(),
            }
        }

        fn field_attr(&self, field: ListingField, attr: &str) -> Option<String> {
            match (field, attr) {
                (ListingField::Link, "href") => self.href.clone(),
                _ => None,
            }
        }
    }

    #[test]
    fn test_complete_item_is_loaded() {
        assert!(is_fully_loaded(&FakeItem::complete()));
    }

    #[test]
    fn test_missing_element_is_not_loaded() {
        let item = FakeItem {
            company: None,
            ..FakeItem::complete()
        };
        assert!(!is_fully_loaded(&item));
    }

    #[test]
    fn test_whitespace_only_text_is_not_loaded() {
        let item = FakeItem {
            location: Some("  \n ".into()),
            ..FakeItem::complete()
        };
        assert!(!is_fully_loaded(&item));
    }

    #[test]
    fn test_empty_href_is_not_loaded() {
        let item = FakeItem {
            href: Some(String::new()),
            ..FakeItem::complete()
        };
        assert!(!is_fully_loaded(&item));
    }

    #[test]
    fn test_check_is_idempotent() {
        let item = FakeItem::complete();
        assert_eq!(is_fully_loaded(&item), is_fully_loaded(&item));

        let partial = FakeItem {
            link_text: None,
            ..FakeItem::complete()
        };
        assert_eq!(is_fully_loaded(&partial), is_fully_loaded(&partial));
    }
}
