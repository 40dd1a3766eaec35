//! Pagination planning for paginated search results.
//!
//! Responsibility:
//! - page count from the site's total-result count and the requested limit
//! - zero-based `start` offsets for listing-page requests
//! - per-page expected item counts, the scroll loader's satisfaction target

/// One listing page the crawler will visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlot {
    /// 1-based page number.
    pub number: u32,
    /// Zero-based result offset, `(number - 1) * page_size`.
    pub start_offset: u32,
    /// Number of items this page is supposed to contain.
    pub expected_items: u32,
}

#[derive(Debug, Clone)]
pub struct PaginationPlanner {
    page_size: u32,
}

impl PaginationPlanner {
    pub fn new(page_size: u32) -> Self {
        debug_assert!(page_size > 0);
        Self { page_size }
    }

    /// Pages to visit: the requested limit, clamped to how many pages the
    /// result count actually fills.
    pub fn page_count(&self, total_results: u64, requested_pages: u32) -> u32 {
        let size = u64::from(self.page_size);
        let available = total_results.div_ceil(size);
        requested_pages.min(u32::try_from(available).unwrap_or(u32::MAX))
    }

    pub fn start_offset(&self, page: u32) -> u32 {
        (page - 1) * self.page_size
    }

    /// Items a page is supposed to contain.
    ///
    /// The final page carries the remainder of the result count. When the
    /// count divides evenly the remainder formula would produce zero and the
    /// loader would declare an empty page satisfied, so an exact multiple
    /// expects the full page size instead.
    pub fn expected_items(&self, total_results: u64, page: u32) -> u32 {
        let size = u64::from(self.page_size);
        let is_final = u64::from(page) * size > total_results;
        let remainder = total_results % size;

        if is_final && remainder != 0 {
            remainder as u32
        } else {
            self.page_size
        }
    }

    /// Full plan for a run: one slot per page, in visit order.
    pub fn plan(&self, total_results: u64, requested_pages: u32) -> Vec<PageSlot> {
        (1..=self.page_count(total_results, requested_pages))
            .map(|number| PageSlot {
                number,
                start_offset: self.start_offset(number),
                expected_items: self.expected_items(total_results, number),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 25)]
    #[case(2, 25)]
    #[case(3, 25)]
    #[case(4, 25)]
    #[case(5, 25)]
    #[case(6, 12)]
    fn test_expected_items_with_remainder(#[case] page: u32, #[case] expected: u32) {
        let planner = PaginationPlanner::new(25);
        assert_eq!(planner.expected_items(137, page), expected);
    }

    #[test]
    fn test_exact_multiple_expects_full_page() {
        let planner = PaginationPlanner::new(25);
        // 150 % 25 == 0; the last real page still holds 25 items.
        assert_eq!(planner.expected_items(150, 6), 25);
        // Even a page past the end must never expect zero items.
        assert_eq!(planner.expected_items(150, 7), 25);
    }

    #[test]
    fn test_page_count_clamps_to_available() {
        let planner = PaginationPlanner::new(25);
        assert_eq!(planner.page_count(137, 50), 6);
        assert_eq!(planner.page_count(137, 3), 3);
        assert_eq!(planner.page_count(150, 50), 6);
        assert_eq!(planner.page_count(0, 50), 0);
    }

    #[test]
    fn test_start_offsets() {
        let planner = PaginationPlanner::new(25);
        assert_eq!(planner.start_offset(1), 0);
        assert_eq!(planner.start_offset(4), 75);
    }

    #[test]
    fn test_plan_covers_all_pages_in_order() {
        let planner = PaginationPlanner::new(25);
        let plan = planner.plan(137, 50);

        assert_eq!(plan.len(), 6);
        assert_eq!(plan[0].start_offset, 0);
        assert_eq!(plan[5].number, 6);
        assert_eq!(plan[5].start_offset, 125);
        assert_eq!(plan[5].expected_items, 12);
    }
}
