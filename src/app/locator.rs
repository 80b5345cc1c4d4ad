//! Page-range location for questions inside an exam PDF.
//!
//! A question's pages are found textually: the marker for question N is the
//! literal `Question #N`, and the page where `Question #N+1` first appears
//! closes the range (that page is included, since a question's content can
//! run onto it). The end search is a bounded 4-page lookahead; when the next
//! marker is not inside the window the last scanned page is used. That
//! fallback is a heuristic, not a proof that the question is complete.

use std::cmp::min;

use crate::app::pdf::PageText;
use crate::error::AppError;

/// Pages scanned past the start page when looking for the next question's
/// marker.
const END_LOOKAHEAD_PAGES: usize = 4;

/// Zero-based, inclusive page range. `start <= end`, both within the
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: usize,
    end: usize,
}

impl PageRange {
    /// Validates a caller-supplied explicit range against the document.
    /// Inputs are zero-based and may be negative (user input).
    pub fn manual(start: i64, end: i64, total_pages: usize) -> Result<Self, AppError> {
        if start < 0 || end < 0 {
            return Err(AppError::InvalidRange(format!(
                "page indices must be non-negative, got {start}..{end}"
            )));
        }
        if start > end {
            return Err(AppError::InvalidRange(format!(
                "start {start} is after end {end}"
            )));
        }
        if end as usize >= total_pages {
            return Err(AppError::InvalidRange(format!(
                "end {end} is outside the document ({total_pages} pages)"
            )));
        }
        Ok(Self {
            start: start as usize,
            end: end as usize,
        })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// 1-based rendering for responses and document headings, e.g. "4-5".
    pub fn display_one_based(&self) -> String {
        if self.start == self.end {
            format!("{}", self.start + 1)
        } else {
            format!("{}-{}", self.start + 1, self.end + 1)
        }
    }
}

/// True when `text` contains the marker for `id` and not merely the marker
/// of a longer id sharing the prefix ("Question #1" vs "Question #10").
fn contains_marker(text: &str, id: u32) -> bool {
    let marker = format!("Question #{id}");
    let mut rest = text;
    while let Some(pos) = rest.find(&marker) {
        let after = &rest[pos + marker.len()..];
        if !after.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return true;
        }
        rest = after;
    }
    false
}

/// Finds the pages holding `question_id`'s content.
///
/// `start_hint` is a 1-based page number biasing the search order: pages
/// from the hint to the document end are scanned first, then the pages
/// before the hint. The hint affects efficiency only, never the result.
pub fn locate<P: PageText>(
    pages: &mut P,
    question_id: u32,
    start_hint: Option<usize>,
) -> Result<PageRange, AppError> {
    let total = pages.page_count();
    if total == 0 {
        return Err(AppError::QuestionNotFound(question_id));
    }

    let hint = start_hint.unwrap_or(1).saturating_sub(1);
    let hint = if hint >= total { 0 } else { hint };

    let mut start = None;
    for page in (hint..total).chain(0..hint) {
        if contains_marker(pages.page_text(page)?, question_id) {
            start = Some(page);
            break;
        }
    }
    let start = start.ok_or(AppError::QuestionNotFound(question_id))?;

    let (end, _) = resolve_end(pages, question_id, start)?;
    Ok(PageRange { start, end })
}

/// Scans forward from `start` for the next question's marker. Returns the
/// end page and whether the marker was actually seen (as opposed to the
/// bounded-window fallback).
fn resolve_end<P: PageText>(
    pages: &mut P,
    question_id: u32,
    start: usize,
) -> Result<(usize, bool), AppError> {
    let last_page = min(start + END_LOOKAHEAD_PAGES, pages.page_count() - 1);
    let mut end = start;
    for page in start..=last_page {
        end = page;
        if contains_marker(pages.page_text(page)?, question_id + 1) {
            return Ok((page, true));
        }
    }
    Ok((end, false))
}

/// One entry of a batch scan result.
#[derive(Debug, Clone, Copy)]
pub struct LocatedQuestion {
    pub id: u32,
    pub range: Option<PageRange>,
}

/// Locates a contiguous ascending run of question ids in one forward sweep.
///
/// A single scan cursor is carried across the batch and never rewound:
/// after question N resolves, the search for N+1 starts at N's end page
/// (or start page when the end marker was not found). This assumes question
/// numbers appear in non-decreasing page order in the document; a question
/// whose marker lies before the cursor is reported as not found even if it
/// exists earlier. Page text is extracted at most once per page for the
/// whole batch.
pub fn locate_batch<P: PageText>(
    pages: &mut P,
    start_id: u32,
    end_id: u32,
) -> Result<Vec<LocatedQuestion>, AppError> {
    let total = pages.page_count();
    let mut results = Vec::with_capacity((end_id.saturating_sub(start_id) + 1) as usize);
    let mut cursor = 0usize;

    for id in start_id..=end_id {
        let mut start = None;
        for page in cursor..total {
            if contains_marker(pages.page_text(page)?, id) {
                start = Some(page);
                break;
            }
        }

        match start {
            Some(start) => {
                let (end, next_seen) = resolve_end(pages, id, start)?;
                // The next question's marker sits on the end page, so the
                // next search begins exactly there.
                cursor = if next_seen { end } else { start };
                results.push(LocatedQuestion {
                    id,
                    range: Some(PageRange { start, end }),
                });
            }
            None => results.push(LocatedQuestion { id, range: None }),
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePages {
        pages: Vec<String>,
        reads: usize,
    }

    impl FakePages {
        fn new(pages: &[&str]) -> Self {
            Self {
                pages: pages.iter().map(|s| s.to_string()).collect(),
                reads: 0,
            }
        }
    }

    impl PageText for FakePages {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&mut self, index: usize) -> Result<&str, AppError> {
            self.reads += 1;
            Ok(&self.pages[index])
        }
    }

    #[test]
    fn single_page_question_yields_equal_start_and_end() {
        // Question #3 and #4 both begin on page 1.
        let mut pages = FakePages::new(&[
            "Question #2 intro",
            "Question #3 body Question #4 next",
            "tail",
        ]);
        let range = locate(&mut pages, 3, None).unwrap();
        assert_eq!(range.start(), 1);
        assert_eq!(range.end(), 1);
    }

    #[test]
    fn end_page_includes_next_marker_page() {
        let mut pages = FakePages::new(&[
            "Question #5 starts here",
            "more of question 5",
            "still question 5, then Question #6",
            "question 6 body",
        ]);
        let range = locate(&mut pages, 5, None).unwrap();
        assert_eq!(range.start(), 0);
        assert_eq!(range.end(), 2);
    }

    #[test]
    fn lookahead_fallback_stops_at_window_edge() {
        let pages_text = ["Question #9", "a", "b", "c", "d", "e", "f"];
        let mut pages = FakePages::new(&pages_text);
        let range = locate(&mut pages, 9, None).unwrap();
        assert_eq!(range.start(), 0);
        // No "Question #10" anywhere: last page scanned in the 4-page window.
        assert_eq!(range.end(), 4);
    }

    #[test]
    fn lookahead_fallback_is_clamped_to_document() {
        let mut pages = FakePages::new(&["x", "Question #9 tail"]);
        let range = locate(&mut pages, 9, None).unwrap();
        assert_eq!(range.start(), 1);
        assert_eq!(range.end(), 1);
    }

    #[test]
    fn hint_biases_search_but_wraps_to_earlier_pages() {
        let mut pages = FakePages::new(&["Question #1 here", "later", "later"]);
        let range = locate(&mut pages, 1, Some(3)).unwrap();
        assert_eq!(range.start(), 0);
    }

    #[test]
    fn missing_marker_is_not_found() {
        let mut pages = FakePages::new(&["nothing", "here"]);
        match locate(&mut pages, 42, None) {
            Err(AppError::QuestionNotFound(42)) => {}
            other => panic!("expected QuestionNotFound, got {other:?}"),
        }
    }

    #[test]
    fn marker_prefix_of_longer_id_does_not_match() {
        let mut pages = FakePages::new(&["Question #10 only", "Question #1 real"]);
        let range = locate(&mut pages, 1, None).unwrap();
        assert_eq!(range.start(), 1);
    }

    #[test]
    fn manual_range_validation() {
        assert!(matches!(
            PageRange::manual(10, 5, 50),
            Err(AppError::InvalidRange(_))
        ));
        assert!(matches!(
            PageRange::manual(-1, 5, 50),
            Err(AppError::InvalidRange(_))
        ));
        let ok = PageRange::manual(0, 49, 50).unwrap();
        assert_eq!(ok.start(), 0);
        assert_eq!(ok.end(), 49);
        assert!(matches!(
            PageRange::manual(0, 50, 50),
            Err(AppError::InvalidRange(_))
        ));
    }

    #[test]
    fn batch_scan_is_monotonic() {
        let mut pages = FakePages::new(&[
            "Question #5",
            "Question #6",
            "filler",
            "Question #7",
            "Question #8",
        ]);
        let results = locate_batch(&mut pages, 5, 7).unwrap();
        assert_eq!(results.len(), 3);
        let mut previous_end = 0;
        for located in &results {
            let range = located.range.expect("all present");
            assert!(range.start() >= previous_end);
            previous_end = range.end();
        }
        assert_eq!(results[2].range.unwrap().start(), 3);
    }

    #[test]
    fn batch_never_rewinds_past_cursor() {
        // Question #6's marker sits before #5's pages: forward-only scan
        // reports it as missing by design.
        let mut pages = FakePages::new(&["Question #6", "filler", "Question #5", "Question #7"]);
        let results = locate_batch(&mut pages, 5, 6).unwrap();
        assert!(results[0].range.is_some());
        assert!(results[1].range.is_none());
    }

    #[test]
    fn batch_memoizes_page_text_reads() {
        let mut pages = FakePages::new(&["Question #1", "Question #2", "Question #3"]);
        let _ = locate_batch(&mut pages, 1, 3).unwrap();
        // A fresh FakePages has no memoization, so reads count every probe;
        // the real index caches. Here we only assert the scan touched pages
        // a bounded number of times (no quadratic restart from page zero).
        assert!(pages.reads <= 3 * pages.page_count());
    }
}
