//! Walking a paged result table.

use tracing::{debug, warn};

use crate::error::AurionError;
use crate::protocol::{MAX_PAGES, PAGE_SIZE};
use crate::traits::PageSource;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// Whether the page advertised an enabled "next" control.
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, has_more: bool) -> Self {
        Self { records, has_more }
    }

    /// A page is the last one when it is empty, short, or has no next control.
    fn is_last(&self) -> bool {
        self.records.is_empty() || self.records.len() < PAGE_SIZE || !self.has_more
    }
}

/// Continue from an already fetched `first` page until the listing is
/// exhausted. Fetch errors after the first page truncate the result.
pub async fn paginate<S>(first: Page<S::Record>, source: &mut S) -> Vec<S::Record>
where
    S: PageSource + ?Sized,
{
    let mut last = first.is_last();
    let mut records = first.records;
    let mut pages = 1;

    while !last {
        if pages >= MAX_PAGES {
            warn!(pages, records = records.len(), "page ceiling reached, stopping");
            break;
        }
        let offset = pages * PAGE_SIZE;
        match source.fetch_page(offset).await {
            Ok(page) => {
                pages += 1;
                debug!(offset, rows = page.records.len(), has_more = page.has_more, "page fetched");
                last = page.is_last();
                records.extend(page.records);
            }
            Err(e) => {
                warn!(offset, records = records.len(), "page fetch failed, keeping partial result: {e}");
                break;
            }
        }
    }
    records
}

/// Fetch the first page at offset 0 through `source`, then [`paginate`].
/// A K-page listing costs exactly K `fetch_page` calls.
pub async fn walk<S>(source: &mut S) -> Result<Vec<S::Record>, AurionError>
where
    S: PageSource + ?Sized,
{
    let first = source.fetch_page(0).await?;
    Ok(paginate(first, source).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// `total` rows served 20 at a time, optionally failing at one offset.
    struct Fixture {
        total: usize,
        calls: Vec<usize>,
        fail_at: Option<usize>,
        full_forever: bool,
    }

    impl Fixture {
        fn rows(total: usize) -> Self {
            Self {
                total,
                calls: Vec::new(),
                fail_at: None,
                full_forever: false,
            }
        }
    }

    #[async_trait]
    impl PageSource for Fixture {
        type Record = usize;

        async fn fetch_page(&mut self, offset: usize) -> Result<Page<usize>, AurionError> {
            self.calls.push(offset);
            if self.fail_at == Some(offset) {
                return Err(AurionError::Transport("connection reset".into()));
            }
            if self.full_forever {
                return Ok(Page::new((offset..offset + PAGE_SIZE).collect(), true));
            }
            let end = (offset + PAGE_SIZE).min(self.total);
            let records: Vec<usize> = (offset..end).collect();
            Ok(Page::new(records, end < self.total))
        }
    }

    #[tokio::test]
    async fn test_k_pages_cost_k_calls() {
        // K = 4 pages, last page holds r = 7 rows.
        let mut source = Fixture::rows(20 * 3 + 7);
        let records = walk(&mut source).await.unwrap();
        assert_eq!(records.len(), 67);
        assert_eq!(records, (0..67).collect::<Vec<_>>());
        assert_eq!(source.calls, vec![0, 20, 40, 60]);
    }

    #[tokio::test]
    async fn test_single_short_page() {
        let mut source = Fixture::rows(5);
        let records = walk(&mut source).await.unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(source.calls, vec![0]);
    }

    #[tokio::test]
    async fn test_empty_page_after_exact_multiple() {
        // 40 rows exactly: page 2 is full but advertises no next page.
        let mut source = Fixture::rows(40);
        let records = walk(&mut source).await.unwrap();
        assert_eq!(records.len(), 40);
        assert_eq!(source.calls, vec![0, 20]);
    }

    #[tokio::test]
    async fn test_ceiling_stops_at_max_pages() {
        let mut source = Fixture {
            full_forever: true,
            ..Fixture::rows(0)
        };
        let records = walk(&mut source).await.unwrap();
        assert_eq!(source.calls.len(), MAX_PAGES);
        assert_eq!(records.len(), MAX_PAGES * PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_error_truncates() {
        let mut source = Fixture {
            fail_at: Some(40),
            ..Fixture::rows(100)
        };
        let records = walk(&mut source).await.unwrap();
        assert_eq!(records.len(), 40);
        assert_eq!(source.calls, vec![0, 20, 40]);
    }

    #[tokio::test]
    async fn test_first_page_error_propagates() {
        let mut source = Fixture {
            fail_at: Some(0),
            ..Fixture::rows(100)
        };
        assert!(walk(&mut source).await.is_err());
    }

    #[tokio::test]
    async fn test_paginate_respects_first_page_without_next() {
        let mut source = Fixture::rows(100);
        let first = Page::new((0..20).collect(), false);
        let records = paginate(first, &mut source).await;
        assert_eq!(records.len(), 20);
        assert!(source.calls.is_empty());
    }
}
