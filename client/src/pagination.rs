use std::future::Future;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use payloads::requests::PageQuery;
use payloads::responses::Page;

use crate::fetch::RequestTracker;

/// Snapshot of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PageState<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub loading: bool,
    pub error: Option<String>,
}

type PageFetcher<T> =
    Rc<dyn Fn(PageQuery) -> LocalBoxFuture<'static, Result<Page<T>, String>>>;

/// Page-by-page list fetching built on the request primitive.
///
/// The fetched page number travels with the response through the tracker,
/// so the visible page and its items always move together: overlapping
/// fetches inherit the tracker's last-issued-wins rule, and a discarded or
/// failed fetch leaves the previous window fully intact.
pub struct Paginator<T> {
    tracker: RequestTracker<(u32, Page<T>)>,
    page_size: u32,
    fetcher: PageFetcher<T>,
}

impl<T> Clone for Paginator<T> {
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
            page_size: self.page_size,
            fetcher: self.fetcher.clone(),
        }
    }
}

impl<T: Clone + 'static> Paginator<T> {
    pub fn new<F, Fut>(page_size: u32, fetcher: F) -> Self
    where
        F: Fn(PageQuery) -> Fut + 'static,
        Fut: Future<Output = Result<Page<T>, String>> + 'static,
    {
        Self {
            tracker: RequestTracker::new(),
            page_size,
            fetcher: Rc::new(move |query| Box::pin(fetcher(query))),
        }
    }

    /// Register the callback invoked after every state change.
    pub fn on_change(&self, callback: impl Fn() + 'static) {
        self.tracker.on_change(callback);
    }

    pub fn state(&self) -> PageState<T> {
        let request = self.tracker.state();
        match request.data {
            Some((page, window)) => PageState {
                items: window.items,
                page,
                total_pages: window.total_pages.max(1),
                total_items: window.total_items,
                loading: request.loading,
                error: request.error,
            },
            None => PageState {
                items: Vec::new(),
                page: 1,
                total_pages: 1,
                total_items: 0,
                loading: request.loading,
                error: request.error,
            },
        }
    }

    /// Fetch the given page, replacing the window on success. Prior items
    /// stay visible when the fetch fails.
    pub async fn fetch_page(&self, page: u32) {
        let sequence = self.tracker.begin();
        let query = PageQuery {
            page,
            page_size: self.page_size,
        };
        let result =
            (self.fetcher)(query).await.map(|window| (page, window));
        self.tracker.settle(sequence, result);
    }

    /// Advance one page; a no-op at the last page.
    pub async fn next_page(&self) {
        let state = self.state();
        if state.page < state.total_pages {
            self.fetch_page(state.page + 1).await;
        }
    }

    /// Step back one page; a no-op at the first page.
    pub async fn prev_page(&self) {
        let state = self.state();
        if state.page > 1 {
            self.fetch_page(state.page - 1).await;
        }
    }

    /// Jump to a page. Requests outside the valid window are ignored
    /// entirely: no call goes out and nothing changes, however fast the
    /// paging controls are clicked.
    pub async fn go_to_page(&self, page: u32) {
        let state = self.state();
        if page < 1 || page > state.total_pages {
            return;
        }
        self.fetch_page(page).await;
    }

    /// Reload the current page in place.
    pub async fn refetch(&self) {
        self.fetch_page(self.state().page).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Paginator over a synthetic listing of `total_items` numbers,
    /// counting how many fetches actually go out.
    fn counting_paginator(
        total_items: u64,
        page_size: u32,
        calls: Rc<Cell<u32>>,
    ) -> Paginator<u64> {
        Paginator::new(page_size, move |query: PageQuery| {
            calls.set(calls.get() + 1);
            let total_pages =
                total_items.div_ceil(page_size as u64).max(1) as u32;
            let start = ((query.page - 1) * query.page_size) as u64;
            let end = (start + query.page_size as u64).min(total_items);
            let items: Vec<u64> = (start..end).collect();
            async move {
                Ok(Page {
                    items,
                    total_pages,
                    total_items,
                })
            }
        })
    }

    #[tokio::test]
    async fn next_page_stops_at_the_last_page() {
        let calls = Rc::new(Cell::new(0));
        let paginator = counting_paginator(23, 10, calls.clone());
        paginator.fetch_page(1).await;
        assert_eq!(paginator.state().total_pages, 3);

        let mut pages = vec![paginator.state().page];
        for _ in 0..3 {
            paginator.next_page().await;
            pages.push(paginator.state().page);
        }
        assert_eq!(pages, [1, 2, 3, 3]);
        assert_eq!(calls.get(), 3); // the fourth click issued no call
    }

    #[tokio::test]
    async fn prev_page_stops_at_the_first_page() {
        let calls = Rc::new(Cell::new(0));
        let paginator = counting_paginator(23, 10, calls.clone());
        paginator.fetch_page(1).await;

        paginator.prev_page().await;
        assert_eq!(paginator.state().page, 1);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn out_of_range_pages_are_ignored() {
        let calls = Rc::new(Cell::new(0));
        let paginator = counting_paginator(23, 10, calls.clone());
        paginator.fetch_page(1).await;
        let before = paginator.state();
        let calls_before = calls.get();

        paginator.go_to_page(0).await;
        paginator.go_to_page(4).await;

        assert_eq!(paginator.state(), before);
        assert_eq!(calls.get(), calls_before);
    }

    #[tokio::test]
    async fn failed_page_keeps_previous_items() {
        let paginator = Paginator::new(10, |query: PageQuery| async move {
            if query.page == 1 {
                Ok(Page {
                    items: vec![1u64, 2, 3],
                    total_pages: 2,
                    total_items: 13,
                })
            } else {
                Err("unavailable".to_string())
            }
        });
        paginator.fetch_page(1).await;
        paginator.next_page().await;

        let state = paginator.state();
        assert_eq!(state.items, [1, 2, 3]);
        assert_eq!(state.page, 1);
        assert_eq!(state.error.as_deref(), Some("unavailable"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn empty_listing_still_has_one_page() {
        let paginator = counting_paginator(0, 10, Rc::new(Cell::new(0)));
        paginator.fetch_page(1).await;

        let state = paginator.state();
        assert_eq!(state.total_pages, 1);
        assert_eq!(state.total_items, 0);
        assert!(state.items.is_empty());
    }

    #[tokio::test]
    async fn refetch_does_not_move_the_page() {
        let calls = Rc::new(Cell::new(0));
        let paginator = counting_paginator(23, 10, calls.clone());
        paginator.fetch_page(1).await;
        paginator.next_page().await;

        paginator.refetch().await;

        assert_eq!(paginator.state().page, 2);
        assert_eq!(calls.get(), 3);
    }
}
