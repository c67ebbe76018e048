use std::future::Future;

use yew::prelude::*;

use client::Paginator;
use payloads::requests::PageQuery;
use payloads::responses::Page;

/// Pagination hook return type.
pub struct PaginationHookReturn<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub loading: bool,
    pub error: Option<String>,
    pub next_page: Callback<()>,
    pub prev_page: Callback<()>,
    pub go_to_page: Callback<u32>,
    pub refetch: Callback<()>,
}

/// Paged listing hook: fetches page 1 on mount and exposes bounds-checked
/// paging controls. Out-of-range jumps are ignored outright, so controls
/// cannot drive the state outside the valid window however fast they are
/// clicked. A failed fetch keeps the previous page visible.
#[hook]
pub fn use_pagination<T, F, Fut>(
    page_size: u32,
    fetch_page: F,
) -> PaginationHookReturn<T>
where
    T: Clone + 'static,
    F: Fn(PageQuery) -> Fut + 'static,
    Fut: Future<Output = Result<Page<T>, String>> + 'static,
{
    let paginator =
        (*use_memo((), move |_| Paginator::new(page_size, fetch_page)))
            .clone();
    let update = use_force_update();

    {
        let paginator = paginator.clone();
        use_effect_with((), move |_| {
            paginator.on_change(move || update.force_update());
            let paginator = paginator.clone();
            yew::platform::spawn_local(async move {
                paginator.fetch_page(1).await;
            });
        });
    }

    let next_page = {
        let paginator = paginator.clone();
        Callback::from(move |_| {
            let paginator = paginator.clone();
            yew::platform::spawn_local(async move {
                paginator.next_page().await;
            });
        })
    };

    let prev_page = {
        let paginator = paginator.clone();
        Callback::from(move |_| {
            let paginator = paginator.clone();
            yew::platform::spawn_local(async move {
                paginator.prev_page().await;
            });
        })
    };

    let go_to_page = {
        let paginator = paginator.clone();
        Callback::from(move |page: u32| {
            let paginator = paginator.clone();
            yew::platform::spawn_local(async move {
                paginator.go_to_page(page).await;
            });
        })
    };

    let refetch = {
        let paginator = paginator.clone();
        Callback::from(move |_| {
            let paginator = paginator.clone();
            yew::platform::spawn_local(async move {
                paginator.refetch().await;
            });
        })
    };

    let state = paginator.state();
    PaginationHookReturn {
        items: state.items,
        page: state.page,
        total_pages: state.total_pages,
        total_items: state.total_items,
        loading: state.loading,
        error: state.error,
        next_page,
        prev_page,
        go_to_page,
        refetch,
    }
}
