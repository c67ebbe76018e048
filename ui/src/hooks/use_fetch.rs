use std::future::Future;
use std::rc::Rc;

use yew::prelude::*;

use client::RequestTracker;

/// Generic fetch hook return type
pub struct FetchHookReturn<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub refetch: Callback<()>,
}

impl<T> FetchHookReturn<T> {
    /// Returns true if this is the initial load (data not yet fetched,
    /// currently loading, and no error).
    pub fn is_initial_loading(&self) -> bool {
        self.loading && self.data.is_none() && self.error.is_none()
    }
}

/// Generic fetch hook composer.
///
/// Issues the producer on mount and on every change of `deps`, and exposes
/// a manual `refetch`. The fetch function captures its inputs from the
/// closure; `deps` exists for dependency tracking in `use_callback` and
/// `use_effect_with`. Responses of superseded calls are discarded by the
/// tracker, so the last-issued call wins even when the network answers out
/// of order.
///
/// # Example
///
/// ```rust,ignore
/// #[hook]
/// pub fn use_course_page(session: SessionHandle, page: u32) -> FetchHookReturn<Page<Course>> {
///     use_fetch(page, move || {
///         let client = session.client().clone();
///         async move {
///             client
///                 .list_courses(&PageQuery { page, page_size: 20 })
///                 .await
///                 .map_err(|e| e.to_string())
///         }
///     })
/// }
/// ```
#[hook]
pub fn use_fetch<T, D, F, Fut>(deps: D, fetch_fn: F) -> FetchHookReturn<T>
where
    T: Clone + 'static,
    D: PartialEq + Clone + 'static,
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = Result<T, String>> + 'static,
{
    let tracker = (*use_memo((), |_| RequestTracker::<T>::new())).clone();
    let update = use_force_update();

    {
        let tracker = tracker.clone();
        use_effect_with((), move |_| {
            tracker.on_change(move || update.force_update());
        });
    }

    let refetch = {
        let tracker = tracker.clone();
        let fetch_fn = Rc::new(fetch_fn);

        use_callback(deps.clone(), move |_, _| {
            let tracker = tracker.clone();
            let fetch_fn = fetch_fn.clone();
            yew::platform::spawn_local(async move {
                tracker.run(fetch_fn()).await;
            });
        })
    };

    // Auto-fetch on mount and when deps change
    {
        let refetch = refetch.clone();
        use_effect_with(deps, move |_| {
            refetch.emit(());
        });
    }

    let state = tracker.state();
    FetchHookReturn {
        data: state.data,
        loading: state.loading,
        error: state.error,
        refetch: Callback::from(move |_| refetch.emit(())),
    }
}
