use std::future::Future;
use std::rc::Rc;

use yew::prelude::*;

use client::{MutationOptions, MutationTracker, Notifier};

use crate::contexts::toast::use_toast;

/// Mutation hook return type.
pub struct MutationHookReturn<I> {
    pub mutate: Callback<I>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Imperative action hook.
///
/// `mutate` fires the action; toasts and the configured callbacks fire
/// when it settles. Invocations are independent and `loading` holds until
/// the last one settles. The options are fixed at mount.
///
/// # Example
///
/// ```rust,ignore
/// let save = use_mutation(
///     {
///         let client = session.client().clone();
///         move |details: UpdateProfile| {
///             let client = client.clone();
///             async move {
///                 client.update_profile(&details).await.map_err(|e| e.to_string())
///             }
///         }
///     },
///     MutationOptions::default().success_message("Profile saved"),
/// );
/// // later: save.mutate.emit(details)
/// ```
#[hook]
pub fn use_mutation<I, T, F, Fut>(
    action: F,
    options: MutationOptions<T>,
) -> MutationHookReturn<I>
where
    I: 'static,
    T: 'static,
    F: Fn(I) -> Fut + 'static,
    Fut: Future<Output = Result<T, String>> + 'static,
{
    let toast = use_toast();
    let tracker = (*use_memo((), move |_| {
        MutationTracker::new(options)
            .with_notifier(Rc::new(toast) as Rc<dyn Notifier>)
    }))
    .clone();
    let update = use_force_update();

    {
        let tracker = tracker.clone();
        use_effect_with((), move |_| {
            tracker.on_change(move || update.force_update());
        });
    }

    let mutate = {
        let tracker = tracker.clone();
        let action = Rc::new(action);
        Callback::from(move |input: I| {
            let tracker = tracker.clone();
            let action = action.clone();
            yew::platform::spawn_local(async move {
                // reactions fire inside mutate; nothing awaits a Callback
                let _ = tracker.mutate(action(input)).await;
            });
        })
    };

    let state = tracker.state();
    MutationHookReturn {
        mutate,
        loading: state.loading,
        error: state.error,
    }
}
