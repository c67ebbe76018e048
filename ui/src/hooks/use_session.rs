use yew::prelude::*;

use payloads::responses::UserProfile;

use crate::SessionHandle;

/// Access the process-wide session manager from context, re-rendering the
/// component on every session transition.
#[hook]
pub fn use_session() -> SessionHandle {
    let session = use_context::<SessionHandle>()
        .expect("use_session must be used within a SessionProvider");
    let update = use_force_update();

    {
        let session = session.clone();
        use_effect_with((), move |_| {
            let id = session.subscribe(move || update.force_update());
            let session = session.clone();
            move || session.unsubscribe(id)
        });
    }

    session
}

/// The visible identity, if any - including the optimistic one shown while
/// a persisted session is still being verified.
#[hook]
pub fn use_identity() -> Option<UserProfile> {
    let session = use_session();
    session.snapshot().identity
}
