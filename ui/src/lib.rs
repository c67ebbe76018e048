//! Yew bindings for the studyhall client runtime.
//!
//! The state machines live in the `client` crate; this crate adapts them
//! into hooks and context providers for the view layer: `use_fetch`,
//! `use_mutation`, `use_pagination`, and the session/toast providers.

use std::rc::Rc;
use std::sync::Arc;

use yew::prelude::*;

use client::APIClient;
use client::session::SessionManager;

pub mod contexts;
pub mod hooks;
mod logs;

pub use contexts::toast::{Toast, ToastProvider, ToastType, use_toast};
pub use hooks::{
    use_fetch, use_identity, use_mutation, use_pagination, use_session,
};
pub use logs::init_logging;

/// Where API calls go - configurable via environment or same-origin
/// fallback.
pub fn backend_address() -> String {
    option_env!("BACKEND_URL")
        .map(|url| url.to_string())
        .unwrap_or_else(|| {
            let window = web_sys::window().unwrap();
            window.location().origin().unwrap()
        })
}

/// Build the process-wide session over browser localStorage.
#[cfg(target_arch = "wasm32")]
pub fn create_session() -> SessionHandle {
    let storage: Arc<dyn client::StorageBackend> =
        Arc::new(client::BrowserStorage);
    let api = APIClient::new(backend_address(), storage.clone());
    SessionHandle(Rc::new(SessionManager::new(api, storage)))
}

/// Handle to the process-wide session manager, passed down via context.
#[derive(Clone)]
pub struct SessionHandle(pub Rc<SessionManager>);

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::ops::Deref for SessionHandle {
    type Target = SessionManager;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SessionHandle {
    /// Wrap an externally-built manager, e.g. one with custom storage.
    pub fn new(client: APIClient, storage: Arc<dyn client::StorageBackend>) -> Self {
        Self(Rc::new(SessionManager::new(client, storage)))
    }
}

#[derive(Properties, PartialEq)]
pub struct SessionProviderProps {
    pub session: SessionHandle,
    pub children: Children,
}

/// Hosts the session in context and kicks off bootstrap: children render
/// immediately while the persisted session is reconciled in the
/// background.
#[function_component]
pub fn SessionProvider(props: &SessionProviderProps) -> Html {
    let session = props.session.clone();

    use_effect_with((), {
        let session = session.clone();
        move |_| {
            yew::platform::spawn_local(async move {
                session.bootstrap().await;
            });
        }
    });

    html! {
        <ContextProvider<SessionHandle> context={session}>
            {props.children.clone()}
        </ContextProvider<SessionHandle>>
    }
}
