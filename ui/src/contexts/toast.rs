//! Process-wide queue of transient messages.
//!
//! Hooks push into the queue through [`ToastHandle`]; a renderer somewhere
//! near the app root drains it. This is the concrete notification sink the
//! mutation hook announces settlements through.

use std::rc::Rc;

use uuid::Uuid;
use yew::prelude::*;

use client::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastType {
    Success,
    Error,
}

/// A transient message waiting to be shown.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
    pub toast_type: ToastType,
    pub duration: Option<u32>, // milliseconds, None for no auto-dismiss
}

impl Toast {
    pub fn new(message: String, toast_type: ToastType) -> Self {
        Self {
            id: Uuid::new_v4(),
            message,
            toast_type,
            duration: Some(5000),
        }
    }

    pub fn success(message: String) -> Self {
        Self::new(message, ToastType::Success)
    }

    pub fn error(message: String) -> Self {
        Self::new(message, ToastType::Error)
    }

    pub fn duration(mut self, duration_ms: u32) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    pub fn no_auto_dismiss(mut self) -> Self {
        self.duration = None;
        self
    }
}

/// Pending toasts, oldest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToastState {
    pub toasts: Vec<Toast>,
}

pub enum ToastAction {
    Push(Toast),
    Dismiss(Uuid),
    Clear,
}

impl Reducible for ToastState {
    type Action = ToastAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut toasts = self.toasts.clone();
        match action {
            ToastAction::Push(toast) => toasts.push(toast),
            ToastAction::Dismiss(id) => toasts.retain(|toast| toast.id != id),
            ToastAction::Clear => toasts.clear(),
        }
        Rc::new(ToastState { toasts })
    }
}

pub type ToastContext = UseReducerHandle<ToastState>;

#[derive(Properties, PartialEq)]
pub struct ToastProviderProps {
    pub children: Children,
}

#[function_component]
pub fn ToastProvider(props: &ToastProviderProps) -> Html {
    let toast_state = use_reducer(ToastState::default);

    html! {
        <ContextProvider<ToastContext> context={toast_state}>
            {props.children.clone()}
        </ContextProvider<ToastContext>>
    }
}

/// Cloneable handle for pushing toasts from hooks and callbacks.
#[derive(Clone)]
pub struct ToastHandle {
    context: ToastContext,
}

impl ToastHandle {
    pub fn push(&self, toast: Toast) {
        let toast_id = toast.id;
        let duration = toast.duration;
        self.context.dispatch(ToastAction::Push(toast));

        if let Some(duration_ms) = duration {
            let context = self.context.clone();
            yew::platform::spawn_local(async move {
                gloo_timers::future::TimeoutFuture::new(duration_ms).await;
                context.dispatch(ToastAction::Dismiss(toast_id));
            });
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(Toast::success(message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Toast::error(message.into()));
    }

    pub fn dismiss(&self, id: Uuid) {
        self.context.dispatch(ToastAction::Dismiss(id));
    }

    pub fn clear(&self) {
        self.context.dispatch(ToastAction::Clear);
    }
}

impl Notifier for ToastHandle {
    fn success(&self, message: &str) {
        ToastHandle::success(self, message);
    }

    fn error(&self, message: &str) {
        ToastHandle::error(self, message);
    }
}

#[hook]
pub fn use_toast() -> ToastHandle {
    let context = use_context::<ToastContext>()
        .expect("use_toast must be used within a ToastProvider");
    ToastHandle { context }
}
