use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use crate::notify::Notifier;

/// Snapshot of a mutation call site.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MutationState {
    pub loading: bool,
    pub error: Option<String>,
}

/// Reaction policy for a mutation: what to announce and call back when an
/// invocation settles.
pub struct MutationOptions<T> {
    pub on_success: Option<Rc<dyn Fn(&T)>>,
    pub on_error: Option<Rc<dyn Fn(&str)>>,
    pub success_message: Option<String>,
    pub notify_on_success: bool,
    pub notify_on_error: bool,
}

impl<T> Default for MutationOptions<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            success_message: None,
            notify_on_success: false,
            notify_on_error: true,
        }
    }
}

impl<T> Clone for MutationOptions<T> {
    fn clone(&self) -> Self {
        Self {
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            success_message: self.success_message.clone(),
            notify_on_success: self.notify_on_success,
            notify_on_error: self.notify_on_error,
        }
    }
}

impl<T> MutationOptions<T> {
    pub fn on_success(mut self, callback: impl Fn(&T) + 'static) -> Self {
        self.on_success = Some(Rc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&str) + 'static) -> Self {
        self.on_error = Some(Rc::new(callback));
        self
    }

    /// Announce successful settlements with the given message.
    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self.notify_on_success = true;
        self
    }

    /// Suppress all notifications, leaving only the callbacks.
    pub fn silent(mut self) -> Self {
        self.notify_on_success = false;
        self.notify_on_error = false;
        self
    }
}

struct MutationInner {
    pending: u32,
    error: Option<String>,
    on_change: Option<Rc<dyn Fn()>>,
}

/// Tracks the lifecycle of an imperative action.
///
/// Invocations are independent: none cancels another, and each reports its
/// own result. `loading` holds from the first still-pending invocation's
/// start until the last one settles.
pub struct MutationTracker<T> {
    inner: Rc<RefCell<MutationInner>>,
    options: MutationOptions<T>,
    notifier: Option<Rc<dyn Notifier>>,
}

impl<T> Clone for MutationTracker<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            options: self.options.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<T> MutationTracker<T> {
    pub fn new(options: MutationOptions<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MutationInner {
                pending: 0,
                error: None,
                on_change: None,
            })),
            options,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Rc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Register the callback invoked after every state change.
    pub fn on_change(&self, callback: impl Fn() + 'static) {
        self.inner.borrow_mut().on_change = Some(Rc::new(callback));
    }

    pub fn state(&self) -> MutationState {
        let inner = self.inner.borrow();
        MutationState {
            loading: inner.pending > 0,
            error: inner.error.clone(),
        }
    }

    /// Run one invocation to settlement.
    ///
    /// Notifications and callbacks fire before this returns, so a caller
    /// awaiting the result always observes the side effects already done.
    /// Failures are returned as well as recorded, so the caller can run its
    /// own control flow.
    pub async fn mutate<Fut>(&self, action: Fut) -> Result<T, String>
    where
        Fut: Future<Output = Result<T, String>>,
    {
        {
            let mut inner = self.inner.borrow_mut();
            inner.pending += 1;
            inner.error = None;
        }
        self.notify_change();

        let result = action.await;

        {
            let mut inner = self.inner.borrow_mut();
            inner.pending -= 1;
            if let Err(error) = &result {
                inner.error = Some(error.clone());
            }
        }
        self.notify_change();

        match &result {
            Ok(value) => {
                if self.options.notify_on_success
                    && let Some(notifier) = &self.notifier
                {
                    let message = self
                        .options
                        .success_message
                        .as_deref()
                        .unwrap_or("Success");
                    notifier.success(message);
                }
                if let Some(on_success) = &self.options.on_success {
                    on_success(value);
                }
            }
            Err(error) => {
                if self.options.notify_on_error
                    && let Some(notifier) = &self.notifier
                {
                    notifier.error(error);
                }
                if let Some(on_error) = &self.options.on_error {
                    on_error(error);
                }
            }
        }
        result
    }

    fn notify_change(&self) {
        let on_change = self.inner.borrow().on_change.clone();
        if let Some(on_change) = on_change {
            on_change();
        }
    }
}
