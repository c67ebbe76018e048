use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

/// Snapshot of one request-producing call site.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

struct TrackerInner<T> {
    state: RequestState<T>,
    sequence: u64,
    on_change: Option<Rc<dyn Fn()>>,
}

/// State machine behind a fetch-on-mount call site.
///
/// Every issued call is tagged with a sequence number. A settlement whose
/// tag no longer matches belongs to a superseded call and is discarded
/// without touching state, so the last-issued call wins regardless of the
/// order responses come back in. There is no cancellation of the underlying
/// transport call; discarding is sufficient.
pub struct RequestTracker<T> {
    inner: Rc<RefCell<TrackerInner<T>>>,
}

impl<T> Clone for RequestTracker<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Default for RequestTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> RequestTracker<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(TrackerInner {
                state: RequestState::default(),
                sequence: 0,
                on_change: None,
            })),
        }
    }

    /// Register the callback invoked after every state change.
    pub fn on_change(&self, callback: impl Fn() + 'static) {
        self.inner.borrow_mut().on_change = Some(Rc::new(callback));
    }

    pub fn state(&self) -> RequestState<T> {
        self.inner.borrow().state.clone()
    }

    /// Start a new call: supersede anything in flight, mark loading, clear
    /// the previous error. Returns the tag to settle with.
    pub fn begin(&self) -> u64 {
        let sequence = {
            let mut inner = self.inner.borrow_mut();
            inner.sequence += 1;
            inner.state.loading = true;
            inner.state.error = None;
            inner.sequence
        };
        self.notify();
        sequence
    }

    /// Apply a call's result unless it has been superseded. Returns whether
    /// the result was applied. Failures keep the previous data visible.
    pub fn settle(&self, sequence: u64, result: Result<T, String>) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if sequence != inner.sequence {
                return false;
            }
            match result {
                Ok(data) => {
                    inner.state.data = Some(data);
                    inner.state.error = None;
                }
                Err(error) => {
                    inner.state.error = Some(error);
                }
            }
            inner.state.loading = false;
        }
        self.notify();
        true
    }

    /// Issue a call end to end: `begin`, await the producer, `settle`.
    pub async fn run<Fut>(&self, producer: Fut)
    where
        Fut: Future<Output = Result<T, String>>,
    {
        let sequence = self.begin();
        let result = producer.await;
        self.settle(sequence, result);
    }

    fn notify(&self) {
        let on_change = self.inner.borrow().on_change.clone();
        if let Some(on_change) = on_change {
            on_change();
        }
    }
}
