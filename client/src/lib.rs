//! Session and request orchestration for the studyhall frontend.
//!
//! Everything the view layer does against the backend goes through here:
//! the transport client injects the bearer credential, the trackers carry
//! per-call-site loading/error state and reconcile overlapping responses,
//! and the session manager owns the authentication lifecycle end to end.

pub mod api_client;
pub mod fetch;
pub mod mutation;
pub mod notify;
pub mod pagination;
pub mod session;
pub mod storage;

pub use api_client::{APIClient, Body, ClientError};
pub use fetch::{RequestState, RequestTracker};
pub use mutation::{MutationOptions, MutationState, MutationTracker};
pub use notify::Notifier;
pub use pagination::{PageState, Paginator};
pub use session::{SessionManager, SessionSnapshot, SessionStatus};
#[cfg(target_arch = "wasm32")]
pub use storage::BrowserStorage;
pub use storage::{AUTH_TOKEN_KEY, AUTH_USER_KEY, MemoryStorage, StorageBackend};
