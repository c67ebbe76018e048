pub mod use_fetch;
pub mod use_mutation;
pub mod use_pagination;
pub mod use_session;

pub use use_fetch::{FetchHookReturn, use_fetch};
pub use use_mutation::{MutationHookReturn, use_mutation};
pub use use_pagination::{PaginationHookReturn, use_pagination};
pub use use_session::{use_identity, use_session};
