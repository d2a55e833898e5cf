pub mod api;
pub mod auth;
pub mod event;
pub mod id;
pub mod pagination;

pub use api::*;
pub use auth::*;
pub use event::*;
pub use id::*;
pub use pagination::*;
