//! HTTP surface: JSON over axum, Basic `email:token` authentication.

mod docs;
pub mod dto;
mod groups;
mod policies;
pub mod response;
mod router;
mod users;

pub use router::{AppState, create_router, open_store};
