pub mod auth;
pub mod error;
pub mod extract;
pub mod friends;
pub mod intel;
pub mod messages;
pub mod middleware;
pub mod router;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use router::router;
