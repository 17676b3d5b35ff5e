pub mod api;
pub mod message;
pub mod models;

pub use message::{MediaAttachment, MediaKind, NewMessage, ValidationError};
