//! Message query core: channel scoping, reply resolution and mutation
//! authorization on top of the `ksb-db` message store.

pub mod channel;
pub mod convert;
pub mod error;
pub mod mutation;
pub mod policy;
pub mod replies;
pub mod service;

pub use channel::Channel;
pub use error::{ChatError, Result};
pub use policy::{DirectMessagePolicy, FriendsOnly, OpenDirectMessages};
pub use service::ChatService;
