use anyhow::Result;
use ksb_db::Database;

/// Decides whether `sender` may open or continue a direct-message channel
/// with `receiver`. Consulted on every direct send.
pub trait DirectMessagePolicy: Send + Sync {
    fn allows(&self, db: &Database, sender: i64, receiver: i64) -> Result<bool>;
}

/// Any two users may message each other.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenDirectMessages;

impl DirectMessagePolicy for OpenDirectMessages {
    fn allows(&self, _db: &Database, _sender: i64, _receiver: i64) -> Result<bool> {
        Ok(true)
    }
}

/// Direct messages require an accepted friendship.
#[derive(Debug, Default, Clone, Copy)]
pub struct FriendsOnly;

impl DirectMessagePolicy for FriendsOnly {
    fn allows(&self, db: &Database, sender: i64, receiver: i64) -> Result<bool> {
        db.are_friends(sender, receiver)
    }
}
