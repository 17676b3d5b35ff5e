//! Authorization for edits and deletes.
//!
//! Deleting is open to the author and to admins; editing is open to the
//! author only. Callers check that the message exists before asking, so a
//! missing message reports not-found whoever the requester is.

use anyhow::Result;
use ksb_db::Database;
use ksb_types::models::Message;
use tracing::warn;

use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: i64,
    pub is_admin: bool,
}

impl Requester {
    /// Look up the admin flag for `id`. An unknown user has no privileges.
    pub fn lookup(db: &Database, id: i64) -> Result<Self> {
        let is_admin = match db.get_user_by_id(id)? {
            Some(user) => user.is_admin,
            None => {
                warn!("Mutation requested by unknown user {}", id);
                false
            }
        };
        Ok(Self { id, is_admin })
    }
}

pub fn authorize_delete(requester: &Requester, message: &Message) -> Result<(), ChatError> {
    if message.author_id == requester.id || requester.is_admin {
        Ok(())
    } else {
        Err(ChatError::Forbidden("only the author or an admin can delete this message"))
    }
}

pub fn authorize_edit(requester: &Requester, message: &Message) -> Result<(), ChatError> {
    if message.author_id == requester.id {
        Ok(())
    } else {
        Err(ChatError::Forbidden("only the author can edit this message"))
    }
}
