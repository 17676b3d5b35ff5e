use std::sync::Arc;

use ksb_db::Database;
use ksb_types::models::{Message, MessageView};
use ksb_types::message::edited_content;
use ksb_types::{NewMessage, ValidationError};
use tracing::{info, warn};

use crate::channel::{self, Channel};
use crate::convert::message_from_row;
use crate::error::{ChatError, Result};
use crate::mutation::{Requester, authorize_delete, authorize_edit};
use crate::policy::{DirectMessagePolicy, OpenDirectMessages};
use crate::replies::attach_replies;

/// Entry point for every message operation. The requesting identity is always
/// an explicit argument.
pub struct ChatService {
    db: Arc<Database>,
    dm_policy: Box<dyn DirectMessagePolicy>,
}

impl ChatService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            dm_policy: Box::new(OpenDirectMessages),
        }
    }

    pub fn with_policy(mut self, policy: impl DirectMessagePolicy + 'static) -> Self {
        self.dm_policy = Box::new(policy);
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Group feed when `target` is `None`, otherwise the direct thread between
    /// `requester` and `target`. Oldest first, full history.
    pub fn list_messages(&self, requester: i64, target: Option<i64>) -> Result<Vec<MessageView>> {
        let all = self
            .db
            .list_messages()?
            .into_iter()
            .map(message_from_row)
            .collect();

        let visible = channel::resolve(all, requester, target);
        Ok(attach_replies(&self.db, visible)?)
    }

    pub fn get_message(&self, id: i64) -> Result<Message> {
        self.db
            .get_message(id)?
            .map(message_from_row)
            .ok_or(ChatError::NotFound(id))
    }

    pub fn send_message(&self, msg: NewMessage) -> Result<Message> {
        let author = msg.author_id();

        if let Some(receiver) = msg.receiver_id() {
            if receiver == author {
                return Err(ValidationError::SelfMessage.into());
            }
            if self.db.get_user_by_id(receiver)?.is_none() {
                return Err(ValidationError::UnknownReceiver(receiver).into());
            }
            if !self.dm_policy.allows(&self.db, author, receiver)? {
                warn!("Direct message {} -> {} refused by policy", author, receiver);
                return Err(ChatError::Forbidden("direct messages to this user are not allowed"));
            }
        }

        // A parent deleted between this check and the append leaves the same
        // state as a later deletion: the reply resolves with no parent.
        if let Some(parent_id) = msg.parent_id() {
            let parent = self
                .db
                .get_message(parent_id)?
                .map(message_from_row)
                .ok_or(ValidationError::UnknownParent(parent_id))?;

            if Channel::of(&parent) != Channel::of_parts(author, msg.receiver_id()) {
                return Err(ValidationError::ParentOutsideChannel(parent_id).into());
            }
        }

        let row = self.db.append_message(&msg)?;
        info!(
            "message.send: id={} author={} receiver={:?} parent={:?}",
            row.id, row.author_id, row.receiver_id, row.parent_id
        );
        Ok(message_from_row(row))
    }

    pub fn edit_message(&self, requester: i64, id: i64, content: &str) -> Result<Message> {
        let message = self.get_message(id)?;
        authorize_edit(&Requester::lookup(&self.db, requester)?, &message)?;

        let content = edited_content(content, message.media.is_some())?;
        let row = self
            .db
            .edit_message_content(id, content.as_deref())?
            .ok_or(ChatError::NotFound(id))?;

        info!("message.edit: id={} by={}", id, requester);
        Ok(message_from_row(row))
    }

    pub fn delete_message(&self, requester: i64, id: i64) -> Result<()> {
        let message = self.get_message(id)?;
        let requester = Requester::lookup(&self.db, requester)?;
        authorize_delete(&requester, &message)?;

        // A concurrent delete may have won; the message is gone either way.
        self.db.remove_message(id)?;

        info!(
            "message.delete: id={} by={} admin={}",
            id, requester.id, requester.is_admin
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FriendsOnly;
    use ksb_types::{MediaAttachment, MediaKind};

    struct Fixture {
        chat: ChatService,
        a: i64,
        b: i64,
        c: i64,
        admin: i64,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let a = db.create_user("alpha", "h", "Alpha", false).unwrap().unwrap().id;
        let b = db.create_user("bravo", "h", "Bravo", false).unwrap().unwrap().id;
        let c = db.create_user("charlie", "h", "Charlie", false).unwrap().unwrap().id;
        let admin = db.create_user("command", "h", "Komuta", true).unwrap().unwrap().id;
        Fixture { chat: ChatService::new(db), a, b, c, admin }
    }

    fn text(author: i64, body: &str) -> NewMessage {
        NewMessage::text(author, body).unwrap()
    }

    fn contents(views: &[MessageView]) -> Vec<&str> {
        views
            .iter()
            .map(|v| v.message.content.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn send_then_get_roundtrip() {
        let f = fixture();
        let sent = f.chat.send_message(text(f.a, "x")).unwrap();

        let got = f.chat.get_message(sent.id).unwrap();
        assert_eq!(got.content.as_deref(), Some("x"));
        assert_eq!(got.author_id, f.a);
        assert!(got.created_at.timestamp() > 0);
    }

    #[test]
    fn group_message_not_visible_in_direct_thread() {
        let f = fixture();
        f.chat.send_message(text(f.a, "hello")).unwrap();

        let group = f.chat.list_messages(f.a, None).unwrap();
        assert_eq!(contents(&group), vec!["hello"]);

        let dm = f.chat.list_messages(f.a, Some(f.c)).unwrap();
        assert!(dm.is_empty());
    }

    #[test]
    fn direct_thread_is_symmetric() {
        let f = fixture();
        f.chat.send_message(text(f.a, "ping").to(f.b)).unwrap();
        f.chat.send_message(text(f.b, "pong").to(f.a)).unwrap();
        f.chat.send_message(text(f.a, "side").to(f.c)).unwrap();
        f.chat.send_message(text(f.b, "everyone")).unwrap();

        let ab = f.chat.list_messages(f.a, Some(f.b)).unwrap();
        let ba = f.chat.list_messages(f.b, Some(f.a)).unwrap();
        assert_eq!(contents(&ab), vec!["ping", "pong"]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn listing_is_repeatable_without_writes() {
        let f = fixture();
        for i in 0..5 {
            f.chat.send_message(text(f.a, &format!("m{i}"))).unwrap();
        }
        let first = f.chat.list_messages(f.b, None).unwrap();
        let second = f.chat.list_messages(f.b, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn appended_message_visible_to_next_poll() {
        let f = fixture();
        let before = f.chat.list_messages(f.b, None).unwrap().len();
        f.chat.send_message(text(f.a, "fresh")).unwrap();
        let after = f.chat.list_messages(f.b, None).unwrap();
        assert_eq!(after.len(), before + 1);
        assert_eq!(after.last().unwrap().message.content.as_deref(), Some("fresh"));
    }

    #[test]
    fn reply_survives_parent_deletion_by_admin() {
        let f = fixture();
        let m1 = f.chat.send_message(text(f.a, "hello")).unwrap();
        let m2 = f.chat.send_message(text(f.b, "roger").replying_to(m1.id)).unwrap();

        let views = f.chat.list_messages(f.b, None).unwrap();
        let reply = views.iter().find(|v| v.message.id == m2.id).unwrap();
        assert_eq!(reply.reply_to.as_ref().unwrap().content.as_deref(), Some("hello"));

        f.chat.delete_message(f.admin, m1.id).unwrap();

        let views = f.chat.list_messages(f.b, None).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].message.id, m2.id);
        assert_eq!(views[0].message.content.as_deref(), Some("roger"));
        assert!(views[0].reply_to.is_none());
    }

    #[test]
    fn reply_to_missing_parent_rejected() {
        let f = fixture();
        let err = f.chat.send_message(text(f.a, "re").replying_to(999)).unwrap_err();
        assert!(matches!(err, ChatError::Validation(ValidationError::UnknownParent(999))));
    }

    #[test]
    fn reply_must_stay_in_parent_channel() {
        let f = fixture();
        let secret = f.chat.send_message(text(f.a, "psst").to(f.b)).unwrap();
        let err = f
            .chat
            .send_message(text(f.c, "quoting").replying_to(secret.id))
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(ValidationError::ParentOutsideChannel(_))));

        // Replying inside the same thread, from either side, is fine.
        f.chat
            .send_message(text(f.b, "ok").to(f.a).replying_to(secret.id))
            .unwrap();
    }

    #[test]
    fn non_author_edit_forbidden_and_content_unchanged() {
        let f = fixture();
        let m = f.chat.send_message(text(f.a, "original")).unwrap();

        let err = f.chat.edit_message(f.b, m.id, "hijacked").unwrap_err();
        assert!(matches!(err, ChatError::Forbidden(_)));

        // Admins may delete but not edit.
        let err = f.chat.edit_message(f.admin, m.id, "moderated").unwrap_err();
        assert!(matches!(err, ChatError::Forbidden(_)));

        assert_eq!(f.chat.get_message(m.id).unwrap().content.as_deref(), Some("original"));
    }

    #[test]
    fn author_edit_replaces_content_only() {
        let f = fixture();
        let media = MediaAttachment::new(MediaKind::Image, "https://cdn/p.png").unwrap();
        let m = f
            .chat
            .send_message(NewMessage::new(f.a, Some("caption".into()), Some(media.clone())).unwrap())
            .unwrap();

        let edited = f.chat.edit_message(f.a, m.id, "new caption").unwrap();
        assert_eq!(edited.content.as_deref(), Some("new caption"));
        assert_eq!(edited.media, Some(media));
        assert_eq!(edited.created_at, m.created_at);
    }

    #[test]
    fn blank_edit_of_text_message_rejected() {
        let f = fixture();
        let m = f.chat.send_message(text(f.a, "keep")).unwrap();
        let err = f.chat.edit_message(f.a, m.id, "   ").unwrap_err();
        assert!(matches!(err, ChatError::Validation(ValidationError::EmptyMessage)));
    }

    #[test]
    fn missing_message_is_not_found_before_forbidden() {
        let f = fixture();
        assert!(matches!(f.chat.edit_message(f.b, 404, "x"), Err(ChatError::NotFound(404))));
        assert!(matches!(f.chat.delete_message(f.b, 404), Err(ChatError::NotFound(404))));
    }

    #[test]
    fn delete_permissions() {
        let f = fixture();
        let m = f.chat.send_message(text(f.a, "mine")).unwrap();

        assert!(matches!(f.chat.delete_message(f.b, m.id), Err(ChatError::Forbidden(_))));
        assert!(f.chat.get_message(m.id).is_ok());

        f.chat.delete_message(f.a, m.id).unwrap();
        assert!(matches!(f.chat.get_message(m.id), Err(ChatError::NotFound(_))));
    }

    #[test]
    fn direct_message_targets_checked() {
        let f = fixture();
        assert!(matches!(
            f.chat.send_message(text(f.a, "me").to(f.a)),
            Err(ChatError::Validation(ValidationError::SelfMessage))
        ));
        assert!(matches!(
            f.chat.send_message(text(f.a, "ghost").to(999)),
            Err(ChatError::Validation(ValidationError::UnknownReceiver(999)))
        ));
    }

    #[test]
    fn friends_only_policy_gates_direct_messages() {
        let f = fixture();
        let chat = f.chat.with_policy(FriendsOnly);

        assert!(matches!(
            chat.send_message(text(f.a, "hey").to(f.b)),
            Err(ChatError::Forbidden(_))
        ));
        // Group channel is unaffected.
        chat.send_message(text(f.a, "all")).unwrap();

        chat.db().insert_friend_request(f.a, f.b).unwrap();
        chat.db().accept_friend_request(f.b, f.a).unwrap();
        chat.send_message(text(f.a, "hey").to(f.b)).unwrap();
        assert_eq!(chat.list_messages(f.b, Some(f.a)).unwrap().len(), 1);
    }

    #[test]
    fn banned_author_history_stays_visible() {
        let f = fixture();
        f.chat.send_message(text(f.c, "before ban")).unwrap();
        f.chat.db().set_banned(f.c, true).unwrap();

        let group = f.chat.list_messages(f.a, None).unwrap();
        assert_eq!(contents(&group), vec!["before ban"]);
    }
}
