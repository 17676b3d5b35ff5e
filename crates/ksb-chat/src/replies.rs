use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use ksb_db::Database;
use ksb_types::models::{Message, MessageView, ReplyPreview, UserSummary};

use crate::convert::{message_from_row, user_from_row};

/// Enrich messages with sender info and, for replies, the parent they quote.
///
/// Parents and senders are fetched fresh on every call. A parent that has been
/// deleted resolves to `reply_to: None`; a missing sender becomes a placeholder.
pub fn attach_replies(db: &Database, messages: Vec<Message>) -> Result<Vec<MessageView>> {
    let parent_ids: Vec<i64> = messages
        .iter()
        .filter_map(|m| m.parent_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let parents: HashMap<i64, Message> = db
        .get_messages_by_ids(&parent_ids)?
        .into_iter()
        .map(|row| (row.id, message_from_row(row)))
        .collect();

    let user_ids: Vec<i64> = messages
        .iter()
        .chain(parents.values())
        .map(|m| m.author_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let senders: HashMap<i64, UserSummary> = db
        .get_users_by_ids(&user_ids)?
        .into_iter()
        .map(|row| {
            let user = user_from_row(row);
            (user.id, user.summary())
        })
        .collect();

    let sender_of = |id: i64| {
        senders
            .get(&id)
            .cloned()
            .unwrap_or_else(|| UserSummary::unknown(id))
    };

    let views = messages
        .into_iter()
        .map(|message| {
            let reply_to = message
                .parent_id
                .and_then(|pid| parents.get(&pid))
                .map(|parent| ReplyPreview {
                    id: parent.id,
                    content: parent.content.clone(),
                    media: parent.media.clone(),
                    sender: sender_of(parent.author_id),
                });

            MessageView {
                sender: sender_of(message.author_id),
                reply_to,
                message,
            }
        })
        .collect();

    Ok(views)
}
