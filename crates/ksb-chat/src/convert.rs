//! Row → model conversion. Corrupt columns are logged and replaced with
//! defaults rather than failing a whole listing.

use chrono::{DateTime, Utc};
use ksb_db::models::{FriendshipRow, IntelLinkRow, MessageRow, UserRow};
use ksb_types::models::{Friend, FriendStatus, IntelLink, Message, User};
use ksb_types::{MediaAttachment, MediaKind};
use tracing::warn;

pub fn message_from_row(row: MessageRow) -> Message {
    let media = match (row.media_kind.as_deref(), row.media_url) {
        (Some(kind), Some(url)) => match MediaKind::parse(kind) {
            Some(kind) => Some(MediaAttachment { kind, url }),
            None => {
                warn!("Unknown media kind '{}' on message {}", kind, row.id);
                None
            }
        },
        _ => None,
    };

    Message {
        id: row.id,
        author_id: row.author_id,
        receiver_id: row.receiver_id,
        parent_id: row.parent_id,
        content: row.content,
        media,
        operation_note: row.operation_note,
        created_at: parse_timestamp(&row.created_at, "message", row.id),
    }
}

pub fn user_from_row(row: UserRow) -> User {
    User {
        created_at: parse_timestamp(&row.created_at, "user", row.id),
        id: row.id,
        username: row.username,
        code_name: row.code_name,
        rank: row.rank,
        status: row.status,
        avatar_url: row.avatar_url,
        is_verified: row.is_verified,
        is_admin: row.is_admin,
        is_banned: row.is_banned,
    }
}

/// Build the requesting user's view of a friendship. `other` is the user on
/// the far side of the relation.
pub fn friend_from_row(row: &FriendshipRow, me: i64, other: &User) -> Friend {
    let status = FriendStatus::parse(&row.status).unwrap_or_else(|| {
        warn!("Corrupt friendship status '{}' ({} -> {})", row.status, row.user_id, row.friend_id);
        FriendStatus::Pending
    });

    Friend {
        user: other.summary(),
        status,
        outgoing: row.user_id == me,
        created_at: parse_timestamp(&row.created_at, "friendship", row.user_id),
    }
}

pub fn intel_link_from_row(row: IntelLinkRow) -> IntelLink {
    IntelLink {
        id: row.id,
        code: row.code,
        label: row.label,
        url: row.url,
        category: row.category,
    }
}

fn parse_timestamp(raw: &str, what: &str, id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Plain SQLite datetime() output: "YYYY-MM-DD HH:MM:SS", implicitly UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on {} {}: {}", raw, what, id, e);
            DateTime::default()
        })
}
