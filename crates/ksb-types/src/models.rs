use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::MediaAttachment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub code_name: String,
    pub rank: String,
    pub status: String,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub is_admin: bool,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            code_name: self.code_name.clone(),
            rank: self.rank.clone(),
            avatar_url: self.avatar_url.clone(),
            is_verified: self.is_verified,
        }
    }
}

/// Sender display info attached to every message in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub code_name: String,
    pub rank: String,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
}

impl UserSummary {
    /// Placeholder for a sender whose account no longer exists.
    pub fn unknown(id: i64) -> Self {
        Self {
            id,
            code_name: "unknown".to_string(),
            rank: String::new(),
            avatar_url: None,
            is_verified: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub author_id: i64,
    pub receiver_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub content: Option<String>,
    pub media: Option<MediaAttachment>,
    pub operation_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Excerpt of the message a reply points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPreview {
    pub id: i64,
    pub content: Option<String>,
    pub media: Option<MediaAttachment>,
    pub sender: UserSummary,
}

/// A message as returned by the listing endpoint: sender info plus the
/// resolved parent, if it still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender: UserSummary,
    pub reply_to: Option<ReplyPreview>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
}

impl FriendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            _ => None,
        }
    }
}

/// One side of a friendship, seen from the requesting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friend {
    pub user: UserSummary,
    pub status: FriendStatus,
    /// True when the requesting user sent the request.
    pub outgoing: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelLink {
    pub id: i64,
    pub code: String,
    pub label: String,
    pub url: String,
    pub category: String,
}
