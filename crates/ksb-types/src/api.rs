use serde::{Deserialize, Serialize};

use crate::message::{MediaAttachment, MediaKind, NewMessage, ValidationError};
use crate::models::User;

// -- JWT Claims --

/// JWT claims issued at login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub code_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub code_name: Option<String>,
    pub rank: Option<String>,
    pub status: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetBannedRequest {
    pub banned: bool,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
pub struct ListMessagesQuery {
    /// Other side of a direct-message thread. Absent means the group channel.
    pub target_id: Option<i64>,
}

/// Body of `POST /messages`. The payload is tagged by `kind`:
///
/// ```json
/// { "kind": "text", "content": "hello" }
/// { "kind": "image", "url": "https://...", "content": "caption", "receiver_id": 4 }
/// ```
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: Option<i64>,
    pub parent_id: Option<i64>,
    #[serde(flatten)]
    pub payload: MessagePayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePayload {
    Text {
        content: String,
    },
    Image {
        url: String,
        content: Option<String>,
        note: Option<String>,
    },
    Video {
        url: String,
        content: Option<String>,
        note: Option<String>,
    },
    Audio {
        url: String,
        content: Option<String>,
        note: Option<String>,
    },
}

impl SendMessageRequest {
    /// Validate the payload and stamp it with the sender's identity.
    pub fn into_new_message(self, author_id: i64) -> Result<NewMessage, ValidationError> {
        let (content, media, note) = match self.payload {
            MessagePayload::Text { content } => (Some(content), None, None),
            MessagePayload::Image { url, content, note } => {
                (content, Some(MediaAttachment::new(MediaKind::Image, url)?), note)
            }
            MessagePayload::Video { url, content, note } => {
                (content, Some(MediaAttachment::new(MediaKind::Video, url)?), note)
            }
            MessagePayload::Audio { url, content, note } => {
                (content, Some(MediaAttachment::new(MediaKind::Audio, url)?), note)
            }
        };

        let mut msg = NewMessage::new(author_id, content, media)?.with_note(note)?;
        if let Some(receiver_id) = self.receiver_id {
            msg = msg.to(receiver_id);
        }
        if let Some(parent_id) = self.parent_id {
            msg = msg.replying_to(parent_id);
        }
        Ok(msg)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub content: String,
}

// -- Friends --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FriendRequest {
    pub friend_id: i64,
}
