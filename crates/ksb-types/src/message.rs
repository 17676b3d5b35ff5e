use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_CONTENT_LEN: usize = 4000;
pub const MAX_URL_LEN: usize = 2048;
pub const MAX_NOTE_LEN: usize = 280;

/// The kind of media a message carries. A message holds at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub kind: MediaKind,
    pub url: String,
}

impl MediaAttachment {
    pub fn new(kind: MediaKind, url: impl Into<String>) -> Result<Self, ValidationError> {
        let url = url.into().trim().to_string();
        if url.is_empty() {
            return Err(ValidationError::MissingMediaUrl);
        }
        if url.chars().count() > MAX_URL_LEN {
            return Err(ValidationError::MediaUrlTooLong { max: MAX_URL_LEN });
        }
        Ok(Self { kind, url })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message must carry text or a media attachment")]
    EmptyMessage,

    #[error("message content exceeds {max} characters")]
    ContentTooLong { max: usize },

    #[error("media attachment requires a url")]
    MissingMediaUrl,

    #[error("media url exceeds {max} characters")]
    MediaUrlTooLong { max: usize },

    #[error("operation note exceeds {max} characters")]
    NoteTooLong { max: usize },

    #[error("parent message {0} does not exist")]
    UnknownParent(i64),

    #[error("parent message {0} belongs to a different channel")]
    ParentOutsideChannel(i64),

    #[error("receiver {0} does not exist")]
    UnknownReceiver(i64),

    #[error("cannot send a direct message to yourself")]
    SelfMessage,
}

/// A message that has passed payload validation and is ready to be appended.
///
/// Fields are private: the only way to obtain one is through [`NewMessage::new`],
/// so the store never sees a message without text or media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    author_id: i64,
    receiver_id: Option<i64>,
    parent_id: Option<i64>,
    content: Option<String>,
    media: Option<MediaAttachment>,
    operation_note: Option<String>,
}

impl NewMessage {
    pub fn new(
        author_id: i64,
        content: Option<String>,
        media: Option<MediaAttachment>,
    ) -> Result<Self, ValidationError> {
        let content = normalize_content(content)?;
        if content.is_none() && media.is_none() {
            return Err(ValidationError::EmptyMessage);
        }

        Ok(Self {
            author_id,
            receiver_id: None,
            parent_id: None,
            content,
            media,
            operation_note: None,
        })
    }

    pub fn text(author_id: i64, content: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(author_id, Some(content.into()), None)
    }

    /// Scope the message to a direct-message channel with `receiver_id`.
    pub fn to(mut self, receiver_id: i64) -> Self {
        self.receiver_id = Some(receiver_id);
        self
    }

    pub fn replying_to(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_note(mut self, note: Option<String>) -> Result<Self, ValidationError> {
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        if let Some(n) = &note {
            if n.chars().count() > MAX_NOTE_LEN {
                return Err(ValidationError::NoteTooLong { max: MAX_NOTE_LEN });
            }
        }
        self.operation_note = note;
        Ok(self)
    }

    pub fn author_id(&self) -> i64 {
        self.author_id
    }

    pub fn receiver_id(&self) -> Option<i64> {
        self.receiver_id
    }

    pub fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn media(&self) -> Option<&MediaAttachment> {
        self.media.as_ref()
    }

    pub fn operation_note(&self) -> Option<&str> {
        self.operation_note.as_deref()
    }
}

/// Validate replacement text for an edit. Blank text clears the content, which
/// is only allowed when the message still has media to show.
pub fn edited_content(raw: &str, has_media: bool) -> Result<Option<String>, ValidationError> {
    let content = normalize_content(Some(raw.to_string()))?;
    if content.is_none() && !has_media {
        return Err(ValidationError::EmptyMessage);
    }
    Ok(content)
}

fn normalize_content(content: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(content) = content else {
        return Ok(None);
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(ValidationError::ContentTooLong { max: MAX_CONTENT_LEN });
    }
    Ok(Some(content))
}
